//! View results of controller actions.
//!
//! Templates are not rendered on the server, a view is sent as JSON document
//! naming the view and carrying its model, so any front end can render it.

use std::collections::BTreeMap;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;

/// Field level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|m| m.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds violations from report, skipping fields that already have an error.
    pub fn merge_report(&mut self, report: &garde::Report) {
        let mut new_errors = FieldErrors::new();
        for (path, error) in report.iter() {
            let field = path.to_string();
            if !self.contains(&field) {
                new_errors.add(field, error.to_string());
            }
        }
        for (field, messages) in new_errors.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct View<M> {
    view: &'static str,
    model: M,
    #[serde(skip_serializing_if = "Option::is_none")]
    antiforgery_token: Option<String>,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    errors: FieldErrors,
    #[serde(skip)]
    status: StatusCode,
}

impl<M: Serialize> View<M> {
    pub fn new(view: &'static str, model: M) -> Self {
        View {
            view,
            model,
            antiforgery_token: None,
            errors: FieldErrors::default(),
            status: StatusCode::OK,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.antiforgery_token = Some(token);
        self
    }

    /// Form redisplayed because of invalid input.
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self.status = StatusCode::UNPROCESSABLE_ENTITY;
        self
    }
}

impl<M: Serialize> IntoResponse for View<M> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
