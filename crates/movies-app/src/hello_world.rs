//! Greeting demo, shows binding of query and route parameters with defaults.
//!
//! Parameter names match case-insensitively. A missing, empty or unparsable
//! value falls back to its default, it is never a bad request.

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::{state::AppState, view::View};

const DEFAULT_NAME: &str = "DEFAULT_NAME";
const DEFAULT_NUM_TIMES: i32 = 1;
const DEFAULT_ID: i32 = 10;

type QueryPairs = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeParams {
    pub name: String,
    pub num_times: i32,
    pub id: i32,
}

/// First non-blank value of the parameter, the name is matched ignoring case.
fn lookup<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
        .find(|value| !value.trim().is_empty())
}

fn parse_or(value: Option<&str>, default: i32) -> i32 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl WelcomeParams {
    pub fn from_query(query: &[(String, String)]) -> Self {
        WelcomeParams {
            name: lookup(query, "name").unwrap_or(DEFAULT_NAME).to_string(),
            num_times: parse_or(lookup(query, "numTimes"), DEFAULT_NUM_TIMES),
            id: parse_or(lookup(query, "id"), DEFAULT_ID),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WelcomeViewModel {
    pub num_times: i32,
    pub message: String,
}

impl From<WelcomeParams> for WelcomeViewModel {
    fn from(params: WelcomeParams) -> Self {
        WelcomeViewModel {
            num_times: params.num_times,
            message: format!("Hello {}, your ID is {}", params.name, params.id),
        }
    }
}

pub async fn index() -> impl IntoResponse {
    View::new("HelloWorld/Index", ())
}

pub async fn welcome(Query(query): Query<QueryPairs>) -> impl IntoResponse {
    View::new(
        "HelloWorld/Welcome",
        WelcomeViewModel::from(WelcomeParams::from_query(&query)),
    )
}

/// Numeric id from the route segment takes precedence over query.
pub async fn welcome_with_id(
    Path(id): Path<String>,
    Query(query): Query<QueryPairs>,
) -> impl IntoResponse {
    let mut params = WelcomeParams::from_query(&query);
    if let Ok(id) = id.trim().parse() {
        params.id = id;
    }
    View::new("HelloWorld/Welcome", WelcomeViewModel::from(params))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/HelloWorld", get(index))
        .route("/HelloWorld/Index", get(index))
        .route("/HelloWorld/Welcome", get(welcome))
        .route("/HelloWorld/Welcome/{id}", get(welcome_with_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> QueryPairs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let params = WelcomeParams::from_query(&[]);
        assert_eq!(params.name, "DEFAULT_NAME");
        assert_eq!(params.num_times, 1);
        assert_eq!(params.id, 10);
    }

    #[test]
    fn test_blank_and_invalid_values() {
        let params = WelcomeParams::from_query(&query(&[
            ("name", ""),
            ("numTimes", ""),
            ("ID", "ten"),
        ]));
        assert_eq!(
            params,
            WelcomeParams {
                name: "DEFAULT_NAME".into(),
                num_times: 1,
                id: 10
            }
        );
    }

    #[test]
    fn test_names_ignore_case() {
        let params = WelcomeParams::from_query(&query(&[
            ("Name", "Rick"),
            ("NUMTIMES", "4"),
            ("ID", "3"),
            ("id", "4"),
        ]));
        assert_eq!(params.name, "Rick");
        assert_eq!(params.num_times, 4);
        assert_eq!(params.id, 3);
    }
}
