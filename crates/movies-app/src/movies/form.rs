use garde::Validate as _;
use movies_dal::{
    movie::{CreateMovie, Movie},
    price::Price,
};
use serde::{Deserialize, Serialize};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use crate::view::FieldErrors;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Movie as submitted from the edit/create form.
///
/// Only these fields are ever bound from a request, anything else in the body is ignored.
/// Values are kept as raw strings, so an invalid form can be redisplayed exactly as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieForm {
    pub id: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub genre: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
}

/// Blank input is an absent value, anything else is kept as submitted.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl MovieForm {
    /// Submitted id, `None` when absent or not a number.
    pub fn id(&self) -> Option<i64> {
        non_empty(&self.id).and_then(|id| id.trim().parse().ok())
    }

    /// Projects the form into a validated payload.
    pub fn bind(&self) -> Result<CreateMovie, FieldErrors> {
        let mut errors = FieldErrors::new();

        let release_date = non_empty(&self.release_date).and_then(|value| {
            Date::parse(value.trim(), DATE_FORMAT)
                .map_err(|e| errors.add("release_date", format!("invalid date: {e}")))
                .ok()
        });
        let price = non_empty(&self.price).and_then(|value| {
            value
                .parse::<Price>()
                .map_err(|e| errors.add("price", e.to_string()))
                .ok()
        });

        let payload = CreateMovie {
            title: non_empty(&self.title).map(str::to_string),
            release_date,
            genre: non_empty(&self.genre).map(str::to_string),
            price,
            rating: non_empty(&self.rating).map(str::to_string),
        };

        if let Err(report) = payload.validate() {
            errors.merge_report(&report);
        }

        if errors.is_empty() {
            Ok(payload)
        } else {
            Err(errors)
        }
    }
}

impl From<Movie> for MovieForm {
    fn from(movie: Movie) -> Self {
        MovieForm {
            id: Some(movie.id.to_string()),
            title: Some(movie.title),
            release_date: movie.release_date.format(DATE_FORMAT).ok(),
            genre: Some(movie.genre),
            price: Some(movie.price.to_string()),
            rating: movie.rating,
        }
    }
}
