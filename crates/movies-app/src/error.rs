use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid or missing anti-forgery token")]
    InvalidAntiForgeryToken,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(movies_dal::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<movies_dal::Error> for ApiError {
    fn from(value: movies_dal::Error) -> Self {
        match value {
            movies_dal::Error::RecordNotFound(what) => ApiError::NotFound(what),
            movies_dal::Error::ConcurrencyConflict { id } => {
                debug!("Concurrent change of record {id}");
                ApiError::NotFound(format!("Movie {id}"))
            }
            other => ApiError::DatabaseError(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::InvalidAntiForgeryToken | ApiError::InvalidRequest(_) => {
                debug!("Rejected request: {self}");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                error!("Request failed: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
