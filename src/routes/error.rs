// Request failures and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::ParsePeriodError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client input the server cannot act on (e.g. an unknown period).
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// Store read failed; no cached fallback.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<ParsePeriodError> for ApiError {
    fn from(e: ParsePeriodError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(e) => {
                tracing::warn!(error = %e, "request failed on storage");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
