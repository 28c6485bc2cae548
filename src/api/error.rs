//! Error types for the API module

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::error::Error as CrateError;

/// Request rejected before a crawl was started
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field is missing or empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// No Authorization header although a secret is configured
    #[error("Authorization is required")]
    MissingAuthorization,

    /// Authorization header does not match the configured secret
    #[error("Authorization is invalid")]
    Unauthorized,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::MissingAuthorization => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({"error": self.to_string()})),
        )
            .into_response()
    }
}

/// Delivering a result to a callback URL failed
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Request could not be sent
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Callback endpoint answered with something other than 200
    #[error("Callback returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<CallbackError> for CrateError {
    fn from(err: CallbackError) -> Self {
        match err {
            CallbackError::Http(e) => CrateError::Http(e),
            _ => CrateError::Other(err.to_string()),
        }
    }
}
