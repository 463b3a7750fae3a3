//! Request-level error taxonomy and its HTTP mapping.
//!
//! Missing data on reads is never an error here: lookups return empty
//! structures instead of a 404.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        match self {
            AppError::Validation(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, format!("Error: {msg}")).into_response()
            }
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error: {other}"),
                )
                    .into_response()
            }
        }
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
