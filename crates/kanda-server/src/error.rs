use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use kanda_core::error::CoreError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every response body has the shape `{"error": "<message>"}`. Internal
/// errors carry a caller-facing message; the underlying cause is logged and
/// never sent to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{message}: {source}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Wrap a store or backend failure with the message returned to the
    /// client, for use with `map_err`.
    pub fn internal(message: &'static str) -> impl FnOnce(anyhow::Error) -> AppError {
        move |source| AppError::Internal { message, source }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(source: anyhow::Error) -> Self {
        AppError::Internal {
            message: "Internal server error",
            source,
        }
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Serialization(_) => AppError::Internal {
                message: "Internal server error",
                source: e.into(),
            },
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Internal { message, source } => {
                tracing::error!(error = %source, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, *message)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
