use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// A required event field is missing or unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Wire name of the offending field, e.g. `resource_id`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        Self::new(field, format!("{} is required", field))
    }
}

/// Reasons a single bus message is dropped. All of them are handled at the
/// per-message boundary; none reach the transport.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to persist notification: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Errors returned by the read API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("notification not found")]
    NotificationNotFound,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::NotificationNotFound => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "notification_not_found",
                "notification not found".to_string(),
            ),
            AppError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                reason.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
