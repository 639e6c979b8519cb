use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::{InvalidTransition, TransactionEvent, TransactionStatus};
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: event '{event}' is not allowed from status '{current}'")]
    InvalidStateTransition {
        current: TransactionStatus,
        event: TransactionEvent,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::InvalidStateTransition {
            current: err.current,
            event: err.event,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal causes are logged but never shown to the caller.
        let body = match &self {
            AppError::Database(cause) => {
                tracing::error!(%cause, "database error");
                json!({ "error": "Internal server error", "status": status.as_u16() })
            }
            AppError::Internal(cause) => {
                tracing::error!(%cause, "internal error");
                json!({ "error": "Internal server error", "status": status.as_u16() })
            }
            AppError::InvalidStateTransition { current, event } => json!({
                "error": self.to_string(),
                "status": status.as_u16(),
                "current_status": current.as_str(),
                "event": event.as_str(),
            }),
            _ => json!({ "error": self.to_string(), "status": status.as_u16() }),
        };

        (status, Json(body)).into_response()
    }
}
