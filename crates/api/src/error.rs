//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dispatch::RegistryError;
use saga::SagaError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Saga or trip state machine error.
    #[error(transparent)]
    Saga(#[from] SagaError),
    /// Geo registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Registry(err) => {
                tracing::error!(error = %err, "geo registry failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::TripNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        SagaError::Trip(_) | SagaError::ConcurrentTransition { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        SagaError::DuplicateDelivery(_) => (StatusCode::CONFLICT, err.to_string()),
        SagaError::Serialization(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        SagaError::Store(_) | SagaError::Registry(_) => {
            tracing::error!(error = %err, "infrastructure failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
