//! Error types for HTTP handlers.
//!
//! Bridges the domain and store error taxonomies to HTTP responses,
//! implementing Axum's `IntoResponse` trait.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use seminar_signup_core::{SignupError, StoreError};
use serde::Serialize;
use std::fmt;

/// Application error type for HTTP handlers.
///
/// Wraps domain errors and renders them as a JSON body with a stable,
/// machine-readable `code` alongside the human-readable message.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    /// Internal error detail, logged but never exposed to clients.
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach an internal source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            message.into(),
            "CONFLICT".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::not_found("Session", id),
            StoreError::AlreadyExists(id) => {
                Self::conflict(format!("Session {id} already exists"))
            }
            StoreError::Conflict { .. } | StoreError::ConflictExhausted { .. } => {
                Self::unavailable("The session is receiving heavy traffic, please retry")
                    .with_source(err.into())
            }
            StoreError::AccessDenied(_) => {
                Self::forbidden("The document store rejected the operation")
                    .with_source(err.into())
            }
            StoreError::Connectivity(_) => {
                Self::unavailable("The document store is unreachable, please retry")
                    .with_source(err.into())
            }
            StoreError::Serialization(_) => {
                Self::internal("An internal error occurred").with_source(err.into())
            }
        }
    }
}

impl From<SignupError> for AppError {
    fn from(err: SignupError) -> Self {
        match err {
            SignupError::Validation(message) => Self::validation(message),
            SignupError::AlreadyRegistered { email } => Self::new(
                StatusCode::CONFLICT,
                format!("{email} is already registered for this session"),
                "ALREADY_REGISTERED".to_string(),
            ),
            SignupError::Store(store) => store.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
