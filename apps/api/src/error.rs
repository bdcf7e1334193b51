//! Error types for the HTTP API.
//!
//! Every handler returns [`ApiResult`]. Domain and database errors convert
//! into [`ApplicationError`], which renders as
//!
//! ```json
//! {"code": "VALIDATION_FAILED", "message": "...", "errors": {"email": ["..."]}}
//! ```
//!
//! Clients match on `code`; messages may be reworded.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use aria_core::{CoreError, ValidationError};
use aria_db::DbError;

/// Stable, machine-readable error codes.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const CONFLICT: &str = "CONFLICT";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const INTERNAL: &str = "INTERNAL";
}

pub type ApiResult<T> = Result<T, ApplicationError>;

/// The single error type handlers return.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApplicationError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    /// Field name → messages, for validation failures.
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, Vec<String>>>,
}

impl ApplicationError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApplicationError {
            status,
            code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_code::NOT_FOUND, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_code::VALIDATION_FAILED, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_code::UNAUTHENTICATED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_code::PERMISSION_DENIED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, error_code::CONFLICT, message)
    }

    /// Logs the cause and hides it from the client.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(%cause, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_code::INTERNAL,
            "Internal server error",
        )
    }

    /// Attaches a message to one field.
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors
            .get_or_insert_with(BTreeMap::new)
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
            errors: self.errors.as_ref(),
        };
        (self.status, axum::Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApplicationError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        let message = err.to_string();
        ApplicationError::validation(message.clone()).with_field(field, message)
    }
}

impl From<CoreError> for ApplicationError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => ApplicationError::not_found(err.to_string()),
            CoreError::Forbidden(message) => ApplicationError::forbidden(message),
            CoreError::Conflict(message) => ApplicationError::conflict(message),
            CoreError::Validation(inner) => inner.into(),
            CoreError::Internal(message) => ApplicationError::internal(message),
        }
    }
}

impl From<DbError> for ApplicationError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApplicationError::not_found(err.to_string()),
            DbError::UniqueViolation { ref field, .. } => {
                let field = field.clone();
                ApplicationError::new(
                    StatusCode::CONFLICT,
                    error_code::ALREADY_EXISTS,
                    err.to_string(),
                )
                .with_field(field, "already exists")
            }
            DbError::ForeignKeyViolation { .. } => {
                ApplicationError::conflict(
                    "The record is referenced by, or references, another record",
                )
            }
            DbError::CheckViolation(message) => ApplicationError::validation(message),
            other => ApplicationError::internal(other),
        }
    }
}

impl From<JsonRejection> for ApplicationError {
    fn from(rejection: JsonRejection) -> Self {
        ApplicationError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApplicationError {
    fn from(rejection: QueryRejection) -> Self {
        ApplicationError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApplicationError {
    fn from(rejection: PathRejection) -> Self {
        ApplicationError::validation(rejection.body_text())
    }
}
