//! Application error model.
//!
//! Every failure the request pipeline can produce is an [`AppError`]: a closed
//! [`ErrorKind`] plus a client-safe message and optional structured details.
//! Translation to a wire response happens in exactly one place (the API
//! boundary); nothing in this crate knows about HTTP types.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::validation::{FieldIssue, fold_issues};

/// Message returned for every `InternalError`, regardless of the cause.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Result type used across the pipeline.
pub type AppResult<T> = Result<T, AppError>;

/// Closed error taxonomy. Each kind has a fixed status and a stable code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    Unauthorized,
    Forbidden,
    Conflict,
    RateLimited,
    ServiceUnavailable,
    InternalError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::NotFound,
        ErrorKind::ValidationError,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::Conflict,
        ErrorKind::RateLimited,
        ErrorKind::ServiceUnavailable,
        ErrorKind::InternalError,
    ];

    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::ValidationError => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::RateLimited => 429,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::InternalError => 500,
        }
    }

    /// Stable wire code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::ValidationError => "Validation failed",
            ErrorKind::Unauthorized => "Authentication required",
            ErrorKind::Forbidden => "Access denied",
            ErrorKind::Conflict => "Resource conflict",
            ErrorKind::RateLimited => "Too many requests, please try again later",
            ErrorKind::ServiceUnavailable => "Service unavailable",
            ErrorKind::InternalError => INTERNAL_ERROR_MESSAGE,
        }
    }

    /// Reverse lookup used when an unclassified failure carries its own status.
    pub fn from_status(status: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.status_code() == status)
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Structured application failure.
///
/// Immutable once built: fields are private and there are no setters. The
/// `with_details` builder consumes `self`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    details: Option<Map<String, Value>>,
}

impl AppError {
    /// Build an error of `kind`. `InternalError` always carries the fixed
    /// generic message; the given one is discarded.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = match kind {
            ErrorKind::InternalError => INTERNAL_ERROR_MESSAGE.to_string(),
            _ => message.into(),
        };
        Self {
            kind,
            message,
            details: None,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("{resource} not found"))
    }

    pub fn not_found_with_id(resource: &str, id: impl core::fmt::Display) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("{resource} with id {id} not found"),
        )
    }

    pub fn validation<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = FieldIssue>,
    {
        let details = fold_issues(issues)
            .into_iter()
            .map(|(field, message)| (field, Value::String(message)))
            .collect();
        Self {
            kind: ErrorKind::ValidationError,
            message: ErrorKind::ValidationError.default_message().to_string(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn rate_limited() -> Self {
        Self::new(
            ErrorKind::RateLimited,
            ErrorKind::RateLimited.default_message(),
        )
    }

    /// A named downstream dependency is down or did not answer in time.
    pub fn service_unavailable(service: &str) -> Self {
        Self::new(
            ErrorKind::ServiceUnavailable,
            format!("Service unavailable: {service}"),
        )
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::InternalError, INTERNAL_ERROR_MESSAGE)
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }
}
