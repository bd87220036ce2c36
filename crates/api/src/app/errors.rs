//! Boundary error responder.
//!
//! Every failure a request can produce ends up here exactly once and leaves as
//! `{ "success": false, "error": { "code", "message", "details"? } }`.

use std::any::Any;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use learnhub_core::{AppError, ErrorKind, FieldIssue, INTERNAL_ERROR_MESSAGE};

#[derive(Debug)]
pub enum ApiError {
    /// Classified application failure.
    App(AppError),
    /// Request input rejected while parsing or validating.
    Validation(Vec<FieldIssue>),
    /// An extractor required an identity that no auth middleware attached.
    Unauthenticated,
    RateLimited,
    /// Anything else. `status` is the failure's own status, when it has one.
    Unexpected {
        status: Option<StatusCode>,
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn unexpected(source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            status: None,
            source: source.into(),
        }
    }

    pub fn unexpected_with_status(status: StatusCode, source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            status: Some(status),
            source: source.into(),
        }
    }

    /// Classify the failure into what the client sees and what the log keeps.
    pub fn report(&self) -> ErrorReport {
        match self {
            ApiError::App(err) => ErrorReport {
                status: status_of(err.status_code()),
                code: err.code(),
                message: err.message().to_string(),
                details: err.details().cloned(),
                severity: Severity::Warn,
                internal: None,
            },
            ApiError::Validation(issues) => {
                let err = AppError::validation(issues.iter().cloned());
                ErrorReport {
                    status: StatusCode::BAD_REQUEST,
                    code: err.code(),
                    message: err.message().to_string(),
                    details: err.details().cloned(),
                    severity: Severity::Warn,
                    internal: None,
                }
            }
            ApiError::Unauthenticated => ErrorReport::generic(ErrorKind::Unauthorized),
            ApiError::RateLimited => ErrorReport::generic(ErrorKind::RateLimited),
            ApiError::Unexpected { status, source } => {
                let status = status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let (code, message) = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    (ErrorKind::InternalError.code(), INTERNAL_ERROR_MESSAGE.to_string())
                } else {
                    let code = ErrorKind::from_status(status.as_u16())
                        .unwrap_or(ErrorKind::InternalError)
                        .code();
                    let message = status
                        .canonical_reason()
                        .unwrap_or(INTERNAL_ERROR_MESSAGE)
                        .to_string();
                    (code, message)
                };
                ErrorReport {
                    status,
                    code,
                    message,
                    details: None,
                    severity: Severity::Error,
                    internal: Some(format!("{source:?}")),
                }
            }
        }
    }
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
}

/// Classified failure: the client-safe part plus the detail kept for logs.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Map<String, Value>>,
    pub severity: Severity,
    /// Full failure detail. Logged, never sent.
    pub internal: Option<String>,
}

impl ErrorReport {
    fn generic(kind: ErrorKind) -> Self {
        Self {
            status: status_of(kind.status_code()),
            code: kind.code(),
            message: kind.default_message().to_string(),
            details: None,
            severity: Severity::Warn,
            internal: None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Map<String, Value>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report();

        match report.severity {
            Severity::Warn => tracing::warn!(
                status = report.status.as_u16(),
                code = report.code,
                error_message = %report.message,
                "request failed"
            ),
            Severity::Error => tracing::error!(
                status = report.status.as_u16(),
                code = report.code,
                detail = report.internal.as_deref().unwrap_or_default(),
                "unexpected failure while handling request"
            ),
        }

        let body = ErrorBody {
            success: false,
            error: ErrorPayload {
                code: report.code,
                message: &report.message,
                details: report.details.as_ref(),
            },
        };
        (report.status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::unexpected(err)
    }
}

/// Panic hook for `CatchPanicLayer`: a panicking handler is an unexpected
/// failure like any other.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "non-string panic payload".to_string()
    };
    ApiError::unexpected(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
