//! `learnhub-core`: shared primitives for the request pipeline.
//!
//! This crate holds the closed error taxonomy and strongly-typed identifiers.
//! It has no HTTP or storage concerns.

pub mod error;
pub mod id;
pub mod validation;

pub use error::{AppError, AppResult, ErrorKind, INTERNAL_ERROR_MESSAGE};
pub use id::{TenantId, UserId};
pub use validation::{FieldIssue, FieldErrors, fold_issues};
