//! Field-level input validation issues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key used for issues that concern the whole payload rather than one field.
pub const ROOT_FIELD: &str = "body";

/// Flat `dotted.field.path -> message` mapping carried by validation errors.
pub type FieldErrors = BTreeMap<String, String>;

/// A single rejected input field, as reported by a request-parsing validator.
///
/// `path` is the sequence of keys (and array indices) leading to the field,
/// e.g. `["address", "lines", "0"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldIssue {
    pub fn new<I, S>(path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    /// Issue attached to the payload as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    pub fn dotted_path(&self) -> String {
        if self.path.is_empty() {
            ROOT_FIELD.to_string()
        } else {
            self.path.join(".")
        }
    }
}

/// Fold per-field issues into a flat map keyed by dotted field path.
///
/// When a field is reported more than once, the first message is kept.
pub fn fold_issues<I>(issues: I) -> FieldErrors
where
    I: IntoIterator<Item = FieldIssue>,
{
    issues.into_iter().fold(FieldErrors::new(), |mut acc, issue| {
        acc.entry(issue.dotted_path()).or_insert(issue.message);
        acc
    })
}
