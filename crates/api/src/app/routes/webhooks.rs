//! Inbound server-to-server callbacks from the content platform.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};

use learnhub_auth::WEBHOOK_SIGNATURE_HEADER;
use learnhub_core::FieldIssue;

use crate::app::AppState;
use crate::app::dto::{ApiResponse, WebhookAckDto, ok};
use crate::app::errors::ApiError;
use crate::validation::{Validate, ValidatedJson};

pub fn router() -> Router<AppState> {
    Router::new().route("/content", post(content))
}

/// Content change notification. Only `event`/`model` are interpreted; the
/// rest of the payload is passed through untouched.
#[derive(Debug, Deserialize)]
pub struct ContentEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Validate for ContentEvent {
    fn validate(&self) -> Result<(), Vec<FieldIssue>> {
        let issues: Vec<FieldIssue> = [("event", &self.event), ("model", &self.model)]
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
            .map(|(field, _)| FieldIssue::new([field], "must not be empty"))
            .collect();

        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }
}

/// The signature covers the raw bytes, so the body is verified before it is
/// parsed.
pub async fn content(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAckDto>>, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state.webhook.verify(&body, signature)?;

    let ValidatedJson(event) = ValidatedJson::<ContentEvent>::from_bytes(&body)?;
    tracing::info!(
        event = event.event.as_deref().unwrap_or("unspecified"),
        model = event.model.as_deref().unwrap_or("unspecified"),
        fields = event.payload.len(),
        "content webhook accepted"
    );

    Ok(ok(WebhookAckDto {
        received: true,
        event: event.event,
    }))
}
