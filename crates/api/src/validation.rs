//! Request body validation.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_path_to_error::Segment;

use learnhub_core::FieldIssue;

use crate::app::errors::ApiError;

const MISSING_JSON_CONTENT_TYPE: &str = "Expected request with `Content-Type: application/json`";

/// Semantic checks that run after a payload deserialized successfully.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldIssue>>;
}

/// JSON body that both parsed and passed [`Validate`]. Any failure becomes a
/// `400 VALIDATION_ERROR` with per-field details.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
{
    /// Parse and validate raw bytes, for handlers that must read the body first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ApiError> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let value: T = serde_path_to_error::deserialize(&mut de)
            .map_err(|err| ApiError::Validation(vec![deserialize_issue(&err)]))?;
        de.end()
            .map_err(|err| ApiError::Validation(vec![FieldIssue::root(err.to_string())]))?;

        value.validate().map_err(ApiError::Validation)?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_json(req.headers()) {
            return Err(ApiError::Validation(vec![FieldIssue::root(
                MISSING_JSON_CONTENT_TYPE,
            )]));
        }
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            ApiError::unexpected_with_status(
                rejection.status(),
                anyhow::anyhow!(rejection.body_text()),
            )
        })?;
        Self::from_bytes(&bytes)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case("application/json")
        || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Map a deserialization failure onto the field it concerns.
///
/// Syntax errors and type errors on the payload itself stay on the root key.
fn deserialize_issue(err: &serde_path_to_error::Error<serde_json::Error>) -> FieldIssue {
    let inner = err.inner();
    if inner.classify() != Category::Data {
        return FieldIssue::root(inner.to_string());
    }

    let mut path: Vec<String> = err
        .path()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Map { key } => Some(key.clone()),
            Segment::Enum { variant } => Some(variant.clone()),
            Segment::Unknown => None,
        })
        .collect();

    let message = inner.to_string();
    // serde_json appends the position; the path already says where.
    let message = match message.find(" at line ") {
        Some(at) => message[..at].to_string(),
        None => message,
    };

    if let Some(field) = missing_field(&message) {
        path.push(field.to_string());
        return FieldIssue::new(path, "is required");
    }
    FieldIssue::new(path, message)
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .strip_suffix('`')
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{StatusCode, header};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Enrollment {
        course_id: String,
        seats: u32,
    }

    impl Validate for Enrollment {
        fn validate(&self) -> Result<(), Vec<FieldIssue>> {
            let mut issues = Vec::new();
            if self.course_id.trim().is_empty() {
                issues.push(FieldIssue::new(["course_id"], "must not be empty"));
            }
            if self.seats == 0 {
                issues.push(FieldIssue::new(["seats"], "must be at least 1"));
            }
            if issues.is_empty() { Ok(()) } else { Err(issues) }
        }
    }

    async fn post_json(body: &str) -> (StatusCode, Value) {
        let app = Router::new().route(
            "/enroll",
            post(|ValidatedJson(e): ValidatedJson<Enrollment>| async move { e.course_id }),
        );
        let response = app
            .oneshot(
                axum::http::Request::post("/enroll")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn valid_payload_reaches_the_handler() {
        let app = Router::new().route(
            "/enroll",
            post(|ValidatedJson(e): ValidatedJson<Enrollment>| async move { e.course_id }),
        );
        let response = app
            .oneshot(
                axum::http::Request::post("/enroll")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"course_id":"rust-101","seats":2}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn semantic_issues_become_field_details() {
        let (status, body) = post_json(r#"{"course_id":" ","seats":0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["course_id"], "must not be empty");
        assert_eq!(body["error"]["details"]["seats"], "must be at least 1");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error_on_the_body() {
        let (status, body) = post_json(r#"{"course_id": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["details"]["body"].is_string());
    }

    #[derive(Debug, Deserialize)]
    struct Profile {
        #[allow(dead_code)]
        email: String,
        #[allow(dead_code)]
        address: Address,
    }

    #[derive(Debug, Deserialize)]
    struct Address {
        #[allow(dead_code)]
        zip: u32,
        #[allow(dead_code)]
        lines: Vec<String>,
    }

    impl Validate for Profile {
        fn validate(&self) -> Result<(), Vec<FieldIssue>> {
            Ok(())
        }
    }

    fn details_of(err: ApiError) -> serde_json::Map<String, Value> {
        err.report().details.expect("validation errors carry details")
    }

    #[test]
    fn wrong_typed_nested_field_is_reported_on_its_path() {
        let err = ValidatedJson::<Profile>::from_bytes(
            br#"{"email":"a@example.com","address":{"zip":"x","lines":[]}}"#,
        )
        .unwrap_err();
        let details = details_of(err);
        assert_eq!(details.len(), 1);
        assert!(
            details["address.zip"]
                .as_str()
                .unwrap()
                .starts_with("invalid type: string \"x\"")
        );
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let details = details_of(
            ValidatedJson::<Profile>::from_bytes(br#"{"address":{"zip":1,"lines":[]}}"#)
                .unwrap_err(),
        );
        assert_eq!(details["email"], "is required");

        let details = details_of(
            ValidatedJson::<Profile>::from_bytes(br#"{"email":"a@example.com","address":{"zip":1}}"#)
                .unwrap_err(),
        );
        assert_eq!(details["address.lines"], "is required");
    }

    #[test]
    fn array_elements_are_addressed_by_index() {
        let details = details_of(
            ValidatedJson::<Profile>::from_bytes(
                br#"{"email":"a@example.com","address":{"zip":1,"lines":["ok",7]}}"#,
            )
            .unwrap_err(),
        );
        assert!(details.contains_key("address.lines.1"));
    }

    #[test]
    fn non_object_payload_and_trailing_input_stay_on_the_body() {
        let details = details_of(ValidatedJson::<Profile>::from_bytes(b"[1,2]").unwrap_err());
        assert_eq!(details.keys().collect::<Vec<_>>(), vec!["body"]);

        let details = details_of(
            ValidatedJson::<Enrollment>::from_bytes(br#"{"course_id":"x","seats":1} extra"#)
                .unwrap_err(),
        );
        assert_eq!(details.keys().collect::<Vec<_>>(), vec!["body"]);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_body_issue() {
        let app = Router::new().route(
            "/enroll",
            post(|ValidatedJson(e): ValidatedJson<Enrollment>| async move { e.course_id }),
        );
        let response = app
            .oneshot(
                axum::http::Request::post("/enroll")
                    .body(Body::from(r#"{"course_id":"rust-101","seats":2}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["details"]["body"], MISSING_JSON_CONTENT_TYPE);
    }

    #[test]
    fn from_bytes_checks_semantics_too() {
        let err = ValidatedJson::<Enrollment>::from_bytes(br#"{"course_id":"x","seats":0}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref issues) if issues.len() == 1));
    }
}
