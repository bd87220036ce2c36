use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::Value;

use learnhub_api::app::errors::ApiError;
use learnhub_api::app::{AppState, build_app, with_middleware};
use learnhub_api::AppConfig;
use learnhub_auth::{Account, CredentialClaims, Role, TenantMembership, WebhookVerifier};
use learnhub_core::{TenantId, UserId};
use learnhub_infra::InMemoryAccountDirectory;

const JWT_SECRET: &str = "test-secret";
const WEBHOOK_SECRET: &str = "whsec-test";

fn config(overrides: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = [
        ("JWT_SECRET", JWT_SECRET),
        ("DATABASE_URL", "postgres://unused/learnhub"),
        ("WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("APP_ENV", "test"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config is valid")
}

struct TestServer {
    base_url: String,
    directory: Arc<InMemoryAccountDirectory>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(config(&[]), build_app).await
    }

    async fn spawn_with(config: AppConfig, build: impl FnOnce(AppState) -> Router) -> Self {
        // Same router as prod, in-memory directory, ephemeral port.
        let directory = Arc::new(InMemoryAccountDirectory::new());
        let app = build(AppState::new(config, directory.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            directory,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn add_account(&self, tenant_id: Option<TenantId>) -> UserId {
        let id = UserId::new();
        self.directory.upsert_account(Account {
            id,
            email: format!("{id}@example.com"),
            tenant_id,
        });
        id
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, expires_in: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = CredentialClaims {
        sub,
        email: "learner@example.com".to_string(),
        tenant_id: None,
        exp: (now + expires_in).timestamp(),
        iat: Some((now - ChronoDuration::minutes(1)).timestamp()),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn error_of(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false, "error body: {body}");
    (status, body["error"].clone())
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/me")).await.unwrap();
    let (status, error) = error_of(res).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "UNAUTHORIZED");
    assert_eq!(error["message"], "Invalid or expired token");
}

#[tokio::test]
async fn every_credential_failure_has_the_same_message() {
    let srv = TestServer::spawn().await;
    let known = srv.add_account(None);
    let client = reqwest::Client::new();

    let expired = mint_jwt(known, ChronoDuration::minutes(-5));
    let headers = [
        "Token abc".to_string(),
        "Bearer ".to_string(),
        "Bearer not-a-jwt".to_string(),
        format!("Bearer {expired}"),
    ];

    for header in headers {
        let res = client
            .get(srv.url("/me"))
            .header("authorization", header)
            .send()
            .await
            .unwrap();
        let (status, error) = error_of(res).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error["message"], "Invalid or expired token");
        assert!(error.get("details").is_none());
    }
}

#[tokio::test]
async fn valid_token_without_account_is_unauthorized_not_not_found() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(UserId::new(), ChronoDuration::minutes(10));

    let res = reqwest::Client::new()
        .get(srv.url("/me"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(res).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn me_returns_stored_identity_and_deleted_account_loses_access() {
    let srv = TestServer::spawn().await;
    let tenant = TenantId::new();
    let user = srv.add_account(Some(tenant));
    let token = mint_jwt(user, ChronoDuration::minutes(10));
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], user.to_string());
    assert_eq!(body["data"]["tenantId"], tenant.to_string());

    srv.directory.remove_account(user);

    let res = client
        .get(srv.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn personal_tenant_grants_access_and_other_tenant_is_forbidden() {
    let srv = TestServer::spawn().await;
    let t1 = TenantId::new();
    let t2 = TenantId::new();
    let user = srv.add_account(Some(t1));
    let token = mint_jwt(user, ChronoDuration::minutes(10));
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url(&format!("/tenants/{t1}/access")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["tenantId"], t1.to_string());
    assert_eq!(body["data"]["access"]["basis"], "personal_tenant");

    let res = client
        .get(srv.url(&format!("/tenants/{t2}/access")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(res).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["code"], "FORBIDDEN");
}

#[tokio::test]
async fn membership_grants_access_regardless_of_role() {
    let srv = TestServer::spawn().await;
    let tenant = TenantId::new();
    let user = srv.add_account(None);
    srv.directory.upsert_membership(TenantMembership {
        user_id: user,
        tenant_id: tenant,
        role: Some(Role::new("suspended")),
    });
    let token = mint_jwt(user, ChronoDuration::minutes(10));

    let res = reqwest::Client::new()
        .get(srv.url(&format!("/tenants/{tenant}/access")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["access"]["basis"], "membership");
    assert_eq!(body["data"]["access"]["role"], "suspended");
}

#[tokio::test]
async fn tenant_route_authenticates_before_validating_the_path() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/tenants/not-a-uuid/access"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let user = srv.add_account(None);
    let res = client
        .get(srv.url("/tenants/not-a-uuid/access"))
        .bearer_auth(mint_jwt(user, ChronoDuration::minutes(10)))
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert_eq!(error["details"]["tenantId"], "must be a valid UUID");
}

#[tokio::test]
async fn session_is_optional() {
    let srv = TestServer::spawn().await;
    let user = srv.add_account(None);
    let client = reqwest::Client::new();

    let anonymous: Value = client
        .get(srv.url("/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anonymous["data"]["authenticated"], false);
    assert!(anonymous["data"]["user"].is_null());

    let bad_token: Value = client
        .get(srv.url("/session"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bad_token["data"]["authenticated"], false);

    let known: Value = client
        .get(srv.url("/session"))
        .bearer_auth(mint_jwt(user, ChronoDuration::minutes(10)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(known["data"]["authenticated"], true);
    assert_eq!(known["data"]["user"]["id"], user.to_string());
}

#[tokio::test]
async fn webhook_accepts_correct_signature_and_rejects_altered_body() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let signature = WebhookVerifier::new(WEBHOOK_SECRET).sign(br#"{"a":1}"#);

    let res = client
        .post(srv.url("/webhooks/content"))
        .header("x-webhook-signature", &signature)
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["received"], true);

    let res = client
        .post(srv.url("/webhooks/content"))
        .header("x-webhook-signature", &signature)
        .body(r#"{"a":2}"#)
        .send()
        .await
        .unwrap();
    let (status, error) = error_of(res).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["message"], "Invalid webhook signature");

    let res = client
        .post(srv.url("/webhooks/content"))
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unexpected_failures_are_generic_500s() {
    let srv = TestServer::spawn_with(config(&[]), |state| {
        let router = Router::new()
            .route(
                "/boom",
                get(|| async {
                    Err::<(), ApiError>(
                        anyhow::anyhow!("pq: connection to 10.1.2.3 reset").into(),
                    )
                }),
            )
            .route(
                "/panic",
                get(|| async {
                    let enrollments: Vec<u32> = Vec::new();
                    enrollments[3].to_string()
                }),
            );
        with_middleware(router, state)
    })
    .await;

    for path in ["/boom", "/panic"] {
        let res = reqwest::get(srv.url(path)).await.unwrap();
        let (status, error) = error_of(res).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error["code"], "INTERNAL_ERROR");
        assert_eq!(error["message"], "An unexpected error occurred");
        assert!(!error.to_string().contains("10.1.2.3"));
    }
}

#[tokio::test]
async fn correlation_id_is_echoed_or_generated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/health"))
        .header("x-request-id", "req-1234")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-1234");

    let res = client.get(srv.url("/me")).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());
}

#[tokio::test]
async fn rate_limit_is_keyed_by_client() {
    let srv = TestServer::spawn_with(
        config(&[("RATE_LIMIT_PER_SECOND", "1"), ("RATE_LIMIT_BURST", "2")]),
        build_app,
    )
    .await;
    let client = reqwest::Client::new();

    let hit = |ip: &'static str| {
        client
            .get(srv.url("/health"))
            .header("x-forwarded-for", ip)
            .send()
    };

    assert_eq!(hit("203.0.113.1").await.unwrap().status(), StatusCode::OK);
    assert_eq!(hit("203.0.113.1").await.unwrap().status(), StatusCode::OK);

    let (status, error) = error_of(hit("203.0.113.1").await.unwrap()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error["code"], "RATE_LIMITED");

    assert_eq!(hit("203.0.113.2").await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn rotating_non_ip_forwarded_values_share_the_peer_bucket() {
    let srv = TestServer::spawn_with(
        config(&[("RATE_LIMIT_PER_SECOND", "1"), ("RATE_LIMIT_BURST", "2")]),
        build_app,
    )
    .await;
    let client = reqwest::Client::new();

    let hit = |forwarded: &'static str| {
        client
            .get(srv.url("/health"))
            .header("x-forwarded-for", forwarded)
            .send()
    };

    assert_eq!(hit("client-a").await.unwrap().status(), StatusCode::OK);
    assert_eq!(hit("client-b").await.unwrap().status(), StatusCode::OK);

    let (status, error) = error_of(hit("client-c").await.unwrap()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn unknown_routes_use_the_error_contract() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/courses")).await.unwrap();
    let (status, error) = error_of(res).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");
    assert_eq!(error["message"], "Route not found");
}
