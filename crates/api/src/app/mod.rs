//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: response envelope and DTOs
//! - `errors.rs`: the single error boundary

use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use learnhub_auth::{AccountDirectory, AuthPipeline, Hs256TokenVerifier, TokenVerifier, WebhookVerifier};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// The three authorization sequences, built once at startup.
pub struct AuthPipelines {
    pub required: AuthPipeline,
    pub optional: AuthPipeline,
    pub tenant_scoped: AuthPipeline,
}

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthPipelines>,
    pub webhook: Arc<WebhookVerifier>,
    pub rate_limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl AppState {
    pub fn new(config: AppConfig, directory: Arc<dyn AccountDirectory>) -> Self {
        let verifier: Arc<dyn TokenVerifier> =
            Arc::new(Hs256TokenVerifier::new(config.jwt_secret.as_bytes()));

        let auth = AuthPipelines {
            required: AuthPipeline::required(verifier.clone(), directory.clone()),
            optional: AuthPipeline::optional(verifier.clone(), directory.clone()),
            tenant_scoped: AuthPipeline::tenant_scoped(verifier, directory),
        };

        let quota = Quota::per_second(config.rate_limit_per_second)
            .allow_burst(config.rate_limit_burst);

        Self {
            webhook: Arc::new(WebhookVerifier::new(&config.webhook_secret)),
            rate_limiter: Arc::new(RateLimiter::keyed(quota)),
            auth: Arc::new(auth),
            config: Arc::new(config),
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    with_middleware(routes::router(state.clone()), state)
}

/// Wrap a router in the shared middleware stack.
///
/// Inner to outer: panic catcher, rate limit, request span, HTTP trace, CORS.
pub fn with_middleware(router: Router<AppState>, state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    router
        .fallback(routes::system::not_found)
        .layer(CatchPanicLayer::custom(errors::handle_panic))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(from_fn(middleware::request_context))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}
