//! Request middleware: correlation, rate limiting, and the auth pipelines.

use std::net::{IpAddr, SocketAddr};

use axum::extract::rejection::PathRejection;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use learnhub_auth::AuthContext;
use learnhub_core::{AppError, FieldIssue, TenantId};

use crate::app::AppState;
use crate::app::errors::ApiError;
use crate::context::{RequestContext, TenantContext};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Opens the per-request span and echoes the correlation id on the response.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
        user_id = tracing::field::Empty,
    );
    req.extensions_mut()
        .insert(RequestContext::new(correlation_id.clone()));

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);
    if state.rate_limiter.check_key(&key).is_err() {
        tracing::debug!(client = %key, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

/// Mandatory authentication: verified token and a live account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = state.auth.required.run(auth_context(&state, req.headers())).await?;
    attach_identity(&mut req, ctx);
    Ok(next.run(req).await)
}

/// Optional authentication: unusable credentials leave the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = state.auth.optional.run(auth_context(&state, req.headers())).await?;
    attach_identity(&mut req, ctx);
    Ok(next.run(req).await)
}

/// Mandatory authentication plus access to the `:tenant_id` path segment.
///
/// Authentication runs before the tenant id is validated, so anonymous callers
/// always see `401`.
pub async fn require_tenant_access(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let target = match path {
        Ok(Path(raw)) => raw.parse::<TenantId>(),
        Err(rejection) => Err(AppError::validation([FieldIssue::new(
            ["tenantId"],
            rejection.body_text(),
        )])),
    };

    let ctx = auth_context(&state, req.headers());
    let ctx = match target {
        Ok(tenant_id) => {
            state
                .auth
                .tenant_scoped
                .run(ctx.with_target_tenant(tenant_id))
                .await?
        }
        Err(invalid) => {
            state.auth.required.run(ctx).await?;
            return Err(invalid.into());
        }
    };

    if let (Some(tenant_id), Some(access)) = (ctx.target_tenant, ctx.tenant_access.clone()) {
        req.extensions_mut()
            .insert(TenantContext::new(tenant_id, access));
    }
    attach_identity(&mut req, ctx);
    Ok(next.run(req).await)
}

fn auth_context(state: &AppState, headers: &HeaderMap) -> AuthContext {
    // A header that is not valid text is kept as present-but-malformed.
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    AuthContext::new(authorization, Utc::now())
        .with_deadline(Instant::now() + state.config.auth_timeout)
}

fn attach_identity(req: &mut Request, ctx: AuthContext) {
    if let Some(identity) = ctx.identity {
        tracing::Span::current().record("user_id", tracing::field::display(identity.id));
        req.extensions_mut().insert(identity);
    }
}

/// Rate-limit key: first `x-forwarded-for` hop when it is an IP address, else
/// the peer address.
fn client_key(req: &Request) -> String {
    forwarded_for(req.headers())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok())
}
