//! Per-request context and the extractors handlers use to read it.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use core::convert::Infallible;

use learnhub_auth::{AuthenticatedIdentity, TenantAccess};
use learnhub_core::TenantId;

use crate::app::errors::ApiError;

/// Correlation id of the current request (from `x-request-id` or generated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: String,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Tenant grant established by the tenant access check for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
    access: TenantAccess,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId, access: TenantAccess) -> Self {
        Self { tenant_id, access }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn access(&self) -> &TenantAccess {
        &self.access
    }
}

/// Authenticated caller. Rejects with `401` when no auth middleware ran.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

/// Caller identity on routes where authentication is optional.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedIdentity>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthenticatedIdentity>().cloned()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}
