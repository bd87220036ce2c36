//! Request authorization pipeline.
//!
//! The authorization sequence is an explicit, ordered list of fallible steps.
//! Each step reads and enriches an [`AuthContext`] and answers either
//! [`Flow::Continue`], [`Flow::Halt`] (stop early, request proceeds with
//! whatever the context holds) or a terminal [`AppError`].
//!
//! Every step is bounded by the request's deadline; a step that overruns is
//! reported as its dependency being unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use learnhub_core::{AppError, AppResult, TenantId};

use crate::claims::CredentialClaims;
use crate::directory::{AccountDirectory, DIRECTORY_SERVICE};
use crate::resolver::UserResolver;
use crate::tenant_access::{TenantAccess, TenantAccessEnforcer};
use crate::token::{INVALID_TOKEN_MESSAGE, TokenVerifier, verify_bearer};
use crate::AuthenticatedIdentity;

/// Per-request state threaded through the steps. Never shared across requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub authorization: Option<String>,
    pub now: DateTime<Utc>,
    pub deadline: Option<Instant>,
    /// Tenant the operation targets, when it is tenant-scoped.
    pub target_tenant: Option<TenantId>,

    pub claims: Option<CredentialClaims>,
    pub identity: Option<AuthenticatedIdentity>,
    pub tenant_access: Option<TenantAccess>,
}

impl AuthContext {
    pub fn new(authorization: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            authorization,
            now,
            deadline: None,
            target_tenant: None,
            claims: None,
            identity: None,
            tenant_access: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_target_tenant(mut self, tenant_id: TenantId) -> Self {
        self.target_tenant = Some(tenant_id);
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

#[async_trait]
pub trait AuthStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dependency reported as unavailable when the step overruns the deadline.
    fn dependency(&self) -> &'static str;

    async fn run(&self, ctx: &mut AuthContext) -> AppResult<Flow>;
}

/// Ordered list of steps plus the runner that drives them.
#[derive(Clone, Default)]
pub struct AuthPipeline {
    steps: Vec<Arc<dyn AuthStep>>,
}

impl AuthPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl AuthStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Token verification then mandatory account resolution.
    pub fn required(verifier: Arc<dyn TokenVerifier>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self::new()
            .step(VerifyBearer { verifier })
            .step(ResolveAccount {
                resolver: UserResolver::new(directory),
            })
    }

    /// Same sequence, but an unusable credential or unknown account leaves the
    /// request anonymous instead of rejecting it.
    pub fn optional(verifier: Arc<dyn TokenVerifier>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self::new()
            .step(OptionalBearer { verifier })
            .step(ResolveAccountIfPresent {
                resolver: UserResolver::new(directory),
            })
    }

    /// Mandatory authentication followed by the tenant access check for
    /// `ctx.target_tenant`.
    pub fn tenant_scoped(
        verifier: Arc<dyn TokenVerifier>,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self::required(verifier, directory.clone()).step(RequireTenantAccess {
            enforcer: TenantAccessEnforcer::new(directory),
        })
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, mut ctx: AuthContext) -> AppResult<AuthContext> {
        for step in &self.steps {
            let deadline = ctx.deadline;
            let outcome = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, step.run(&mut ctx))
                    .await
                    .map_err(|_| {
                        tracing::warn!(step = step.name(), "auth step exceeded request deadline");
                        AppError::service_unavailable(step.dependency())
                    })?,
                None => step.run(&mut ctx).await,
            };

            match outcome {
                Ok(Flow::Continue) => continue,
                Ok(Flow::Halt) => {
                    tracing::debug!(step = step.name(), "auth pipeline halted");
                    break;
                }
                Err(err) => {
                    tracing::debug!(step = step.name(), error = %err, "auth step failed");
                    return Err(err);
                }
            }
        }
        Ok(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Steps
// ─────────────────────────────────────────────────────────────────────────────

pub struct VerifyBearer {
    pub verifier: Arc<dyn TokenVerifier>,
}

#[async_trait]
impl AuthStep for VerifyBearer {
    fn name(&self) -> &'static str {
        "verify_bearer"
    }

    fn dependency(&self) -> &'static str {
        "token verifier"
    }

    async fn run(&self, ctx: &mut AuthContext) -> AppResult<Flow> {
        let claims = verify_bearer(&*self.verifier, ctx.authorization.as_deref(), ctx.now)
            .await
            .map_err(|reason| {
                tracing::debug!(%reason, "bearer credential rejected");
                AppError::from(reason)
            })?;
        ctx.claims = Some(claims);
        Ok(Flow::Continue)
    }
}

pub struct OptionalBearer {
    pub verifier: Arc<dyn TokenVerifier>,
}

#[async_trait]
impl AuthStep for OptionalBearer {
    fn name(&self) -> &'static str {
        "optional_bearer"
    }

    fn dependency(&self) -> &'static str {
        "token verifier"
    }

    async fn run(&self, ctx: &mut AuthContext) -> AppResult<Flow> {
        if ctx.authorization.is_none() {
            return Ok(Flow::Halt);
        }
        match verify_bearer(&*self.verifier, ctx.authorization.as_deref(), ctx.now).await {
            Ok(claims) => {
                ctx.claims = Some(claims);
                Ok(Flow::Continue)
            }
            Err(reason) => {
                tracing::debug!(%reason, "ignoring unusable credential on optional route");
                Ok(Flow::Halt)
            }
        }
    }
}

pub struct ResolveAccount {
    pub resolver: UserResolver,
}

#[async_trait]
impl AuthStep for ResolveAccount {
    fn name(&self) -> &'static str {
        "resolve_account"
    }

    fn dependency(&self) -> &'static str {
        DIRECTORY_SERVICE
    }

    async fn run(&self, ctx: &mut AuthContext) -> AppResult<Flow> {
        let claims = ctx
            .claims
            .as_ref()
            .ok_or_else(|| AppError::unauthorized(INVALID_TOKEN_MESSAGE))?;
        ctx.identity = Some(self.resolver.resolve(claims).await?);
        Ok(Flow::Continue)
    }
}

pub struct ResolveAccountIfPresent {
    pub resolver: UserResolver,
}

#[async_trait]
impl AuthStep for ResolveAccountIfPresent {
    fn name(&self) -> &'static str {
        "resolve_account_if_present"
    }

    fn dependency(&self) -> &'static str {
        DIRECTORY_SERVICE
    }

    async fn run(&self, ctx: &mut AuthContext) -> AppResult<Flow> {
        let Some(claims) = ctx.claims.as_ref() else {
            return Ok(Flow::Halt);
        };
        ctx.identity = self.resolver.resolve_optional(claims).await?;
        Ok(Flow::Continue)
    }
}

pub struct RequireTenantAccess {
    pub enforcer: TenantAccessEnforcer,
}

#[async_trait]
impl AuthStep for RequireTenantAccess {
    fn name(&self) -> &'static str {
        "require_tenant_access"
    }

    fn dependency(&self) -> &'static str {
        DIRECTORY_SERVICE
    }

    async fn run(&self, ctx: &mut AuthContext) -> AppResult<Flow> {
        let Some(target) = ctx.target_tenant else {
            return Ok(Flow::Continue);
        };
        let identity = ctx
            .identity
            .as_ref()
            .ok_or_else(|| AppError::unauthorized(INVALID_TOKEN_MESSAGE))?;
        ctx.tenant_access = Some(self.enforcer.enforce(identity, target).await?);
        Ok(Flow::Continue)
    }
}
