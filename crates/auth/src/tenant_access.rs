//! Tenant scope authorization.
//!
//! A caller may act within a tenant when either
//! - an explicit membership row exists for `(caller, tenant)`, or
//! - the tenant is the caller's personal tenant.
//!
//! The two grounds are equally sufficient. Roles are reported but never gated
//! on at this layer.

use std::sync::Arc;

use serde::Serialize;

use learnhub_core::{AppError, AppResult, TenantId};

use crate::directory::AccountDirectory;
use crate::{AuthenticatedIdentity, Role, TenantMembership};

pub const TENANT_FORBIDDEN_MESSAGE: &str = "You do not have access to this tenant";

/// Why access to a tenant was granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum TenantAccess {
    PersonalTenant,
    Membership { role: Option<Role> },
}

/// Pure access decision given the (optional) membership row for the pair.
///
/// - No IO
/// - No panics
pub fn decide_tenant_access(
    identity: &AuthenticatedIdentity,
    target: TenantId,
    membership: Option<&TenantMembership>,
) -> AppResult<TenantAccess> {
    if identity.tenant_id == Some(target) {
        return Ok(TenantAccess::PersonalTenant);
    }

    match membership {
        Some(m) if m.user_id == identity.id && m.tenant_id == target => {
            Ok(TenantAccess::Membership {
                role: m.role.clone(),
            })
        }
        _ => Err(AppError::forbidden(TENANT_FORBIDDEN_MESSAGE)),
    }
}

/// Confirms an authenticated caller may act within a target tenant.
///
/// Callers authenticate first; the enforcer assumes a resolved identity and
/// must complete before any state-mutating work starts.
#[derive(Clone)]
pub struct TenantAccessEnforcer {
    directory: Arc<dyn AccountDirectory>,
}

impl TenantAccessEnforcer {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    pub async fn enforce(
        &self,
        identity: &AuthenticatedIdentity,
        target: TenantId,
    ) -> AppResult<TenantAccess> {
        // Personal tenant needs no lookup.
        if identity.tenant_id == Some(target) {
            return decide_tenant_access(identity, target, None);
        }

        let membership = self.directory.find_membership(identity.id, target).await?;
        let decision = decide_tenant_access(identity, target, membership.as_ref());

        if decision.is_err() {
            tracing::debug!(user_id = %identity.id, tenant_id = %target, "tenant access denied");
        }
        decision
    }
}
