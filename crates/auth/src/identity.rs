use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use learnhub_core::{TenantId, UserId};

/// Role carried by a tenant membership.
///
/// Opaque at this layer: the pipeline never gates on role names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal account projection returned by the directory: exactly the fields
/// the pipeline needs downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    /// Personal tenant: grants implicit access to this one tenant.
    pub tenant_id: Option<TenantId>,
}

/// Explicit grant linking a user to a tenant.
///
/// At most one membership exists per `(user_id, tenant_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Option<Role>,
}

/// Identity of the caller for the lifetime of one request.
///
/// Built from a live account lookup on every request; never cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    pub id: UserId,
    pub email: String,
    pub tenant_id: Option<TenantId>,
}

impl From<Account> for AuthenticatedIdentity {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            tenant_id: account.tenant_id,
        }
    }
}
