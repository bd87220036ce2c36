use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use learnhub_auth::{Account, AccountDirectory, DirectoryError, TenantMembership};
use learnhub_core::{TenantId, UserId};

/// In-memory directory for tests/dev.
///
/// Memberships are keyed by the `(user, tenant)` pair, so at most one exists
/// per pair; a second upsert replaces the first.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: RwLock<HashMap<UserId, Account>>,
    memberships: RwLock<HashMap<(UserId, TenantId), TenantMembership>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_account(&self, account: Account) {
        if let Ok(mut map) = self.accounts.write() {
            map.insert(account.id, account);
        }
    }

    /// Removing an account also drops its memberships.
    pub fn remove_account(&self, id: UserId) {
        if let Ok(mut map) = self.accounts.write() {
            map.remove(&id);
        }
        if let Ok(mut map) = self.memberships.write() {
            map.retain(|(user_id, _), _| *user_id != id);
        }
    }

    pub fn upsert_membership(&self, membership: TenantMembership) {
        if let Ok(mut map) = self.memberships.write() {
            map.insert((membership.user_id, membership.tenant_id), membership);
        }
    }

    pub fn remove_membership(&self, user_id: UserId, tenant_id: TenantId) {
        if let Ok(mut map) = self.memberships.write() {
            map.remove(&(user_id, tenant_id));
        }
    }
}

fn poisoned<T>(_: T) -> DirectoryError {
    DirectoryError::Unavailable("in-memory directory lock poisoned".to_string())
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError> {
        let map = self.accounts.read().map_err(poisoned)?;
        Ok(map.get(&id).cloned())
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<TenantMembership>, DirectoryError> {
        let map = self.memberships.read().map_err(poisoned)?;
        Ok(map.get(&(user_id, tenant_id)).cloned())
    }
}
