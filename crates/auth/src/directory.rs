//! Account directory: the persistence collaborator the pipeline reads from.
//!
//! The directory owns its own storage and concurrency control; the pipeline
//! only issues point lookups by primary identifier.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use learnhub_core::{AppError, TenantId, UserId};

use crate::{Account, TenantMembership};

/// Name used when reporting the directory as an unavailable dependency.
pub const DIRECTORY_SERVICE: &str = "database";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("account directory unavailable: {0}")]
    Unavailable(String),

    #[error("account directory timed out")]
    Timeout,

    #[error("account directory query failed: {0}")]
    Query(String),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable(_) | DirectoryError::Timeout => {
                tracing::warn!(error = %err, "account directory unavailable");
                AppError::service_unavailable(DIRECTORY_SERVICE)
            }
            DirectoryError::Query(_) => {
                tracing::error!(error = %err, "account directory query failed");
                AppError::internal()
            }
        }
    }
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up an account by id, selecting only `{id, email, tenant_id}`.
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError>;

    async fn find_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<TenantMembership>, DirectoryError>;
}

#[async_trait]
impl<D> AccountDirectory for Arc<D>
where
    D: AccountDirectory + ?Sized,
{
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError> {
        (**self).find_user_by_id(id).await
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<TenantMembership>, DirectoryError> {
        (**self).find_membership(user_id, tenant_id).await
    }
}
