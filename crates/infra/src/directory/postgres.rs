//! Postgres-backed account directory.
//!
//! Queries select only the columns the pipeline needs; password hashes and
//! profile data never leave the database on this path.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use learnhub_auth::{Account, AccountDirectory, DirectoryError, Role, TenantMembership};
use learnhub_core::{TenantId, UserId};

#[derive(Clone)]
pub struct PostgresAccountDirectory {
    pool: PgPool,
}

impl PostgresAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Connectivity failures are retryable outages; anything else is a query bug.
fn classify(err: sqlx::Error) -> DirectoryError {
    match err {
        sqlx::Error::PoolTimedOut => DirectoryError::Timeout,
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            DirectoryError::Unavailable(err.to_string())
        }
        other => DirectoryError::Query(other.to_string()),
    }
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    #[instrument(skip(self), fields(operation = "find_user_by_id"))]
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<Account>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, tenant_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.map(|r| {
            Ok(Account {
                id: UserId::from_uuid(r.try_get("id").map_err(classify)?),
                email: r.try_get("email").map_err(classify)?,
                tenant_id: r
                    .try_get::<Option<uuid::Uuid>, _>("tenant_id")
                    .map_err(classify)?
                    .map(TenantId::from_uuid),
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(operation = "find_membership"))]
    async fn find_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<TenantMembership>, DirectoryError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, tenant_id, role
            FROM tenant_memberships
            WHERE user_id = $1 AND tenant_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.map(|r| {
            Ok(TenantMembership {
                user_id: UserId::from_uuid(r.try_get("user_id").map_err(classify)?),
                tenant_id: TenantId::from_uuid(r.try_get("tenant_id").map_err(classify)?),
                role: r
                    .try_get::<Option<String>, _>("role")
                    .map_err(classify)?
                    .map(Role::new),
            })
        })
        .transpose()
    }
}
