use std::sync::Arc;

use learnhub_core::{AppError, AppResult};

use crate::claims::CredentialClaims;
use crate::directory::AccountDirectory;
use crate::token::INVALID_TOKEN_MESSAGE;
use crate::AuthenticatedIdentity;

/// Maps a verified claim subject to a live account.
///
/// The lookup runs on every request, so an account deleted after its token was
/// issued loses access on its very next request.
#[derive(Clone)]
pub struct UserResolver {
    directory: Arc<dyn AccountDirectory>,
}

impl UserResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// Mandatory resolution. A subject without an account is `Unauthorized`
    /// (same message as a bad token), never `NotFound`.
    pub async fn resolve(&self, claims: &CredentialClaims) -> AppResult<AuthenticatedIdentity> {
        self.resolve_optional(claims).await?.ok_or_else(|| {
            tracing::debug!(subject = %claims.sub, "token subject has no account");
            AppError::unauthorized(INVALID_TOKEN_MESSAGE)
        })
    }

    /// Optional resolution: `None` when the subject has no account.
    ///
    /// Directory failures still propagate.
    pub async fn resolve_optional(
        &self,
        claims: &CredentialClaims,
    ) -> AppResult<Option<AuthenticatedIdentity>> {
        let account = self.directory.find_user_by_id(claims.sub).await?;
        Ok(account.map(AuthenticatedIdentity::from))
    }
}
