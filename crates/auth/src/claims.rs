use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use learnhub_core::{TenantId, UserId};

/// Claims carried by a bearer credential.
///
/// Only meaningful after the token signature has been verified; see
/// [`crate::token::TokenVerifier`]. Timestamps are unix seconds, as issued by
/// the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject: the account the token speaks for.
    pub sub: UserId,

    pub email: String,

    /// Tenant the token was issued for, if the provider scopes tokens.
    #[serde(default, alias = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Expiration (unix seconds).
    pub exp: i64,

    /// Issued-at (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window against `now`.
///
/// A token is expired at the exact second named by `exp`.
pub fn validate_claims(claims: &CredentialClaims, now: DateTime<Utc>) -> Result<(), ClaimsError> {
    let now = now.timestamp();

    if let Some(iat) = claims.iat {
        if claims.exp <= iat {
            return Err(ClaimsError::InvalidTimeWindow);
        }
        if now < iat {
            return Err(ClaimsError::NotYetValid);
        }
    }
    if now >= claims.exp {
        return Err(ClaimsError::Expired);
    }
    Ok(())
}
