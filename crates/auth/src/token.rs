//! Bearer credential verification.
//!
//! Every failure (absent header, malformed header, bad signature, expired
//! token) becomes the same `Unauthorized` error with the same message. The
//! sub-reason is only ever logged at debug level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind as JwtErrorKind};
use thiserror::Error;

use learnhub_core::AppError;

use crate::claims::{ClaimsError, CredentialClaims, validate_claims};

/// Client-visible message for every credential failure.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("authorization header is missing")]
    MissingHeader,

    #[error("authorization header is not a bearer credential")]
    MalformedHeader,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token could not be decoded: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] ClaimsError),
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::unauthorized(INVALID_TOKEN_MESSAGE)
    }
}

/// Verifies a raw bearer token and yields its claims.
///
/// Async so that verifiers backed by remote key sets can fetch keys.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<CredentialClaims, TokenError>;
}

/// HS256 verifier keyed by the service signing secret.
#[derive(Clone)]
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256TokenVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenVerifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenVerifier for Hs256TokenVerifier {
    async fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<CredentialClaims, TokenError> {
        let data = decode::<CredentialClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, TokenError> {
    let header = header.ok_or(TokenError::MissingHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(TokenError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(TokenError::MalformedHeader);
    }

    Ok(token)
}

/// Header extraction + verification in one step.
pub async fn verify_bearer(
    verifier: &dyn TokenVerifier,
    header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CredentialClaims, TokenError> {
    let token = extract_bearer(header)?;
    verifier.verify(token, now).await
}
