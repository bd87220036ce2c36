//! Inbound webhook authentication (shared-secret HMAC-SHA256).
//!
//! The signature is the lowercase hex digest of the exact raw body bytes. The
//! hex text is compared byte-for-byte in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use learnhub_core::{AppError, AppResult};

pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid webhook signature";

type HmacSha256 = Hmac<Sha256>;

/// Outcome of a signature check. Only `Valid` is accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    /// Rejected before the constant-time comparison ran.
    LengthMismatch,
    Mismatch,
}

/// Verifier keyed by the webhook shared secret, built once at startup.
#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha256,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .expect("HMAC accepts keys of any length");
        Self { mac }
    }

    /// Hex-encoded HMAC-SHA256 of `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn check(&self, body: &[u8], signature: Option<&str>) -> SignatureCheck {
        let Some(provided) = signature else {
            return SignatureCheck::Missing;
        };

        let expected = self.sign(body);
        let (expected, provided) = (expected.as_bytes(), provided.as_bytes());

        if expected.len() != provided.len() {
            return SignatureCheck::LengthMismatch;
        }

        if bool::from(expected.ct_eq(provided)) {
            SignatureCheck::Valid
        } else {
            SignatureCheck::Mismatch
        }
    }

    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> AppResult<()> {
        match self.check(body, signature) {
            SignatureCheck::Valid => Ok(()),
            rejected => {
                tracing::debug!(reason = ?rejected, "webhook signature rejected");
                Err(AppError::unauthorized(INVALID_SIGNATURE_MESSAGE))
            }
        }
    }
}

impl core::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}
