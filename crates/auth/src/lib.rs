//! `learnhub-auth`: request authentication and tenant authorization.
//!
//! This crate is decoupled from HTTP and storage: it talks to persistence only
//! through [`AccountDirectory`] and hands typed errors to the boundary.

pub mod claims;
pub mod directory;
pub mod identity;
pub mod pipeline;
pub mod resolver;
pub mod tenant_access;
pub mod token;
pub mod webhook;

pub use claims::{ClaimsError, CredentialClaims, validate_claims};
pub use directory::{AccountDirectory, DIRECTORY_SERVICE, DirectoryError};
pub use identity::{Account, AuthenticatedIdentity, Role, TenantMembership};
pub use pipeline::{AuthContext, AuthPipeline, AuthStep, Flow};
pub use resolver::UserResolver;
pub use tenant_access::{TENANT_FORBIDDEN_MESSAGE, TenantAccess, TenantAccessEnforcer, decide_tenant_access};
pub use token::{
    Hs256TokenVerifier, INVALID_TOKEN_MESSAGE, TokenError, TokenVerifier, extract_bearer,
    verify_bearer,
};
pub use webhook::{INVALID_SIGNATURE_MESSAGE, SignatureCheck, WEBHOOK_SIGNATURE_HEADER, WebhookVerifier};
