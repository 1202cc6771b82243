//! Error types for the AAD token provider and key-vault access client.

use std::fmt;

#[derive(Debug)]
pub enum VaultError {
    /// Configured key URI does not match `https://<vault>/keys/<name>[/<version>]`.
    InvalidKeyUri(String),
    /// base64 input was not length-≡0-mod-4 or failed to decode.
    InvalidBase64,
    /// The authority-discovery probe did not return 401 with a parseable
    /// `WWW-Authenticate` header.
    AuthorityDiscoveryFailed(String),
    /// Vault returned 404 for a configured key-encryption key.
    KeyNotFound,
    /// Vault returned 403 — signals the caller to attempt rewrap.
    AuthenticationFailure,
    /// Vault returned 400.
    WrapUnwrapFailure(String),
    /// Vault returned a status not otherwise mapped.
    InternalServerError(u16),
    /// Transport-level failure talking to the vault, exhausted retries.
    ServiceUnavailable(String),
    /// AAD rejected the credential, or the authority was unreachable after retries.
    AadUnavailable(String),
    /// Cooperative cancellation observed at a suspension point.
    Cancelled,
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyUri(uri) => write!(f, "invalid key vault URI: {}", uri),
            Self::InvalidBase64 => write!(f, "invalid base64 payload"),
            Self::AuthorityDiscoveryFailed(detail) => write!(f, "authority discovery failed: {}", detail),
            Self::KeyNotFound => write!(f, "key not found in vault"),
            Self::AuthenticationFailure => write!(f, "vault rejected authentication (403)"),
            Self::WrapUnwrapFailure(detail) => write!(f, "wrap/unwrap request rejected: {}", detail),
            Self::InternalServerError(status) => write!(f, "vault returned unexpected status {}", status),
            Self::ServiceUnavailable(detail) => write!(f, "key vault unavailable: {}", detail),
            Self::AadUnavailable(detail) => write!(f, "AAD token acquisition failed: {}", detail),
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for VaultError {}
