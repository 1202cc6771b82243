//! Error types for the encryption processor, settings cache, and the two
//! injected external collaborators.

use std::fmt;

#[derive(Debug)]
pub enum CoreError {
    /// Included path malformed or references `id`.
    PolicyInvalid(String),
    /// Scalar not in {bool, int64, f64, string}, or int out of i64 range.
    UnsupportedValue(String),
    /// Key vault returned 404 for a configured key-encryption key.
    KeyNotFound(String),
    /// Master-key store returned forbidden; triggers one rewrap retry.
    AuthenticationFailure(String),
    /// The rewrap retry also failed.
    KeyUnwrapFailed(String),
    /// AAD rejected the credential, or the authority was unreachable.
    AadUnavailable(String),
    /// Persistent transport failure talking to the key vault.
    KeyVaultServiceUnavailable(String),
    /// Key vault returned 400.
    WrapUnwrapFailure(String),
    /// AEAD tag mismatch, truncated ciphertext, or version-byte mismatch.
    CryptoIntegrity,
    /// Cooperative cancellation observed at a suspension point.
    Cancelled,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PolicyInvalid(detail) => write!(f, "invalid encryption policy: {}", detail),
            Self::UnsupportedValue(detail) => write!(f, "unsupported value: {}", detail),
            Self::KeyNotFound(detail) => write!(f, "key not found: {}", detail),
            Self::AuthenticationFailure(detail) => write!(f, "authentication failure: {}", detail),
            Self::KeyUnwrapFailed(detail) => write!(f, "key unwrap failed: {}", detail),
            Self::AadUnavailable(detail) => write!(f, "AAD unavailable: {}", detail),
            Self::KeyVaultServiceUnavailable(detail) => write!(f, "key vault unavailable: {}", detail),
            Self::WrapUnwrapFailure(detail) => write!(f, "wrap/unwrap failure: {}", detail),
            Self::CryptoIntegrity => write!(f, "ciphertext failed integrity check"),
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<fle_envelope::UnsupportedValueError> for CoreError {
    fn from(e: fle_envelope::UnsupportedValueError) -> Self {
        CoreError::UnsupportedValue(e.to_string())
    }
}

impl From<fle_envelope::CryptoIntegrityError> for CoreError {
    fn from(_: fle_envelope::CryptoIntegrityError) -> Self {
        CoreError::CryptoIntegrity
    }
}

impl From<fle_vault::VaultError> for CoreError {
    fn from(e: fle_vault::VaultError) -> Self {
        use fle_vault::VaultError;
        match e {
            VaultError::KeyNotFound => CoreError::KeyNotFound(e.to_string()),
            VaultError::AuthenticationFailure => CoreError::AuthenticationFailure(e.to_string()),
            VaultError::WrapUnwrapFailure(_) => CoreError::WrapUnwrapFailure(e.to_string()),
            VaultError::AadUnavailable(_) => CoreError::AadUnavailable(e.to_string()),
            VaultError::ServiceUnavailable(_)
            | VaultError::InternalServerError(_)
            | VaultError::AuthorityDiscoveryFailed(_) => CoreError::KeyVaultServiceUnavailable(e.to_string()),
            VaultError::InvalidKeyUri(_) | VaultError::InvalidBase64 => CoreError::WrapUnwrapFailure(e.to_string()),
            VaultError::Cancelled => CoreError::Cancelled,
        }
    }
}

pub(crate) fn clone_core_error(e: &CoreError) -> CoreError {
    match e {
        CoreError::PolicyInvalid(s) => CoreError::PolicyInvalid(s.clone()),
        CoreError::UnsupportedValue(s) => CoreError::UnsupportedValue(s.clone()),
        CoreError::KeyNotFound(s) => CoreError::KeyNotFound(s.clone()),
        CoreError::AuthenticationFailure(s) => CoreError::AuthenticationFailure(s.clone()),
        CoreError::KeyUnwrapFailed(s) => CoreError::KeyUnwrapFailed(s.clone()),
        CoreError::AadUnavailable(s) => CoreError::AadUnavailable(s.clone()),
        CoreError::KeyVaultServiceUnavailable(s) => CoreError::KeyVaultServiceUnavailable(s.clone()),
        CoreError::WrapUnwrapFailure(s) => CoreError::WrapUnwrapFailure(s.clone()),
        CoreError::CryptoIntegrity => CoreError::CryptoIntegrity,
        CoreError::Cancelled => CoreError::Cancelled,
    }
}
