//! # fle-vault
//!
//! AAD token provider and key-vault access client: the two network-facing
//! collaborators behind a master-key store's `wrap`/`unwrap`.
//!
//! [`AadTokenProvider`] performs the certificate client-credentials grant
//! and caches bearer tokens. [`KeyVaultAccessClient`] performs `wrap` and
//! `unwrap` against a remote vault, discovering the authority for each key
//! URI via an unauthenticated challenge probe and retrying transient
//! failures.

mod cert;
mod client;
mod error;
mod retry;
mod token;

pub use cert::CertificateCredential;
pub use client::KeyVaultAccessClient;
pub use error::VaultError;
pub use retry::RetryPolicy;
pub use token::AadTokenProvider;
