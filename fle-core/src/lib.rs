//! # fle-core
//!
//! Client-side field-level encryption core: a policy-driven JSON-tree
//! rewriter ([`EncryptionProcessor`]) backed by a single-flight,
//! TTL-bounded data-encryption-key cache ([`EncryptionSettingsCache`]).
//! Reaches outside itself only through two injected collaborators —
//! [`DatabaseMetadataSource`] (policies and wrapped keys) and
//! [`MasterKeyStore`] (unwraps keys under a customer master key, normally
//! fulfilled by [`RemoteMasterKeyStore`] against `fle-vault`).
//!
//! ## Quick Start
//!
//! ```ignore
//! use fle_core::{EncryptionProcessor, EngineConfig, DocumentStream};
//! use tokio_util::sync::CancellationToken;
//! use std::sync::Arc;
//!
//! # async fn run(metadata: Arc<dyn fle_core::DatabaseMetadataSource>, keys: Arc<dyn fle_core::MasterKeyStore>) {
//! let processor = EncryptionProcessor::new("my-container", metadata, keys, &EngineConfig::default());
//! let cancel = CancellationToken::new();
//!
//! let mut input = DocumentStream::new(br#"{"email":"a@x.y"}"#.to_vec());
//! let encrypted = processor.encrypt(&mut input, &cancel).await.unwrap();
//! # }
//! ```

mod config;
mod error;
mod model;
mod processor;
mod settings_cache;
mod traits;
mod vault_store;

pub use config::EngineConfig;
pub use error::CoreError;
pub use model::{ClientEncryptionKeyProperties, ClientEncryptionPolicy, EncryptionType, IncludedPath, KeyEncryptionKeyMetadata};
pub use processor::{DocumentStream, EncryptionProcessor};
pub use settings_cache::{DataEncryptionKeyEntry, EncryptionSetting, EncryptionSettingsCache};
pub use traits::{DatabaseMetadataSource, MasterKeyStore};
pub use vault_store::RemoteMasterKeyStore;
