//! Encryption-settings cache: per-`key_id` TTL cache of unwrapped
//! data-encryption keys bound to an AEAD state, plus the per-property
//! `EncryptionSetting` map published by policy install. Single-flight on
//! both: concurrent callers for an uninitialized `key_id` share one
//! unwrap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fle_envelope::{Aead256CbcHmac, ProtectedDataEncryptionKey};
use moka::future::Cache;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::error::{clone_core_error, CoreError};
use crate::model::{ClientEncryptionPolicy, EncryptionType};
use crate::traits::{DatabaseMetadataSource, MasterKeyStore};

/// The runtime binding of a property name to a key and an encryption mode.
#[derive(Clone, Debug)]
pub struct EncryptionSetting {
    pub key_id: String,
    pub encryption_type: EncryptionType,
}

/// A ready-to-use data-encryption key: unwrapped and passed through the
/// local AEAD key schedule. Held behind `Arc` so cache hits are a clone of
/// the pointer, never of the secret material.
pub struct DataEncryptionKeyEntry {
    key_id: String,
    aead: Aead256CbcHmac,
}

impl DataEncryptionKeyEntry {
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn aead(&self) -> &Aead256CbcHmac {
        &self.aead
    }
}

impl std::fmt::Debug for DataEncryptionKeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataEncryptionKeyEntry")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

pub struct EncryptionSettingsCache {
    container: String,
    metadata: Arc<dyn DatabaseMetadataSource>,
    master_key_store: Arc<dyn MasterKeyStore>,
    entries: Cache<String, Arc<DataEncryptionKeyEntry>>,
    settings: RwLock<HashMap<String, EncryptionSetting>>,
}

impl EncryptionSettingsCache {
    pub fn new(
        container: impl Into<String>,
        metadata: Arc<dyn DatabaseMetadataSource>,
        master_key_store: Arc<dyn MasterKeyStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            container: container.into(),
            metadata,
            master_key_store,
            entries: Cache::builder().time_to_live(ttl).build(),
            settings: RwLock::new(HashMap::new()),
        }
    }

    /// Materialize every distinct `key_id` referenced by the policy before
    /// publishing per-property settings, so that once this returns, every
    /// property's setting has at least one unexpired initialization.
    pub async fn install_policy(
        &self,
        policy: &ClientEncryptionPolicy,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let mut distinct_key_ids: Vec<&str> = Vec::new();
        for path in &policy.included_paths {
            let key_id = path.client_encryption_key_id.as_str();
            if !distinct_key_ids.contains(&key_id) {
                distinct_key_ids.push(key_id);
            }
        }
        for key_id in distinct_key_ids {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            self.ensure_entry(key_id, cancel).await?;
        }

        let mut built = HashMap::with_capacity(policy.included_paths.len());
        for path in &policy.included_paths {
            let prop = path
                .property_name()
                .ok_or_else(|| CoreError::PolicyInvalid(format!("malformed included path: {}", path.path)))?;
            built.insert(
                prop.to_string(),
                EncryptionSetting {
                    key_id: path.client_encryption_key_id.clone(),
                    encryption_type: path.encryption_type,
                },
            );
        }

        *self.settings.write().await = built;
        Ok(())
    }

    pub async fn setting_for(&self, property: &str) -> Option<EncryptionSetting> {
        self.settings.read().await.get(property).cloned()
    }

    /// Returns the ready entry for `key_id`, unwrapping it if this is the
    /// first caller; concurrent callers for the same `key_id` share one
    /// unwrap and observe its result.
    pub async fn ensure_entry(
        &self,
        key_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<DataEncryptionKeyEntry>, CoreError> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        self.entries
            .try_get_with(key_id.to_string(), self.init_entry(key_id, cancel))
            .await
            .map_err(|e: Arc<CoreError>| clone_core_error(&e))
    }

    async fn init_entry(&self, key_id: &str, cancel: &CancellationToken) -> Result<Arc<DataEncryptionKeyEntry>, CoreError> {
        let props = self
            .metadata
            .get_client_encryption_key_properties(&self.container, key_id, false, cancel)
            .await?;

        let unwrapped = self
            .master_key_store
            .unwrap_key(&props.key_wrap_metadata, &props.wrapped_data_encryption_key, cancel)
            .await;

        let raw_dek: Zeroizing<Vec<u8>> = Zeroizing::new(match unwrapped {
            Ok(bytes) => bytes,
            Err(CoreError::AuthenticationFailure(_)) => {
                tracing::warn!(key_id, "master key store returned forbidden, retrying with forced key-properties refresh");
                if cancel.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
                let refreshed = self
                    .metadata
                    .get_client_encryption_key_properties(&self.container, key_id, true, cancel)
                    .await?;
                self.master_key_store
                    .unwrap_key(&refreshed.key_wrap_metadata, &refreshed.wrapped_data_encryption_key, cancel)
                    .await
                    .map_err(|e| CoreError::KeyUnwrapFailed(e.to_string()))?
            }
            Err(other) => return Err(other),
        });

        let raw_dek: Zeroizing<[u8; 32]> = Zeroizing::new(
            raw_dek
                .as_slice()
                .try_into()
                .map_err(|_| CoreError::KeyUnwrapFailed("unwrapped data-encryption key is not 32 bytes".into()))?,
        );

        let protected = ProtectedDataEncryptionKey::derive(&raw_dek);
        let aead = Aead256CbcHmac::new(protected);
        tracing::debug!(key_id, "data-encryption key entry initialized");
        Ok(Arc::new(DataEncryptionKeyEntry { key_id: key_id.to_string(), aead }))
    }

    /// Remove the entry for `key_id`; the next use reinitializes it.
    pub async fn invalidate(&self, key_id: &str) {
        self.entries.invalidate(key_id).await;
    }

    /// Strictly expiry-driven: the cache never refreshes proactively. This
    /// exists as a documented no-op rather than an implicit absence, so a
    /// caller cannot mistake "not implemented" for "refreshes on a timer".
    pub fn rotate_ttl(&self) {}
}
