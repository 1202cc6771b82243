//! Encryption processor: a policy-driven JSON-tree rewriter that applies
//! per-property AEAD with two distinct modes, preserving type information
//! via the canonical value codec.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fle_envelope::{IvStrategy, TypeMarker};
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{ClientEncryptionPolicy, EncryptionType};
use crate::settings_cache::{DataEncryptionKeyEntry, EncryptionSettingsCache};
use crate::traits::{DatabaseMetadataSource, MasterKeyStore};

/// Single-use handle around a document's JSON bytes, modeling the stream
/// discipline: on success the input is disposed and a fresh stream
/// returned; on failure the input is left inspectable but not reusable.
#[derive(Debug)]
pub struct DocumentStream {
    bytes: Vec<u8>,
    state: StreamState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Fresh,
    Disposed,
    Exhausted,
}

impl DocumentStream {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, state: StreamState::Fresh }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn is_disposed(&self) -> bool {
        self.state == StreamState::Disposed
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == StreamState::Exhausted
    }

    fn dispose(&mut self) {
        self.state = StreamState::Disposed;
    }

    fn mark_exhausted(&mut self) {
        self.state = StreamState::Exhausted;
    }
}

/// Rewrites documents in and out of a container according to its installed
/// encryption policy. Lazily and idempotently fetches that policy on first
/// use; a container with no policy makes `encrypt`/`decrypt` identity
/// transforms.
pub struct EncryptionProcessor {
    container: String,
    metadata: Arc<dyn DatabaseMetadataSource>,
    settings: EncryptionSettingsCache,
    policy: OnceCell<Option<ClientEncryptionPolicy>>,
}

impl EncryptionProcessor {
    pub fn new(
        container: impl Into<String>,
        metadata: Arc<dyn DatabaseMetadataSource>,
        master_key_store: Arc<dyn MasterKeyStore>,
        config: &EngineConfig,
    ) -> Self {
        let container = container.into();
        Self {
            settings: EncryptionSettingsCache::new(
                container.clone(),
                Arc::clone(&metadata),
                master_key_store,
                config.settings_ttl,
            ),
            container,
            metadata,
            policy: OnceCell::new(),
        }
    }

    async fn ensure_policy(&self, cancel: &CancellationToken) -> Result<Option<&ClientEncryptionPolicy>, CoreError> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let policy = self
            .policy
            .get_or_try_init(|| async {
                let fetched = self
                    .metadata
                    .get_client_encryption_policy(&self.container, false, cancel)
                    .await?;
                if let Some(p) = &fetched {
                    validate_policy(p)?;
                    self.settings.install_policy(p, cancel).await?;
                }
                Ok::<_, CoreError>(fetched)
            })
            .await?;
        Ok(policy.as_ref())
    }

    pub async fn encrypt(&self, stream: &mut DocumentStream, cancel: &CancellationToken) -> Result<DocumentStream, CoreError> {
        let root: Value = serde_json::from_slice(stream.as_bytes())
            .map_err(|e| CoreError::PolicyInvalid(format!("document is not valid JSON: {}", e)))?;

        match self.encrypt_tree(root, cancel).await {
            Ok(encrypted) => {
                stream.dispose();
                let bytes = serde_json::to_vec(&encrypted).expect("serde_json::Value always serializes");
                Ok(DocumentStream::new(bytes))
            }
            Err(e) => {
                stream.mark_exhausted();
                Err(e)
            }
        }
    }

    pub async fn decrypt(&self, stream: &mut DocumentStream, cancel: &CancellationToken) -> Result<DocumentStream, CoreError> {
        let root: Value = serde_json::from_slice(stream.as_bytes())
            .map_err(|e| CoreError::PolicyInvalid(format!("document is not valid JSON: {}", e)))?;

        match self.decrypt_tree(root, cancel).await {
            Ok(decrypted) => {
                stream.dispose();
                let bytes = serde_json::to_vec(&decrypted).expect("serde_json::Value always serializes");
                Ok(DocumentStream::new(bytes))
            }
            Err(e) => {
                stream.mark_exhausted();
                Err(e)
            }
        }
    }

    async fn encrypt_tree(&self, mut root: Value, cancel: &CancellationToken) -> Result<Value, CoreError> {
        let Some(policy) = self.ensure_policy(cancel).await? else {
            return Ok(root);
        };
        if policy.included_paths.is_empty() {
            return Ok(root);
        }

        let obj = root
            .as_object_mut()
            .ok_or_else(|| CoreError::PolicyInvalid("document root must be a JSON object".into()))?;

        for path in &policy.included_paths {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            let prop = path
                .property_name()
                .ok_or_else(|| CoreError::PolicyInvalid(format!("malformed included path: {}", path.path)))?;
            let Some(value) = obj.get_mut(prop) else { continue };
            if value.is_null() {
                continue;
            }

            let setting = self
                .settings
                .setting_for(prop)
                .await
                .ok_or_else(|| CoreError::PolicyInvalid(format!("no settings entry installed for {}", prop)))?;
            let entry = self.settings.ensure_entry(&setting.key_id, cancel).await?;
            encrypt_leaf(value, setting.encryption_type, &entry)?;
        }
        Ok(root)
    }

    async fn decrypt_tree(&self, mut root: Value, cancel: &CancellationToken) -> Result<Value, CoreError> {
        let Some(policy) = self.ensure_policy(cancel).await? else {
            return Ok(root);
        };
        if policy.included_paths.is_empty() {
            return Ok(root);
        }

        let obj = root
            .as_object_mut()
            .ok_or_else(|| CoreError::PolicyInvalid("document root must be a JSON object".into()))?;

        for path in &policy.included_paths {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            let prop = path
                .property_name()
                .ok_or_else(|| CoreError::PolicyInvalid(format!("malformed included path: {}", path.path)))?;
            let Some(value) = obj.get_mut(prop) else { continue };
            if value.is_null() {
                continue;
            }

            let setting = self
                .settings
                .setting_for(prop)
                .await
                .ok_or_else(|| CoreError::PolicyInvalid(format!("no settings entry installed for {}", prop)))?;
            let entry = self.settings.ensure_entry(&setting.key_id, cancel).await?;
            decrypt_leaf(value, &entry)?;
        }
        Ok(root)
    }
}

fn validate_policy(policy: &ClientEncryptionPolicy) -> Result<(), CoreError> {
    for path in &policy.included_paths {
        if path.path.is_empty() || !path.path.starts_with('/') {
            return Err(CoreError::PolicyInvalid(format!("path must start with '/': {}", path.path)));
        }
        let rest = &path.path[1..];
        if rest.is_empty() || rest.contains('/') {
            return Err(CoreError::PolicyInvalid(format!(
                "path must name exactly one top-level property: {}",
                path.path
            )));
        }
        if rest == "id" {
            return Err(CoreError::PolicyInvalid("included path must not reference the document id property".into()));
        }
    }
    Ok(())
}

/// Per-element recursion (§ heterogeneous arrays): scalars are encrypted in
/// place, objects and arrays are descended into leaf-by-leaf, nulls are
/// left untouched.
fn encrypt_leaf(value: &mut Value, enc_type: EncryptionType, entry: &DataEncryptionKeyEntry) -> Result<(), CoreError> {
    match value {
        Value::Null => Ok(()),
        Value::Object(map) => {
            for v in map.values_mut() {
                encrypt_leaf(v, enc_type, entry)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                encrypt_leaf(item, enc_type, entry)?;
            }
            Ok(())
        }
        scalar => {
            *scalar = encrypt_scalar(scalar, enc_type, entry)?;
            Ok(())
        }
    }
}

fn encrypt_scalar(value: &Value, enc_type: EncryptionType, entry: &DataEncryptionKeyEntry) -> Result<Value, CoreError> {
    let (marker, canonical) = fle_envelope::serialize(value)?;
    let strategy = match enc_type {
        EncryptionType::Deterministic => IvStrategy::DeterministicFromMac,
        EncryptionType::Randomized => IvStrategy::Random,
    };
    let ciphertext = entry.aead().encrypt(&canonical, strategy)?;

    let mut payload = Vec::with_capacity(1 + ciphertext.len());
    payload.push(marker.as_byte());
    payload.extend_from_slice(&ciphertext);
    Ok(Value::String(STANDARD.encode(payload)))
}

fn decrypt_leaf(value: &mut Value, entry: &DataEncryptionKeyEntry) -> Result<(), CoreError> {
    match value {
        Value::Null => Ok(()),
        Value::Object(map) => {
            for v in map.values_mut() {
                decrypt_leaf(v, entry)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                decrypt_leaf(item, entry)?;
            }
            Ok(())
        }
        scalar => {
            *scalar = decrypt_scalar(scalar, entry)?;
            Ok(())
        }
    }
}

/// Every leaf below a covered path is expected to be ciphertext: a value
/// that isn't a base64 string, or whose marker byte is unknown, is treated
/// as corrupt rather than passed through silently.
fn decrypt_scalar(value: &Value, entry: &DataEncryptionKeyEntry) -> Result<Value, CoreError> {
    let Value::String(s) = value else {
        return Err(CoreError::CryptoIntegrity);
    };
    let bytes = STANDARD.decode(s).map_err(|_| CoreError::CryptoIntegrity)?;
    let (marker_byte, body) = bytes.split_first().ok_or(CoreError::CryptoIntegrity)?;
    let marker = TypeMarker::from_byte(*marker_byte).map_err(|_| CoreError::CryptoIntegrity)?;
    let plaintext = entry.aead().decrypt(body).map_err(|_| CoreError::CryptoIntegrity)?;
    fle_envelope::deserialize(marker, &plaintext).map_err(|_| CoreError::CryptoIntegrity)
}
