//! Data model fetched from the embedding database layer: encryption
//! policies and the metadata needed to locate and unwrap a data-encryption
//! key.

use serde::{Deserialize, Serialize};

/// How a property's plaintext maps to ciphertext bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionType {
    /// Equal plaintexts under the same key always produce equal ciphertext.
    Deterministic,
    /// Ciphertext varies across calls even for equal plaintexts.
    Randomized,
}

/// One property covered by a container's encryption policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncludedPath {
    /// Restricted JSON path: `/<top-level-property>`, no further slashes.
    pub path: String,
    pub client_encryption_key_id: String,
    pub encryption_type: EncryptionType,
    pub encryption_algorithm: String,
}

impl IncludedPath {
    /// The top-level property name, stripped of the leading `/`. `None` if
    /// the path isn't shaped as `/<name>` with no further slashes.
    pub fn property_name(&self) -> Option<&str> {
        let rest = self.path.strip_prefix('/')?;
        if rest.is_empty() || rest.contains('/') {
            return None;
        }
        Some(rest)
    }
}

/// Bound to a container: the ordered list of properties to protect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientEncryptionPolicy {
    pub included_paths: Vec<IncludedPath>,
}

/// Locates a customer master key (key-encryption key) at a provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyEncryptionKeyMetadata {
    pub name: String,
    pub uri: String,
    pub provider: String,
}

/// Metadata fetched from the database for a given `client_encryption_key_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientEncryptionKeyProperties {
    /// The data-encryption key, still wrapped under the master key.
    pub wrapped_data_encryption_key: Vec<u8>,
    /// Name of the wrapping algorithm the master-key store used.
    pub key_wrap_algorithm: String,
    pub key_wrap_metadata: KeyEncryptionKeyMetadata,
}
