//! External collaborators the core consumes but does not own: the
//! document-database metadata source and the master-key store. Injected as
//! `Arc<dyn _>` to break the cycle between the processor, its settings
//! cache, and whatever client façade supplies these.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::{ClientEncryptionKeyProperties, ClientEncryptionPolicy, KeyEncryptionKeyMetadata};

#[async_trait]
pub trait DatabaseMetadataSource: Send + Sync {
    async fn get_client_encryption_policy(
        &self,
        container: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<ClientEncryptionPolicy>, CoreError>;

    async fn get_client_encryption_key_properties(
        &self,
        container: &str,
        key_id: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<ClientEncryptionKeyProperties, CoreError>;
}

/// Unwraps/wraps a data-encryption key under a named customer master key.
/// Fulfilled in the default deployment by `fle-vault`'s remote key-vault
/// client; other implementations (e.g. a local HSM) are permitted.
#[async_trait]
pub trait MasterKeyStore: Send + Sync {
    async fn unwrap_key(
        &self,
        kek: &KeyEncryptionKeyMetadata,
        wrapped: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CoreError>;

    async fn wrap_key(
        &self,
        kek: &KeyEncryptionKeyMetadata,
        plaintext: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CoreError>;
}
