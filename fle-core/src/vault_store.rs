//! Default `MasterKeyStore` implementation: wraps/unwraps data-encryption
//! keys against a remote key vault via `fle-vault`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fle_vault::KeyVaultAccessClient;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::KeyEncryptionKeyMetadata;
use crate::traits::MasterKeyStore;

/// Fulfills `MasterKeyStore` against a remote key vault. The `uri` on the
/// key-encryption-key metadata is the full key URI the vault client
/// validates and wraps/unwraps against.
pub struct RemoteMasterKeyStore {
    client: KeyVaultAccessClient,
}

impl RemoteMasterKeyStore {
    pub fn new(client: KeyVaultAccessClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MasterKeyStore for RemoteMasterKeyStore {
    async fn unwrap_key(
        &self,
        kek: &KeyEncryptionKeyMetadata,
        wrapped: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CoreError> {
        let wrapped_b64 = STANDARD.encode(wrapped);
        let (unwrapped_b64, _canonical_uri) = self.client.unwrap(&kek.uri, &wrapped_b64, cancel).await?;
        STANDARD
            .decode(unwrapped_b64)
            .map_err(|e| CoreError::KeyUnwrapFailed(format!("vault returned non-base64 key material: {}", e)))
    }

    async fn wrap_key(
        &self,
        kek: &KeyEncryptionKeyMetadata,
        plaintext: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CoreError> {
        let plaintext_b64 = STANDARD.encode(plaintext);
        let (wrapped_b64, _canonical_uri) = self.client.wrap(&kek.uri, &plaintext_b64, cancel).await?;
        STANDARD
            .decode(wrapped_b64)
            .map_err(|e| CoreError::WrapUnwrapFailure(format!("vault returned non-base64 wrapped key: {}", e)))
    }
}
