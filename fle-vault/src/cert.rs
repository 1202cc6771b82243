//! Certificate-based client credential for the AAD client-assertion grant.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::EncodingKey;
use sha1::{Digest, Sha1};

/// A certificate credential: an RSA private key plus the DER bytes of the
/// certificate whose thumbprint identifies it to AAD.
///
/// Holds only what's needed to sign the JWT client assertion (RFC 7523);
/// it does not validate the certificate chain or check expiry — that is
/// the embedder's responsibility when provisioning the credential.
pub struct CertificateCredential {
    client_id: String,
    private_key_pem: Vec<u8>,
    certificate_der: Vec<u8>,
}

impl CertificateCredential {
    pub fn new(client_id: impl Into<String>, private_key_pem: Vec<u8>, certificate_der: Vec<u8>) -> Self {
        Self {
            client_id: client_id.into(),
            private_key_pem,
            certificate_der,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// base64url SHA-1 thumbprint of the certificate DER bytes, used as the
    /// JWT header's `x5t` to let AAD locate the verifying public key.
    pub fn thumbprint_b64url(&self) -> String {
        let digest = Sha1::digest(&self.certificate_der);
        URL_SAFE_NO_PAD.encode(digest)
    }

    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, jsonwebtoken::errors::Error> {
        EncodingKey::from_rsa_pem(&self.private_key_pem)
    }
}

impl std::fmt::Debug for CertificateCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateCredential")
            .field("client_id", &self.client_id)
            .field("thumbprint", &self.thumbprint_b64url())
            .finish_non_exhaustive()
    }
}
