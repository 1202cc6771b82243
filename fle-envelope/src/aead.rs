//! AEAD: AES-256-CBC + HMAC-SHA-256, encrypt-then-MAC.
//!
//! Wire layout (v1):
//!   version[1] || iv[16] || enc(plaintext)[padded] || tag[32]
//!
//! Sub-keys are expanded from the protected data-encryption key via
//! HKDF-SHA-256 with distinct `info` strings, so the AES key and the HMAC
//! key are independent even though both come from the same root secret.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use getrandom::getrandom;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoIntegrityError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

const ALGORITHM_VERSION: u8 = 1;
const IV_BYTES: usize = 16;
const TAG_BYTES: usize = 32;
const HEADER_BYTES: usize = 1 + IV_BYTES;

const HKDF_INFO_ENC: &[u8] = b"fle-v1|aes256cbc-enc";
const HKDF_INFO_MAC: &[u8] = b"fle-v1|hmac-sha256-mac";

/// The AEAD key, after passing through the HKDF key schedule: independent
/// AES and HMAC sub-keys, held in a fixed-size buffer that is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ProtectedDataEncryptionKey {
    enc_key: [u8; 32],
    mac_key: [u8; 32],
}

impl std::fmt::Debug for ProtectedDataEncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedDataEncryptionKey").finish_non_exhaustive()
    }
}

impl ProtectedDataEncryptionKey {
    /// Derive the protected key from a raw 32-byte data-encryption key.
    pub fn derive(raw_dek: &[u8; 32]) -> Self {
        let hk = Hkdf::<Sha256>::new(None, raw_dek);
        let mut enc_key = [0u8; 32];
        let mut mac_key = [0u8; 32];
        // HKDF expand only fails if the requested length is too large for the
        // hash; 32 bytes is always valid for SHA-256.
        hk.expand(HKDF_INFO_ENC, &mut enc_key).expect("hkdf expand: fixed 32-byte output");
        hk.expand(HKDF_INFO_MAC, &mut mac_key).expect("hkdf expand: fixed 32-byte output");
        Self { enc_key, mac_key }
    }
}

/// How the IV is chosen for a given encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvStrategy {
    /// IV = first 16 bytes of HMAC-SHA-256(mac_key, plaintext). Equal
    /// plaintexts under the same key produce equal ciphertexts.
    DeterministicFromMac,
    /// IV drawn from the OS CSPRNG. Semantically secure under CPA.
    Random,
}

/// A single keyed AEAD state. No awareness of type markers or JSON.
pub struct Aead256CbcHmac {
    key: ProtectedDataEncryptionKey,
}

impl Aead256CbcHmac {
    pub fn new(key: ProtectedDataEncryptionKey) -> Self {
        Self { key }
    }

    fn iv_for(&self, strategy: IvStrategy, plaintext: &[u8]) -> Result<[u8; IV_BYTES], CryptoIntegrityError> {
        match strategy {
            IvStrategy::DeterministicFromMac => {
                let mut mac = HmacSha256::new_from_slice(&self.key.mac_key)
                    .map_err(|_| CryptoIntegrityError)?;
                mac.update(plaintext);
                let full = mac.finalize().into_bytes();
                let mut iv = [0u8; IV_BYTES];
                iv.copy_from_slice(&full[..IV_BYTES]);
                Ok(iv)
            }
            IvStrategy::Random => {
                let mut iv = [0u8; IV_BYTES];
                getrandom(&mut iv).map_err(|_| CryptoIntegrityError)?;
                Ok(iv)
            }
        }
    }

    /// Encrypt plaintext, never returning a null/empty result on success.
    pub fn encrypt(&self, plaintext: &[u8], strategy: IvStrategy) -> Result<Vec<u8>, CryptoIntegrityError> {
        let iv = self.iv_for(strategy, plaintext)?;

        let enc = Aes256CbcEnc::new((&self.key.enc_key).into(), (&iv).into());
        let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut out = Vec::with_capacity(HEADER_BYTES + ciphertext.len() + TAG_BYTES);
        out.push(ALGORITHM_VERSION);
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);

        let mut mac = HmacSha256::new_from_slice(&self.key.mac_key).map_err(|_| CryptoIntegrityError)?;
        mac.update(&out);
        let tag = mac.finalize().into_bytes();
        out.extend_from_slice(&tag);

        Ok(out)
    }

    /// Decrypt, validating the version byte and MAC in constant time.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoIntegrityError> {
        if ciphertext.len() < HEADER_BYTES + TAG_BYTES {
            return Err(CryptoIntegrityError);
        }

        let tag_start = ciphertext.len() - TAG_BYTES;
        let (body, tag) = ciphertext.split_at(tag_start);

        let mut mac = HmacSha256::new_from_slice(&self.key.mac_key).map_err(|_| CryptoIntegrityError)?;
        mac.update(body);
        let expected_tag = mac.finalize().into_bytes();
        if expected_tag.as_slice().ct_eq(tag).unwrap_u8() != 1 {
            return Err(CryptoIntegrityError);
        }

        let version = body[0];
        if version != ALGORITHM_VERSION {
            return Err(CryptoIntegrityError);
        }

        let iv: [u8; IV_BYTES] = body[1..HEADER_BYTES].try_into().map_err(|_| CryptoIntegrityError)?;
        let enc_body = &body[HEADER_BYTES..];

        let dec = Aes256CbcDec::new((&self.key.enc_key).into(), (&iv).into());
        dec.decrypt_padded_vec_mut::<Pkcs7>(enc_body).map_err(|_| CryptoIntegrityError)
    }
}
