//! # fle-envelope
//!
//! AEAD primitive and canonical value codec for client-side field-level
//! encryption: AES-256-CBC + HMAC-SHA-256 under encrypt-then-MAC, with
//! deterministic and randomized IV selection, plus the one-byte-marker
//! scalar codec that sits between JSON values and AEAD plaintext.
//!
//! ## Quick Start
//!
//! ```
//! use fle_envelope::{Aead256CbcHmac, IvStrategy, ProtectedDataEncryptionKey};
//!
//! let raw_dek = [7u8; 32];
//! let key = ProtectedDataEncryptionKey::derive(&raw_dek);
//! let aead = Aead256CbcHmac::new(key);
//!
//! let ciphertext = aead.encrypt(b"secret", IvStrategy::Random).unwrap();
//! let plaintext = aead.decrypt(&ciphertext).unwrap();
//! assert_eq!(plaintext, b"secret");
//! ```

mod aead;
mod codec;
mod error;

pub use aead::{Aead256CbcHmac, IvStrategy, ProtectedDataEncryptionKey};
pub use codec::{deserialize, serialize, TypeMarker};
pub use error::{CryptoIntegrityError, UnsupportedValueError};
