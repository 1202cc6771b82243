//! Error types for the AEAD primitive and canonical value codec.

use std::fmt;

/// AEAD decryption failed: truncated input, version mismatch, or MAC mismatch.
///
/// Deliberately uninformative — distinguishing these cases to a caller would
/// turn the decrypt path into a padding/MAC oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoIntegrityError;

impl fmt::Display for CryptoIntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ciphertext failed integrity check")
    }
}

impl std::error::Error for CryptoIntegrityError {}

/// A JSON scalar could not be mapped to a canonical byte encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedValueError {
    /// `serde_json::Value` variant is not one of bool/number/string (array, object, null).
    NotAScalar,
    /// Integer value does not fit in an `i64`.
    IntegerOutOfRange,
    /// Marker byte on a decrypted payload is not one of {2, 3, 4, 5}.
    UnknownMarker(u8),
}

impl fmt::Display for UnsupportedValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAScalar => write!(f, "value is not a supported scalar"),
            Self::IntegerOutOfRange => write!(f, "integer value out of i64 range"),
            Self::UnknownMarker(m) => write!(f, "unknown type marker: {}", m),
        }
    }
}

impl std::error::Error for UnsupportedValueError {}
