//! Canonical value codec: bidirectional map between JSON scalars and
//! typed byte strings, tagged by a one-byte marker.

use serde_json::{Number, Value};

use crate::error::UnsupportedValueError;

/// One-byte prefix tagging the original JSON scalar type.
///
/// Marker `1` is reserved for null and is never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMarker {
    Boolean = 2,
    Double = 3,
    Long = 4,
    String = 5,
}

impl TypeMarker {
    pub fn from_byte(b: u8) -> Result<Self, UnsupportedValueError> {
        match b {
            2 => Ok(Self::Boolean),
            3 => Ok(Self::Double),
            4 => Ok(Self::Long),
            5 => Ok(Self::String),
            other => Err(UnsupportedValueError::UnknownMarker(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Serialize a JSON scalar to `(marker, canonical bytes)`.
///
/// Only booleans, numbers, and strings are supported — arrays, objects,
/// and null are never passed here; the processor descends into them instead.
pub fn serialize(value: &Value) -> Result<(TypeMarker, Vec<u8>), UnsupportedValueError> {
    match value {
        Value::Bool(b) => Ok((TypeMarker::Boolean, vec![if *b { 1 } else { 0 }])),
        Value::Number(n) => serialize_number(n),
        Value::String(s) => Ok((TypeMarker::String, s.as_bytes().to_vec())),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(UnsupportedValueError::NotAScalar),
    }
}

fn serialize_number(n: &Number) -> Result<(TypeMarker, Vec<u8>), UnsupportedValueError> {
    if let Some(i) = n.as_i64() {
        return Ok((TypeMarker::Long, i.to_le_bytes().to_vec()));
    }
    if n.is_f64() {
        let f = n.as_f64().ok_or(UnsupportedValueError::IntegerOutOfRange)?;
        return Ok((TypeMarker::Double, f.to_le_bytes().to_vec()));
    }
    // Integral but outside i64 range (e.g. a u64 literal beyond i64::MAX).
    Err(UnsupportedValueError::IntegerOutOfRange)
}

/// Reconstruct the JSON scalar from a marker and its canonical bytes.
pub fn deserialize(marker: TypeMarker, bytes: &[u8]) -> Result<Value, UnsupportedValueError> {
    match marker {
        TypeMarker::Boolean => {
            let b = *bytes.first().ok_or(UnsupportedValueError::NotAScalar)?;
            Ok(Value::Bool(b != 0))
        }
        TypeMarker::Long => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| UnsupportedValueError::NotAScalar)?;
            Ok(Value::Number(Number::from(i64::from_le_bytes(arr))))
        }
        TypeMarker::Double => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| UnsupportedValueError::NotAScalar)?;
            let f = f64::from_le_bytes(arr);
            Number::from_f64(f).map(Value::Number).ok_or(UnsupportedValueError::NotAScalar)
        }
        TypeMarker::String => {
            let s = std::str::from_utf8(bytes).map_err(|_| UnsupportedValueError::NotAScalar)?;
            Ok(Value::String(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bool() {
        let (m, b) = serialize(&Value::Bool(true)).unwrap();
        assert_eq!(deserialize(m, &b).unwrap(), Value::Bool(true));
    }

    #[test]
    fn round_trips_long() {
        let v = Value::Number(Number::from(-42i64));
        let (m, b) = serialize(&v).unwrap();
        assert_eq!(m, TypeMarker::Long);
        assert_eq!(deserialize(m, &b).unwrap(), v);
    }

    #[test]
    fn round_trips_double() {
        let v = serde_json::json!(3.25);
        let (m, b) = serialize(&v).unwrap();
        assert_eq!(m, TypeMarker::Double);
        assert_eq!(deserialize(m, &b).unwrap(), v);
    }

    #[test]
    fn round_trips_string() {
        let v = Value::String("hello, world".to_string());
        let (m, b) = serialize(&v).unwrap();
        assert_eq!(deserialize(m, &b).unwrap(), v);
    }

    #[test]
    fn rejects_non_scalar() {
        assert_eq!(serialize(&Value::Null).unwrap_err(), UnsupportedValueError::NotAScalar);
        assert_eq!(serialize(&serde_json::json!([1, 2])).unwrap_err(), UnsupportedValueError::NotAScalar);
    }

    #[test]
    fn unknown_marker_rejected() {
        assert!(matches!(TypeMarker::from_byte(1), Err(UnsupportedValueError::UnknownMarker(1))));
        assert!(matches!(TypeMarker::from_byte(9), Err(UnsupportedValueError::UnknownMarker(9))));
    }
}
