//! Serde helper modules for the loosely-typed fields in Binance C2C json.
//!
//! Binance (and browser clients talking to the proxy) are not consistent about
//! whether ids are json strings or json numbers. Pay ids in particular are
//! 64-bit values that overflow a javascript number, so we always keep them as
//! strings on our side.

use serde::{Deserialize, Deserializer, Serializer, de::Error};
use serde_json::Value;

/// Serialize a `String` as-is, but accept a json string or a json number when
/// deserializing.
///
/// # Example
/// ```ignore
/// #[serde(with = "crate::serde_helpers::string_or_number")]
/// pub pay_id: String,
/// ```
pub mod string_or_number {
    use super::*;

    pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected string or number, found: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestStringOrNumber {
        #[serde(with = "string_or_number")]
        id: String,
    }

    #[test]
    fn test_string_or_number_from_string() {
        let json = r#"{"id":"13753690538259550208"}"#;
        let test: TestStringOrNumber = serde_json::from_str(json).unwrap();
        assert_eq!(test.id, "13753690538259550208");
    }

    #[test]
    fn test_string_or_number_from_large_number() {
        // Larger than i64::MAX, must not lose precision
        let json = r#"{"id":13753690538259550208}"#;
        let test: TestStringOrNumber = serde_json::from_str(json).unwrap();
        assert_eq!(test.id, "13753690538259550208");
    }

    #[test]
    fn test_string_or_number_serializes_as_string() {
        let test = TestStringOrNumber { id: "42".to_string() };
        let json = serde_json::to_string(&test).unwrap();
        assert_eq!(json, r#"{"id":"42"}"#);
    }

    #[test]
    fn test_string_or_number_rejects_object() {
        let json = r#"{"id":{"nested":1}}"#;
        assert!(serde_json::from_str::<TestStringOrNumber>(json).is_err());
    }
}
