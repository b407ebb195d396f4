//! Helpers over raw JSON values

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Raw, untyped map as received from upstream sources
pub type RawMap = Map<String, Value>;

/// Check whether a value counts as empty for adapter iteration
///
/// Null, empty arrays and empty objects are empty. Strings never are, even
/// when they have no characters.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

/// Get a human-readable type name
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compare two values, treating `1` and `1.0` as equal
///
/// Integers are compared exactly; a float against anything numeric is
/// compared as `f64`.
pub fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y || ((x.is_f64() || y.is_f64()) && x.as_f64() == y.as_f64())
        }
        _ => a == b,
    }
}

/// Float field value that keeps the number it was read from
///
/// JSON writes `1` and `1.0` differently, and an item must hand back what it
/// was given. A `Float` read from JSON serializes to the original number;
/// one built from an `f64` serializes as a float. Equality is numeric.
#[derive(Debug, Clone)]
pub struct Float {
    value: f64,
    written: Option<Number>,
}

impl Float {
    /// Float with the given value, written as a float
    pub fn new(value: f64) -> Self {
        Self {
            value,
            written: None,
        }
    }

    /// Numeric value
    pub fn get(&self) -> f64 {
        self.value
    }

    /// The number this value was read from, if any
    pub fn written(&self) -> Option<&Number> {
        self.written.as_ref()
    }
}

impl From<f64> for Float {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Float> for f64 {
    fn from(value: Float) -> Self {
        value.value
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialEq<f64> for Float {
    fn eq(&self, other: &f64) -> bool {
        self.value == *other
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.written {
            Some(number) => write!(f, "{number}"),
            None => write!(f, "{}", self.value),
        }
    }
}

impl Serialize for Float {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.written {
            Some(number) => number.serialize(serializer),
            None => serializer.serialize_f64(self.value),
        }
    }
}

impl<'de> Deserialize<'de> for Float {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let number = Number::deserialize(deserializer)?;
        let value = number
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("{number} is not representable as a float")))?;
        Ok(Self {
            value,
            written: Some(number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
    }

    #[test]
    fn test_non_empty_values() {
        assert!(!is_empty_value(&json!("")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!([null])));
        assert!(!is_empty_value(&json!({"a": null})));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!(1.5)), "number");
        assert_eq!(type_name(&json!([1])), "array");
        assert_eq!(type_name(&json!({})), "object");
    }

    #[test]
    fn test_values_match() {
        assert!(values_match(&json!(1), &json!(1.0)));
        assert!(values_match(&json!(0.5), &json!(0.5)));
        assert!(!values_match(&json!(1), &json!(2)));
        assert!(!values_match(&json!(1), &json!("1")));
        assert!(values_match(&json!({"a": 1}), &json!({"a": 1})));
    }

    #[test]
    fn test_float_keeps_integer_spelling() {
        let one: Float = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(one, 1.0);
        assert_eq!(serde_json::to_value(&one).unwrap(), json!(1));
        assert_eq!(one.to_string(), "1");

        let half: Float = serde_json::from_value(json!(0.5)).unwrap();
        assert_eq!(serde_json::to_value(&half).unwrap(), json!(0.5));

        assert_eq!(serde_json::to_value(Float::new(1.0)).unwrap(), json!(1.0));
        assert_eq!(one, Float::new(1.0));
    }

    #[test]
    fn test_float_rejects_non_numbers() {
        assert!(serde_json::from_value::<Float>(json!("1.0")).is_err());
        assert!(serde_json::from_value::<Float>(Value::Null).is_err());
    }
}
