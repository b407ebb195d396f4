//! proptest strategies for raw records

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Non-empty JSON leaves: strings (including `""`), integers and booleans
pub fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
    ]
}

/// Values that are never empty: leaves, and non-empty arrays and objects
/// of them
pub fn non_empty_value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 1..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Field name that is not in `declared`
pub fn unknown_key(declared: &'static [&'static str]) -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,11}".prop_filter("declared field name", move |key| {
        !declared.contains(&key.as_str())
    })
}

/// Map of fields unknown to a type declaring `declared`, with non-empty
/// values in generation order
pub fn unknown_fields(
    declared: &'static [&'static str],
    max_len: usize,
) -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec((unknown_key(declared), non_empty_value()), 0..=max_len)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Values that may be empty: null, `[]`, `{}` or a non-empty value
pub fn maybe_empty_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::Array(Vec::new())),
        Just(Value::Object(Map::new())),
        non_empty_value(),
    ]
}

/// Like [`unknown_fields`], but values may be empty
pub fn sparse_unknown_fields(
    declared: &'static [&'static str],
    max_len: usize,
) -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec((unknown_key(declared), maybe_empty_value()), 0..=max_len)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Optional string field that may also be written as an explicit null
///
/// `None` means the key is left out.
pub fn nullable_text() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(Value::Null)),
        "[a-zA-Z0-9 ]{1,16}".prop_map(|text| Some(Value::String(text))),
    ]
}

/// Optional string field value
pub fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z0-9 ]{1,16}")
}

/// ISO 8601 timestamp
pub fn timestamp() -> impl Strategy<Value = String> {
    (2000u32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60).prop_map(
        |(year, month, day, hour, minute)| {
            format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:00Z")
        },
    )
}
