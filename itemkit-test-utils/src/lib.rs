//! itemkit Test Utilities
//!
//! Record builders, sample records and proptest strategies shared by the
//! itemkit test suites.

use serde_json::{Map, Value};

pub mod strategies;

/// Builder for raw records, keeping insertion order
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Create a new record builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with a string value
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a field with an integer value
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    /// Add a field with a float value; non-finite values become null
    pub fn float(mut self, key: &str, value: f64) -> Self {
        self.fields.insert(key.to_string(), Value::from(value));
        self
    }

    /// Add a field with a boolean value
    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Add a field with a null value
    pub fn null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), Value::Null);
        self
    }

    /// Add a field with a nested record
    pub fn record(mut self, key: &str, value: RecordBuilder) -> Self {
        self.fields.insert(key.to_string(), value.build());
        self
    }

    /// Add a field with a list of nested records
    pub fn records(mut self, key: &str, values: Vec<RecordBuilder>) -> Self {
        let values = values.into_iter().map(RecordBuilder::build).collect();
        self.fields.insert(key.to_string(), Value::Array(values));
        self
    }

    /// Add a field with an arbitrary value
    pub fn value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Build the record as a value
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }

    /// Build the record as a map
    pub fn build_map(self) -> Map<String, Value> {
        self.fields
    }
}

/// Sample records for the itemkit schemas
pub struct SampleRecords;

impl SampleRecords {
    /// Product detail record with nested items and fields no schema declares
    pub fn product() -> Value {
        RecordBuilder::new()
            .string("url", "https://shop.example/p/1")
            .string("name", "Trail Runner")
            .string("price", "89.90")
            .string("currency", "EUR")
            .string("currencyRaw", "€")
            .record(
                "mainImage",
                RecordBuilder::new().string("url", "https://img.example/1.jpg"),
            )
            .records(
                "images",
                vec![
                    RecordBuilder::new().string("url", "https://img.example/1.jpg"),
                    RecordBuilder::new()
                        .string("url", "https://img.example/2.jpg")
                        .int("width", 640),
                ],
            )
            .records(
                "breadcrumbs",
                vec![
                    RecordBuilder::new()
                        .string("name", "Home")
                        .string("url", "https://shop.example"),
                    RecordBuilder::new().string("name", "Shoes"),
                ],
            )
            .record(
                "metadata",
                RecordBuilder::new()
                    .string("dateDownloaded", "2024-05-01T10:00:00Z")
                    .float("probability", 0.97),
            )
            .string("color", "blue")
            .value("sizes", serde_json::json!([40, 41, 42]))
            .build()
    }

    /// Request record with headers and an extra field
    pub fn request() -> Value {
        RecordBuilder::new()
            .string("url", "https://shop.example/search")
            .string("method", "POST")
            .string("body", "cT1zaG9lcw==")
            .records(
                "headers",
                vec![RecordBuilder::new()
                    .string("name", "Content-Type")
                    .string("value", "application/x-www-form-urlencoded")],
            )
            .string("priority", "high")
            .build()
    }

    /// Metadata record holding every declared metadata field
    pub fn metadata() -> Value {
        RecordBuilder::new()
            .string("dateDownloaded", "2024-05-01T10:00:00Z")
            .float("probability", 1.0)
            .string("searchText", "running shoes")
            .build()
    }
}
