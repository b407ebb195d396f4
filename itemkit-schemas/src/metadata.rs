//! Metadata item types
//!
//! [`Metadata`] is the general form. The narrower types only declare what
//! their consumers use, so casting into them drops fields.

use itemkit_core::{CastTarget, FieldType, Float, UnknownFields};
use serde_json::json;

/// Probability every freshly extracted item starts with
pub const DEFAULT_PROBABILITY: f64 = 1.0;

/// Data extraction process metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Date and time the data was downloaded, ISO 8601
    pub date_downloaded: Option<String>,
    /// Probability that the item is what it claims to be
    pub probability: Float,
    /// Search text the item was found with
    pub search_text: Option<String>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            date_downloaded: None,
            probability: Float::new(DEFAULT_PROBABILITY),
            search_text: None,
            unknown_fields: UnknownFields::new(),
        }
    }
}

itemkit_core::impl_item! {
    Metadata {
        date_downloaded: "dateDownloaded" => optional(FieldType::str()),
        probability: "probability" => default(FieldType::float(), json!(DEFAULT_PROBABILITY)),
        search_text: "searchText" => optional(FieldType::str()),
    }
}

/// Metadata of items extracted from list pages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListMetadata {
    /// Date and time the data was downloaded, ISO 8601
    pub date_downloaded: Option<String>,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

itemkit_core::impl_item! {
    ListMetadata {
        date_downloaded: "dateDownloaded" => optional(FieldType::str()),
    }
}

/// Metadata carrying a probability but no search text
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMetadata {
    /// Date and time the data was downloaded, ISO 8601
    pub date_downloaded: Option<String>,
    /// Probability that the item is what it claims to be
    pub probability: Float,
    /// Fields not declared by this type
    pub unknown_fields: UnknownFields,
}

impl ProbabilityMetadata {
    /// Metadata with the given probability and nothing else
    pub fn with_probability(probability: f64) -> Self {
        Self {
            probability: probability.into(),
            ..Self::default()
        }
    }
}

impl Default for ProbabilityMetadata {
    fn default() -> Self {
        Self {
            date_downloaded: None,
            probability: Float::new(DEFAULT_PROBABILITY),
            unknown_fields: UnknownFields::new(),
        }
    }
}

itemkit_core::impl_item! {
    ProbabilityMetadata {
        date_downloaded: "dateDownloaded" => optional(FieldType::str()),
        probability: "probability" => default(FieldType::float(), json!(DEFAULT_PROBABILITY)),
    }
}

impl CastTarget<Metadata> for ListMetadata {}
impl CastTarget<Metadata> for ProbabilityMetadata {}
impl CastTarget<ListMetadata> for Metadata {}
impl CastTarget<ListMetadata> for ProbabilityMetadata {}
impl CastTarget<ProbabilityMetadata> for Metadata {}
impl CastTarget<ProbabilityMetadata> for ListMetadata {}

#[cfg(test)]
mod tests {
    use super::*;
    use itemkit_core::{cast_with_report, Item};
    use serde_json::Value;

    fn metadata(value: Value) -> Metadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_probability_defaults_to_one() {
        let meta = metadata(json!({"dateDownloaded": "2024-05-01T10:00:00Z"}));
        assert_eq!(meta.probability, 1.0);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"dateDownloaded": "2024-05-01T10:00:00Z", "probability": 1.0})
        );
    }

    #[test]
    fn test_metadata_into_list_metadata() {
        let meta = metadata(json!({
            "dateDownloaded": "2024-05-01T10:00:00Z",
            "probability": 1.0,
            "searchText": "q"
        }));
        let outcome = cast_with_report::<_, ListMetadata>(meta).unwrap();
        assert_eq!(
            outcome.item.date_downloaded.as_deref(),
            Some("2024-05-01T10:00:00Z")
        );
        assert_eq!(outcome.data_loss.map(|loss| loss.fields), Some(vec!["searchText"]));
    }

    #[test]
    fn test_metadata_into_probability_metadata() {
        let meta = metadata(json!({"probability": 0.25}));
        let outcome = cast_with_report::<_, ProbabilityMetadata>(meta).unwrap();
        assert_eq!(outcome.item.probability, 0.25);
        assert_eq!(outcome.data_loss, None);
    }

    #[test]
    fn test_list_metadata_gains_default_probability() {
        let list = ListMetadata {
            date_downloaded: Some("2024-05-01T10:00:00Z".to_string()),
            ..Default::default()
        };
        let meta: ProbabilityMetadata = list.cast().unwrap();
        assert_eq!(meta.probability, DEFAULT_PROBABILITY);
        assert_eq!(meta.date_downloaded.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_integer_probability_keeps_its_spelling() {
        let meta = Metadata::from_value(json!({"probability": 0})).unwrap().unwrap();
        assert_eq!(meta.probability, 0.0);
        assert_eq!(Value::Object(meta.to_map()), json!({"probability": 0}));

        let meta = metadata(json!({"probability": 1, "searchText": "q"}));
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"probability": 1, "searchText": "q"})
        );
    }

    #[test]
    fn test_integer_default_probability_is_not_data_loss() {
        let meta = metadata(json!({"dateDownloaded": "2024-05-01T10:00:00Z", "probability": 1}));
        let outcome = cast_with_report::<_, ListMetadata>(meta).unwrap();
        assert_eq!(outcome.data_loss, None);
    }

    #[test]
    fn test_cast_keeps_probability_spelling() {
        let meta = metadata(json!({"probability": 0}));
        let outcome = cast_with_report::<_, ProbabilityMetadata>(meta).unwrap();
        assert_eq!(Value::Object(outcome.item.to_map()), json!({"probability": 0}));
    }

    #[test]
    fn test_probability_must_be_a_number() {
        let err = Metadata::from_value(json!({"probability": "high"})).unwrap_err();
        assert_eq!(err.kind(), itemkit_core::ErrorKind::Value);

        let err = Metadata::from_value(json!({"probability": null})).unwrap_err();
        assert_eq!(err.kind(), itemkit_core::ErrorKind::Value);
    }
}
