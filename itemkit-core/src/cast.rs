//! Conversion between related item types
//!
//! A cast from `S` into `T` is only available when `T` implements
//! [`CastTarget<S>`]. Every item type can be cast into itself; other pairs
//! are registered with an explicit (usually empty) impl:
//!
//! ```ignore
//! impl CastTarget<Metadata> for ListMetadata {}
//! ```
//!
//! The shared and dropped field sets of each pair are computed once and
//! cached. Fields that exist only on the source are dropped; when any of
//! them holds a non-default value the cast still succeeds but reports a
//! [`DataLossWarning`].

use crate::error::{ItemError, Result};
use crate::item::{assemble, Coercion, Item, UnknownFields};
use crate::limits::Limits;
use crate::value::RawMap;
use ahash::AHashMap;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, warn};

/// Registration of `Self` as a cast target for items of type `S`
pub trait CastTarget<S: Item>: Item {
    /// Adjust a freshly cast instance using the source
    ///
    /// Runs after the shared fields have been copied, so it can only fill
    /// in or rewrite fields; required fields must come from the source.
    fn seed(_source: &S, _target: &mut Self) {}
}

impl<T: Item> CastTarget<T> for T {}

/// Field sets of a (source, target) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastDescriptor {
    source: &'static str,
    target: &'static str,
    shared: Vec<&'static str>,
    dropped: Vec<&'static str>,
}

impl CastDescriptor {
    fn new<S: Item, T: Item>() -> Self {
        let source = S::schema();
        let target = T::schema();
        let (shared, dropped) = source.field_names().partition(|name| target.declares(name));
        Self {
            source: source.name(),
            target: target.name(),
            shared,
            dropped,
        }
    }

    /// Source type name
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Target type name
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Fields declared by both types, in source declaration order
    pub fn shared(&self) -> &[&'static str] {
        &self.shared
    }

    /// Fields declared by the source only
    pub fn dropped(&self) -> &[&'static str] {
        &self.dropped
    }

    fn is_shared(&self, name: &str) -> bool {
        self.shared.iter().any(|shared| *shared == name)
    }
}

type DescriptorCache = RwLock<AHashMap<(TypeId, TypeId), Arc<CastDescriptor>>>;

fn descriptor_cache() -> &'static DescriptorCache {
    static CACHE: OnceLock<DescriptorCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Cached descriptor of the cast from `S` into `T`
pub fn cast_descriptor<S, T>() -> Arc<CastDescriptor>
where
    S: Item,
    T: CastTarget<S>,
{
    let key = (TypeId::of::<S>(), TypeId::of::<T>());
    let cached = descriptor_cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(descriptor) = cached {
        return descriptor;
    }

    let descriptor = Arc::new(CastDescriptor::new::<S, T>());
    debug!(
        source = descriptor.source(),
        target = descriptor.target(),
        shared = descriptor.shared().len(),
        dropped = descriptor.dropped().len(),
        "computed cast descriptor"
    );
    descriptor_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(descriptor)
        .clone()
}

/// Non-default data lost by a cast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLossWarning {
    /// Source type name
    pub source: &'static str,
    /// Target type name
    pub target: &'static str,
    /// Dropped fields that held non-default values, in source declaration order
    pub fields: Vec<&'static str>,
}

impl fmt::Display for DataLossWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "casting {} into {} drops non-default fields: {}",
            self.source,
            self.target,
            self.fields.join(", ")
        )
    }
}

/// Result of [`cast_with_report`]
#[derive(Debug, Clone, PartialEq)]
pub struct CastOutcome<T> {
    /// The new instance
    pub item: T,
    /// Set when non-default data had no home in the target type
    pub data_loss: Option<DataLossWarning>,
}

/// Cast `source` into `T`, logging a warning when non-default data is
/// dropped
pub fn cast<S, T>(source: S) -> Result<T>
where
    S: Item,
    T: CastTarget<S>,
{
    let outcome = cast_with_report::<S, T>(source)?;
    if let Some(loss) = &outcome.data_loss {
        warn!(
            source = loss.source,
            target = loss.target,
            fields = %loss.fields.join(" "),
            "{loss}"
        );
    }
    Ok(outcome.item)
}

/// Cast `source` into `T`, returning any data loss instead of logging it
pub fn cast_with_report<S, T>(source: S) -> Result<CastOutcome<T>>
where
    S: Item,
    T: CastTarget<S>,
{
    // Casting into the own type hands the instance back untouched.
    let mut slot = Some(source);
    if let Some(same) = (&mut slot as &mut dyn Any).downcast_mut::<Option<T>>() {
        if let Some(item) = same.take() {
            return Ok(CastOutcome {
                item,
                data_loss: None,
            });
        }
    }
    let Some(source) = slot else {
        return Err(ItemError::Internal(format!(
            "cast source {} vanished",
            S::schema().name()
        )));
    };

    let descriptor = cast_descriptor::<S, T>();
    let data_loss = dropped_data(&source, &descriptor);

    let mut known = RawMap::new();
    for &name in descriptor.shared() {
        match source.raw_field_value(name) {
            Some(Value::Null) | None => {}
            Some(value) => {
                known.insert(name.to_string(), value);
            }
        }
    }

    let target_schema = T::schema();
    let mut unknown = UnknownFields::new();
    for (key, value) in source.unknown_fields() {
        if !target_schema.declares(key) {
            unknown.insert(key.clone(), value.clone());
        } else if !descriptor.is_shared(key) {
            known.insert(key.clone(), value.clone());
        }
    }

    let mut item: T = assemble(known, unknown, Coercion::root(&Limits::default()))?;
    <T as CastTarget<S>>::seed(&source, &mut item);
    Ok(CastOutcome { item, data_loss })
}

fn dropped_data<S: Item>(source: &S, descriptor: &CastDescriptor) -> Option<DataLossWarning> {
    let schema = S::schema();
    let fields: Vec<&'static str> = descriptor
        .dropped()
        .iter()
        .copied()
        .filter(|&name| {
            let value = source.raw_field_value(name).unwrap_or(Value::Null);
            schema
                .field(name)
                .is_some_and(|decl| !decl.default().matches(&value))
        })
        .collect();

    if fields.is_empty() {
        return None;
    }
    Some(DataLossWarning {
        source: descriptor.source(),
        target: descriptor.target(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_items::{ListMeta, Meta, Page, PageSummary, TaggedMeta};
    use serde_json::json;
    use tracing_test::traced_test;

    fn meta(value: Value) -> Meta {
        match value {
            Value::Object(raw) => Meta::from_dict(Some(raw)).unwrap().unwrap(),
            other => panic!("not an object: {other}"),
        }
    }

    fn warning_lines<'a>(lines: &[&'a str]) -> Vec<&'a str> {
        lines
            .iter()
            .copied()
            .filter(|line| line.contains("drops non-default fields"))
            .collect()
    }

    #[test]
    fn test_descriptor_is_cached() {
        let first = cast_descriptor::<Meta, ListMeta>();
        let second = cast_descriptor::<Meta, ListMeta>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.shared(), ["dateDownloaded"]);
        assert_eq!(first.dropped(), ["probability", "searchText"]);
        assert_eq!((first.source(), first.target()), ("Meta", "ListMeta"));
    }

    #[test]
    #[traced_test]
    fn test_cast_warns_once_for_non_default_data() {
        let source = meta(json!({
            "dateDownloaded": "2024-05-01T10:00:00Z",
            "probability": 1.0,
            "searchText": "q"
        }));
        let target: ListMeta = source.cast().unwrap();
        assert_eq!(target.date_downloaded.as_deref(), Some("2024-05-01T10:00:00Z"));

        logs_assert(|lines: &[&str]| match warning_lines(lines).as_slice() {
            [line] if line.contains("searchText") && !line.contains("probability") => Ok(()),
            other => Err(format!("expected one warning about searchText, got {other:?}")),
        });
    }

    #[test]
    #[traced_test]
    fn test_cast_without_data_loss_is_silent() {
        let source = meta(json!({"dateDownloaded": "2024-05-01T10:00:00Z"}));
        let target: ListMeta = source.cast().unwrap();
        assert_eq!(target.date_downloaded.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert!(!logs_contain("drops non-default fields"));
    }

    #[test]
    fn test_report_lists_every_dropped_field() {
        let source = meta(json!({"probability": 0.4, "searchText": "q"}));
        let outcome = cast_with_report::<Meta, ListMeta>(source).unwrap();
        let loss = outcome.data_loss.unwrap();
        assert_eq!(loss.fields, vec!["probability", "searchText"]);
        assert_eq!(
            loss.to_string(),
            "casting Meta into ListMeta drops non-default fields: probability, searchText"
        );
    }

    #[test]
    #[traced_test]
    fn test_identity_cast_returns_the_instance() {
        let source = meta(json!({"searchText": "q", "x": 1}));
        let expected = source.clone();
        let buffer = source.search_text.as_ref().map(|s| s.as_ptr());

        let same: Meta = source.cast().unwrap();
        assert_eq!(same, expected);
        assert_eq!(same.search_text.as_ref().map(|s| s.as_ptr()), buffer);
        assert!(!logs_contain("drops non-default fields"));
    }

    #[test]
    fn test_unknown_fields_carry_over() {
        let source = meta(json!({"dateDownloaded": "d", "x": 1, "y": [1]}));
        let target: ListMeta = source.cast().unwrap();
        let keys: Vec<&str> = target.unknown_fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn test_unknown_field_is_promoted_when_target_declares_it() {
        let source = ListMeta::from_dict(Some(
            json!({"searchText": "q", "other": true})
                .as_object()
                .cloned()
                .unwrap(),
        ))
        .unwrap()
        .unwrap();

        let target: Meta = source.cast().unwrap();
        assert_eq!(target.search_text.as_deref(), Some("q"));
        assert_eq!(target.probability, 1.0);
        assert_eq!(
            target.unknown_fields.keys().collect::<Vec<_>>(),
            vec!["other"]
        );
    }

    #[test]
    fn test_integer_default_is_not_data_loss() {
        let source = meta(json!({"probability": 1}));
        let outcome = cast_with_report::<Meta, ListMeta>(source).unwrap();
        assert_eq!(outcome.data_loss, None);
    }

    #[test]
    fn test_nested_empty_unknown_fields_survive() {
        let page = Page::from_dict(Some(
            json!({
                "url": "https://p",
                "link": {"url": "https://l", "rel": null, "tags": []}
            })
            .as_object()
            .cloned()
            .unwrap(),
        ))
        .unwrap()
        .unwrap();

        let outcome = cast_with_report::<Page, PageSummary>(page).unwrap();
        assert_eq!(outcome.data_loss, None);
        let link = outcome.item.link.unwrap();
        assert_eq!(link.url, "https://l");
        assert_eq!(
            Value::Object(link.unknown_fields),
            json!({"rel": null, "tags": []})
        );
    }

    #[test]
    fn test_seed_runs_after_copy() {
        let source = ListMeta::default();
        let target: Meta = source.cast().unwrap();
        assert_eq!(target.search_text.as_deref(), Some("seeded"));
    }

    #[test]
    fn test_missing_required_target_field() {
        let err = ListMeta::default().cast::<TaggedMeta>().unwrap_err();
        assert!(matches!(err, ItemError::MissingField { item: "TaggedMeta", .. }));
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_source_is_not_touched() {
        let source = meta(json!({"dateDownloaded": "d", "x": {"deep": 1}}));
        let before = source.clone();
        let _: ListMeta = source.clone().cast().unwrap();
        assert_eq!(source, before);
    }
}
