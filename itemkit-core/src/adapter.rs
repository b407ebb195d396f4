//! Dict-like access to items
//!
//! [`ItemView`] and [`ItemAdapter`] present an item as one ordered mapping:
//! declared fields first, in declaration order, then unknown fields in
//! insertion order. Empty values (null, empty arrays, empty objects) are
//! skipped, and an unknown key that collides with a declared field name is
//! hidden behind the declared field.

use crate::error::{ItemError, Result};
use crate::item::{DynItem, Item};
use crate::value::{is_empty_value, RawMap};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Read-only mapping view over an item
#[derive(Debug, Clone, Copy)]
pub struct ItemView<'a> {
    item: &'a dyn DynItem,
}

impl<'a> ItemView<'a> {
    /// Wrap an item
    pub fn new(item: &'a dyn DynItem) -> Self {
        Self { item }
    }

    /// Value of a key: the declared field if the type declares it, else the
    /// unknown field
    ///
    /// Declared fields always resolve, to null when unset.
    pub fn get(&self, key: &str) -> Result<Value> {
        if let Some(value) = self.item.declared_value(key) {
            return Ok(value);
        }
        self.item
            .unknown_map()
            .get(key)
            .cloned()
            .ok_or_else(|| ItemError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Non-empty entries, declared fields first
    pub fn entries(&self) -> Vec<(String, Value)> {
        let schema = self.item.item_schema();
        let mut entries = Vec::with_capacity(schema.len() + self.item.unknown_map().len());

        for name in schema.field_names() {
            if let Some(value) = self.item.declared_value(name) {
                if !is_empty_value(&value) {
                    entries.push((name.to_string(), value));
                }
            }
        }

        for (key, value) in self.item.unknown_map() {
            if schema.declares(key) || is_empty_value(value) {
                continue;
            }
            entries.push((key.clone(), value.clone()));
        }

        entries
    }

    /// Keys in iteration order
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Whether `key` shows up when iterating
    pub fn contains_key(&self, key: &str) -> bool {
        match self.item.declared_value(key) {
            Some(value) => !is_empty_value(&value),
            None => self
                .item
                .unknown_map()
                .get(key)
                .is_some_and(|value| !is_empty_value(value)),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Materialize the view into an ordered map
    ///
    /// Nested items are materialized the same way.
    pub fn as_map(&self) -> RawMap {
        self.entries().into_iter().collect()
    }
}

/// Read/write mapping view over an item
///
/// Writes to declared names go to the declared fields, everything else to
/// the unknown fields.
#[derive(Debug)]
pub struct ItemAdapter<'a> {
    item: &'a mut dyn DynItem,
}

impl<'a> ItemAdapter<'a> {
    /// Wrap an item
    pub fn new(item: &'a mut dyn DynItem) -> Self {
        Self { item }
    }

    /// Read-only view
    pub fn view(&self) -> ItemView<'_> {
        ItemView::new(&*self.item)
    }

    /// See [`ItemView::get`]
    pub fn get(&self, key: &str) -> Result<Value> {
        self.view().get(key)
    }

    /// Assign a key
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if self.item.item_schema().declares(key) {
            self.item.set_declared(key, value)?;
            // A stale unknown entry under a declared name would otherwise
            // survive next to the declared field.
            self.item.unknown_map_mut().shift_remove(key);
            return Ok(());
        }
        self.item.unknown_map_mut().insert(key.to_string(), value);
        Ok(())
    }

    /// Remove a key, returning its previous value
    ///
    /// Declared fields are reset to absent, which only works for fields
    /// that accept null; other declared fields fail with
    /// [`ItemError::FieldNotDeletable`].
    pub fn delete(&mut self, key: &str) -> Result<Value> {
        let schema = self.item.item_schema();
        if let Some(decl) = schema.field(key) {
            if !decl.ty().accepts_null() {
                return Err(ItemError::FieldNotDeletable {
                    item: schema.name(),
                    field: key.to_string(),
                });
            }
            let previous = self.item.declared_value(key).unwrap_or(Value::Null);
            self.item.set_declared(key, Value::Null)?;
            return Ok(previous);
        }

        self.item
            .unknown_map_mut()
            .shift_remove(key)
            .ok_or_else(|| ItemError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// See [`ItemView::keys`]
    pub fn keys(&self) -> Vec<String> {
        self.view().keys()
    }

    /// See [`ItemView::contains_key`]
    pub fn contains_key(&self, key: &str) -> bool {
        self.view().contains_key(key)
    }

    /// See [`ItemView::len`]
    pub fn len(&self) -> usize {
        self.view().len()
    }

    /// See [`ItemView::is_empty`]
    pub fn is_empty(&self) -> bool {
        self.view().is_empty()
    }

    /// See [`ItemView::as_map`]
    pub fn as_map(&self) -> RawMap {
        self.view().as_map()
    }
}

/// `Serialize` support for items, see [`impl_item_serde!`](crate::impl_item_serde)
pub fn serialize_item<T, S>(item: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: Item,
    S: Serializer,
{
    ItemView::new(item).as_map().serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_items::{Link, Meta, Page};
    use serde_json::json;

    fn map(value: Value) -> RawMap {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn page(value: Value) -> Page {
        Page::from_dict(Some(map(value))).unwrap().unwrap()
    }

    #[test]
    fn test_round_trip_with_unknown_fields() {
        let raw = json!({
            "url": "https://p",
            "title": "",
            "link": {"url": "https://l", "rel": "next"},
            "links": [{"url": "https://a", "extra": [1, 2]}],
            "lang": "en",
            "scores": {"a": 1}
        });
        assert_eq!(Value::Object(page(raw.clone()).to_map()), raw);
    }

    #[test]
    fn test_declared_fields_come_first() {
        let item = page(json!({"lang": "en", "title": "T", "url": "https://p"}));
        assert_eq!(ItemView::new(&item).keys(), vec!["url", "title", "lang"]);
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let item = page(json!({
            "url": "https://p",
            "title": null,
            "links": [],
            "a": null,
            "b": [],
            "c": {},
            "d": ""
        }));
        let view = ItemView::new(&item);
        assert_eq!(view.keys(), vec!["url", "d"]);
        assert!(!view.contains_key("links"));
        assert!(view.contains_key("d"));
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_get() {
        let item = page(json!({"url": "https://p", "lang": "en"}));
        let view = ItemView::new(&item);
        assert_eq!(view.get("url").unwrap(), json!("https://p"));
        assert_eq!(view.get("title").unwrap(), Value::Null);
        assert_eq!(view.get("lang").unwrap(), json!("en"));

        let err = view.get("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Key);
    }

    #[test]
    fn test_set_routes_to_the_right_store() {
        let mut item = page(json!({"url": "https://p"}));
        let mut adapter = ItemAdapter::new(&mut item);
        adapter.set("title", json!("Title")).unwrap();
        adapter.set("lang", json!("en")).unwrap();
        adapter.set("link", json!({"url": "https://l", "x": 1})).unwrap();

        assert_eq!(item.title.as_deref(), Some("Title"));
        assert_eq!(item.unknown_fields(), &map(json!({"lang": "en"})));
        let link = item.link.as_ref().unwrap();
        assert_eq!(link.unknown_fields(), &map(json!({"x": 1})));
    }

    #[test]
    fn test_set_with_invalid_value() {
        let mut item = page(json!({"url": "https://p"}));
        let err = ItemAdapter::new(&mut item).set("url", json!(3)).unwrap_err();
        assert!(matches!(err, ItemError::InvalidFieldValue { .. }));
        assert_eq!(item.url, "https://p");
    }

    #[test]
    fn test_collision_declared_wins() {
        let mut item = page(json!({"url": "https://p", "title": "declared"}));
        item.unknown_fields_mut()
            .insert("title".to_string(), json!("unknown"));

        let map_form = item.to_map();
        assert_eq!(map_form.get("title"), Some(&json!("declared")));
        assert_eq!(map_form.len(), 2);

        ItemAdapter::new(&mut item).set("title", json!("new")).unwrap();
        assert!(!item.unknown_fields().contains_key("title"));
    }

    #[test]
    fn test_delete() {
        let mut item = page(json!({"url": "https://p", "title": "T", "lang": "en", "z": 1}));
        let mut adapter = ItemAdapter::new(&mut item);

        assert_eq!(adapter.delete("title").unwrap(), json!("T"));
        assert_eq!(adapter.delete("lang").unwrap(), json!("en"));
        assert_eq!(adapter.keys(), vec!["url", "z"]);

        let err = adapter.delete("lang").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Key);

        let err = adapter.delete("url").unwrap_err();
        assert!(matches!(err, ItemError::FieldNotDeletable { .. }));
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_delete_field_with_non_null_default() {
        let mut meta = Meta::from_dict(Some(map(json!({"probability": 0.5}))))
            .unwrap()
            .unwrap();
        let err = ItemAdapter::new(&mut meta).delete("probability").unwrap_err();
        assert!(matches!(err, ItemError::FieldNotDeletable { .. }));
    }

    #[test]
    fn test_works_through_trait_objects() {
        let mut items: Vec<Box<dyn DynItem>> = vec![
            Box::new(page(json!({"url": "https://p"}))),
            Box::new(Link::from_dict(Some(map(json!({"url": "https://l"})))).unwrap().unwrap()),
        ];
        for item in items.iter_mut() {
            ItemAdapter::new(item.as_mut())
                .set("_source", json!("test"))
                .unwrap();
        }
        let maps: Vec<RawMap> = items.iter().map(|item| ItemView::new(item.as_ref()).as_map()).collect();
        assert_eq!(maps[0], map(json!({"url": "https://p", "_source": "test"})));
        assert_eq!(maps[1], map(json!({"url": "https://l", "_source": "test"})));
        assert!(items[1].as_any().downcast_ref::<Link>().is_some());
    }
}
