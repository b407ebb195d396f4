//! Item trait and the dict construction protocol
//!
//! Items are plain Rust structs holding their declared fields plus an
//! ordered map of unknown fields. Building an item from a raw map works in
//! three steps:
//!
//! 1. Split the raw map into declared keys and unknown keys, keeping the
//!    original order of the unknown ones.
//! 2. Hand the declared keys to [`Item::from_fields`] through a
//!    [`FieldReader`], which applies declared defaults and recurses into
//!    nested item fields as classified by [`crate::spec`].
//! 3. Store the unknown keys verbatim on the new instance.
//!
//! Item types declare their fields once, through [`impl_item!`](crate::impl_item).

use crate::adapter::ItemView;
use crate::cast::CastTarget;
use crate::error::{ItemError, Result};
use crate::field::ItemSchema;
use crate::limits::Limits;
use crate::spec::{field_specs, FieldShape, TypeSpecs};
use crate::value::{type_name, RawMap};
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use tracing::trace;

/// Ordered map of fields an item type does not declare
pub type UnknownFields = Map<String, Value>;

/// A schema-typed container
///
/// Implementors declare their fields through [`Item::schema`] and provide
/// field-level access by name; everything else (coercion from raw maps,
/// strict construction, casting, the adapter view) is built on top.
pub trait Item: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Declared fields of this item type
    fn schema() -> &'static ItemSchema;

    /// Build an instance from declared fields
    fn from_fields(fields: &mut FieldReader<'_>) -> Result<Self>;

    /// Current value of a declared field, `None` if `name` is not declared
    ///
    /// Nested items are encoded through the adapter view, so their empty
    /// fields are skipped.
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Like [`Item::field_value`], but nested items are encoded with
    /// [`Item::to_raw_map`]
    fn raw_field_value(&self, name: &str) -> Option<Value>;

    /// Assign a declared field from a raw value
    fn set_field_value(&mut self, name: &str, value: Value) -> Result<()>;

    /// Fields not declared by this item type
    fn unknown_fields(&self) -> &UnknownFields;

    /// Mutable access to the unknown fields
    fn unknown_fields_mut(&mut self) -> &mut UnknownFields;

    /// Build an item from a raw map; `None` stays `None`
    fn from_dict(raw: Option<RawMap>) -> Result<Option<Self>> {
        Self::from_dict_with_limits(raw, &Limits::default())
    }

    /// [`Item::from_dict`] with explicit limits
    fn from_dict_with_limits(raw: Option<RawMap>, limits: &Limits) -> Result<Option<Self>> {
        limits.validate()?;
        match raw {
            Some(raw) => coerce_map(raw, Coercion::root(limits)).map(Some),
            None => Ok(None),
        }
    }

    /// Build an item from a raw value, which must be an object or null
    fn from_value(value: Value) -> Result<Option<Self>> {
        coerce_value(value, Coercion::root(&Limits::default()))
    }

    /// Build items from a list of raw values; `None` becomes an empty list
    fn from_list(raw: Option<Vec<Value>>) -> Result<Vec<Option<Self>>> {
        Self::from_list_with_limits(raw, &Limits::default())
    }

    /// [`Item::from_list`] with explicit limits
    fn from_list_with_limits(raw: Option<Vec<Value>>, limits: &Limits) -> Result<Vec<Option<Self>>> {
        limits.validate()?;
        match raw {
            Some(values) => coerce_list(values, Coercion::root(limits)),
            None => Ok(Vec::new()),
        }
    }

    /// Direct construction from keyword-style fields
    ///
    /// Unlike [`Item::from_dict`], undeclared keys are rejected with
    /// [`ItemError::UnexpectedField`] instead of being kept as unknown.
    fn construct(kwargs: RawMap) -> Result<Self> {
        let schema = Self::schema();
        if let Some(key) = kwargs.keys().find(|key| !schema.declares(key)) {
            return Err(ItemError::UnexpectedField {
                item: schema.name(),
                field: key.clone(),
            });
        }
        assemble(kwargs, UnknownFields::new(), Coercion::root(&Limits::default()))
    }

    /// Ordered map of non-empty declared fields followed by unknown fields
    fn to_map(&self) -> RawMap {
        ItemView::new(self).as_map()
    }

    /// Declared and unknown fields as held, empty values included
    ///
    /// Declared fields that are null are left out; unknown fields are copied
    /// verbatim at every nesting level. Casting reads shared fields from here.
    fn to_raw_map(&self) -> RawMap {
        let schema = Self::schema();
        let mut map = RawMap::new();
        for decl in schema.fields() {
            match self.raw_field_value(decl.name()) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    map.insert(decl.name().to_string(), value);
                }
            }
        }
        for (key, value) in self.unknown_fields() {
            if !schema.declares(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }

    /// Convert into a related item type
    fn cast<T>(self) -> Result<T>
    where
        T: CastTarget<Self>,
    {
        crate::cast::cast(self)
    }
}

/// Object-safe view of any [`Item`], used by schema-agnostic code
pub trait DynItem: fmt::Debug {
    /// Declared fields of the underlying item type
    fn item_schema(&self) -> &'static ItemSchema;
    /// See [`Item::field_value`]
    fn declared_value(&self, name: &str) -> Option<Value>;
    /// See [`Item::set_field_value`]
    fn set_declared(&mut self, name: &str, value: Value) -> Result<()>;
    /// See [`Item::unknown_fields`]
    fn unknown_map(&self) -> &UnknownFields;
    /// See [`Item::unknown_fields_mut`]
    fn unknown_map_mut(&mut self) -> &mut UnknownFields;
    /// Downcasting support
    fn as_any(&self) -> &dyn Any;
}

impl<T: Item> DynItem for T {
    fn item_schema(&self) -> &'static ItemSchema {
        T::schema()
    }

    fn declared_value(&self, name: &str) -> Option<Value> {
        self.field_value(name)
    }

    fn set_declared(&mut self, name: &str, value: Value) -> Result<()> {
        self.set_field_value(name, value)
    }

    fn unknown_map(&self) -> &UnknownFields {
        self.unknown_fields()
    }

    fn unknown_map_mut(&mut self) -> &mut UnknownFields {
        self.unknown_fields_mut()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Position of a coercion inside the nesting of items
#[derive(Debug, Clone, Copy)]
pub(crate) struct Coercion<'a> {
    limits: &'a Limits,
    depth: usize,
}

impl<'a> Coercion<'a> {
    pub(crate) fn root(limits: &'a Limits) -> Self {
        Self { limits, depth: 0 }
    }

    fn descend(self) -> Self {
        Self {
            limits: self.limits,
            depth: self.depth + 1,
        }
    }
}

fn coerce_value<T: Item>(value: Value, ctx: Coercion<'_>) -> Result<Option<T>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(raw) => coerce_map(raw, ctx).map(Some),
        other => Err(ItemError::ExpectedObject {
            item: T::schema().name(),
            found: type_name(&other),
        }),
    }
}

fn coerce_list<T: Item>(values: Vec<Value>, ctx: Coercion<'_>) -> Result<Vec<Option<T>>> {
    values
        .into_iter()
        .map(|value| coerce_value(value, ctx))
        .collect()
}

fn coerce_map<T: Item>(raw: RawMap, ctx: Coercion<'_>) -> Result<T> {
    let schema = T::schema();
    if ctx.depth > ctx.limits.max_nesting_depth {
        return Err(ItemError::DepthLimitExceeded {
            item: schema.name(),
            max_depth: ctx.limits.max_nesting_depth,
        });
    }

    let mut known = RawMap::new();
    let mut unknown = UnknownFields::new();
    for (key, value) in raw {
        if schema.declares(&key) {
            known.insert(key, value);
        } else {
            unknown.insert(key, value);
        }
    }

    if !unknown.is_empty() {
        trace!(
            item = schema.name(),
            count = unknown.len(),
            "keeping fields unknown to the item type"
        );
    }

    assemble(known, unknown, ctx)
}

/// Build `T` from already partitioned declared and unknown fields
pub(crate) fn assemble<T: Item>(
    known: RawMap,
    unknown: UnknownFields,
    ctx: Coercion<'_>,
) -> Result<T> {
    let specs = field_specs::<T>();
    // Every supplied field must have a shape before anything is built.
    for key in known.keys() {
        specs.spec(key)?;
    }

    let mut reader = FieldReader {
        schema: T::schema(),
        specs: &specs,
        values: known,
        ctx,
    };
    let mut item = T::from_fields(&mut reader)?;
    reader.finish()?;

    *item.unknown_fields_mut() = unknown;
    Ok(item)
}

/// How a nested item field is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NestedRead {
    Single,
    List,
    NullableList,
}

impl fmt::Display for NestedRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NestedRead::Single => "an item",
            NestedRead::List => "a list of items",
            NestedRead::NullableList => "a list of optional items",
        })
    }
}

/// Typed access to the declared fields supplied for one item
///
/// Every accessor consumes the field it reads. Fields that were not
/// supplied fall back to their declared default; a required field without a
/// value fails with [`ItemError::MissingField`].
pub struct FieldReader<'a> {
    schema: &'static ItemSchema,
    specs: &'a TypeSpecs,
    values: RawMap,
    ctx: Coercion<'a>,
}

impl<'a> FieldReader<'a> {
    /// Name of the item type being built
    pub fn item_name(&self) -> &'static str {
        self.schema.name()
    }

    /// Read a non-item field, converting it with serde
    pub fn value<T: DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        let raw = self.take(name)?;
        decode_field(self.schema.name(), name, raw)
    }

    /// Read a scalar or optional nested item field
    pub fn nested<T: Item>(&mut self, name: &str) -> Result<Option<T>> {
        self.expect_nested::<T>(name, NestedRead::Single)?;
        let raw = self.take(name)?;
        coerce_value(raw, self.ctx.descend())
    }

    /// Read a list-of-items field whose elements may not be null
    pub fn nested_list<T: Item>(&mut self, name: &str) -> Result<Option<Vec<T>>> {
        let Some(elements) = self.take_list::<T>(name, NestedRead::List)? else {
            return Ok(None);
        };

        let item = self.schema.name();
        let ctx = self.ctx.descend();
        elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                coerce_value(element, ctx)?.ok_or_else(|| ItemError::NullListElement {
                    item,
                    field: name.to_string(),
                    index,
                })
            })
            .collect::<Result<Vec<T>>>()
            .map(Some)
    }

    /// Read a list-of-items field whose elements may be null
    pub fn nested_list_with_nulls<T: Item>(&mut self, name: &str) -> Result<Option<Vec<Option<T>>>> {
        let Some(elements) = self.take_list::<T>(name, NestedRead::NullableList)? else {
            return Ok(None);
        };
        coerce_list(elements, self.ctx.descend()).map(Some)
    }

    fn take_list<T: Item>(&mut self, name: &str, read: NestedRead) -> Result<Option<Vec<Value>>> {
        self.expect_nested::<T>(name, read)?;
        match self.take(name)? {
            Value::Null => Ok(None),
            Value::Array(elements) => Ok(Some(elements)),
            other => Err(ItemError::ExpectedList {
                item: self.schema.name(),
                field: name.to_string(),
                found: type_name(&other),
            }),
        }
    }

    fn expect_nested<T: Item>(&self, name: &str, read: NestedRead) -> Result<()> {
        let spec = self.specs.spec(name)?;
        let declared = match (spec.shape(), spec.has_nullable_elements()) {
            (FieldShape::List, true) => NestedRead::NullableList,
            (FieldShape::List, false) => NestedRead::List,
            _ => NestedRead::Single,
        };
        match spec.nested() {
            Some(nested) if nested.is::<T>() && declared == read => Ok(()),
            _ => Err(ItemError::Internal(format!(
                "field {name:?} of {} is declared as {} but read as {read}",
                self.schema.name(),
                spec.declared(),
            ))),
        }
    }

    fn take(&mut self, name: &str) -> Result<Value> {
        let decl = self.schema.field(name).ok_or_else(|| {
            ItemError::Internal(format!(
                "{} reads undeclared field {name:?}",
                self.schema.name()
            ))
        })?;
        match self.values.remove(name) {
            Some(value) => Ok(value),
            None => decl.default().value().ok_or_else(|| ItemError::MissingField {
                item: self.schema.name(),
                field: name.to_string(),
            }),
        }
    }

    fn finish(self) -> Result<()> {
        match self.values.keys().next() {
            Some(name) => Err(ItemError::Internal(format!(
                "{} never read declared field {name:?}",
                self.schema.name()
            ))),
            None => Ok(()),
        }
    }
}

/// Convert a raw value into a field's Rust type
pub fn decode_field<T: DeserializeOwned>(item: &'static str, field: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| ItemError::InvalidFieldValue {
        item,
        field: field.to_string(),
        source,
    })
}

/// Convert a raw value into a list-of-items field
pub fn decode_nested_list<T: Item>(item: &'static str, field: &str, value: Value) -> Result<Option<Vec<T>>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(elements) => elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                T::from_value(element)?.ok_or_else(|| ItemError::NullListElement {
                    item,
                    field: field.to_string(),
                    index,
                })
            })
            .collect::<Result<Vec<T>>>()
            .map(Some),
        other => Err(ItemError::ExpectedList {
            item,
            field: field.to_string(),
            found: type_name(&other),
        }),
    }
}

/// Convert a raw value into a list-of-items field whose elements may be null
pub fn decode_nullable_list<T: Item>(
    item: &'static str,
    field: &str,
    value: Value,
) -> Result<Option<Vec<Option<T>>>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(elements) => T::from_list(Some(elements)).map(Some),
        other => Err(ItemError::ExpectedList {
            item,
            field: field.to_string(),
            found: type_name(&other),
        }),
    }
}

/// Encode a field for dict access
///
/// Field types are plain data; anything JSON cannot represent (a NaN
/// float) encodes as null.
pub fn encode_field<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Encode an optional nested item with [`Item::to_raw_map`]
pub fn encode_raw_item<T: Item>(item: Option<&T>) -> Value {
    item.map_or(Value::Null, |item| Value::Object(item.to_raw_map()))
}

/// Encode a list-of-items field with [`Item::to_raw_map`]
pub fn encode_raw_items<T: Item>(items: Option<&[T]>) -> Value {
    items.map_or(Value::Null, |items| {
        Value::Array(items.iter().map(|item| Value::Object(item.to_raw_map())).collect())
    })
}

/// Encode a list of optional items with [`Item::to_raw_map`]
pub fn encode_raw_nullable_items<T: Item>(items: Option<&[Option<T>]>) -> Value {
    items.map_or(Value::Null, |items| {
        Value::Array(items.iter().map(|item| encode_raw_item(item.as_ref())).collect())
    })
}

/// Error for a field name the item type does not declare
pub fn undeclared_field(item: &'static str, field: &str) -> ItemError {
    ItemError::UndeclaredField {
        owner: item.to_string(),
        field: field.to_string(),
    }
}

/// `Deserialize` support for items, see [`impl_item_serde!`](crate::impl_item_serde)
pub fn deserialize_item<'de, T, D>(deserializer: D) -> std::result::Result<T, D::Error>
where
    T: Item,
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    T::from_value(value)
        .map_err(D::Error::custom)?
        .ok_or_else(|| D::Error::custom(format!("expected {} object, found null", T::schema().name())))
}

/// Implement `Serialize` and `Deserialize` for item types
///
/// Serialization goes through the adapter view, so empty declared fields
/// are skipped and unknown fields are kept. Deserialization goes through
/// [`Item::from_value`].
#[macro_export]
macro_rules! impl_item_serde {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::serde::Serialize for $ty {
                fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
                where
                    S: $crate::serde::Serializer,
                {
                    $crate::adapter::serialize_item(self, serializer)
                }
            }

            impl<'de> $crate::serde::Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
                where
                    D: $crate::serde::Deserializer<'de>,
                {
                    $crate::item::deserialize_item(deserializer)
                }
            }
        )+
    };
}

/// Implement [`Item`] for a struct from one table of its declared fields
///
/// Each entry names the struct field, its key in raw maps and its kind:
///
/// - `required(ty)`, `optional(ty)`, `default(ty, value)`: plain fields
///   declared with the matching [`ItemSchemaBuilder`](crate::field::ItemSchemaBuilder)
///   method and converted with serde
/// - `nested(T)`: `Option<T>` holding an item
/// - `boxed(T)`: `Option<Box<T>>`, for recursive items
/// - `list(T)`: `Option<Vec<T>>`, null elements rejected
/// - `nullable_list(T)`: `Option<Vec<Option<T>>>`
///
/// The struct must also have an `unknown_fields: UnknownFields` field. The
/// schema is named after the struct. `Serialize` and `Deserialize` are
/// implemented through [`impl_item_serde!`](crate::impl_item_serde).
///
/// ```ignore
/// impl_item! {
///     Link {
///         url: "url" => required(FieldType::str()),
///         text: "text" => optional(FieldType::str()),
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_item {
    (@declare $builder:ident, $key:literal, nested($item:ty)) => {
        $builder.optional($key, $crate::field::FieldType::item::<$item>())
    };
    (@declare $builder:ident, $key:literal, boxed($item:ty)) => {
        $builder.optional($key, $crate::field::FieldType::item::<$item>())
    };
    (@declare $builder:ident, $key:literal, list($item:ty)) => {
        $builder.optional(
            $key,
            $crate::field::FieldType::list($crate::field::FieldType::item::<$item>()),
        )
    };
    (@declare $builder:ident, $key:literal, nullable_list($item:ty)) => {
        $builder.optional(
            $key,
            $crate::field::FieldType::list($crate::field::FieldType::optional(
                $crate::field::FieldType::item::<$item>(),
            )),
        )
    };
    (@declare $builder:ident, $key:literal, required($ty:expr)) => {
        $builder.required($key, $ty)
    };
    (@declare $builder:ident, $key:literal, optional($ty:expr)) => {
        $builder.optional($key, $ty)
    };
    (@declare $builder:ident, $key:literal, default($ty:expr, $default:expr)) => {
        $builder.with_default($key, $ty, $default)
    };

    (@read $fields:ident, $key:literal, nested($item:ty)) => {
        $fields.nested::<$item>($key)?
    };
    (@read $fields:ident, $key:literal, boxed($item:ty)) => {
        $fields.nested::<$item>($key)?.map(::std::boxed::Box::new)
    };
    (@read $fields:ident, $key:literal, list($item:ty)) => {
        $fields.nested_list::<$item>($key)?
    };
    (@read $fields:ident, $key:literal, nullable_list($item:ty)) => {
        $fields.nested_list_with_nulls::<$item>($key)?
    };
    (@read $fields:ident, $key:literal, $kind:ident ($($args:tt)*)) => {
        $fields.value($key)?
    };

    (@raw $value:expr, nested($item:ty)) => {
        $crate::item::encode_raw_item::<$item>($value.as_ref())
    };
    (@raw $value:expr, boxed($item:ty)) => {
        $crate::item::encode_raw_item::<$item>($value.as_deref())
    };
    (@raw $value:expr, list($item:ty)) => {
        $crate::item::encode_raw_items::<$item>($value.as_deref())
    };
    (@raw $value:expr, nullable_list($item:ty)) => {
        $crate::item::encode_raw_nullable_items::<$item>($value.as_deref())
    };
    (@raw $value:expr, $kind:ident ($($args:tt)*)) => {
        $crate::item::encode_field(&$value)
    };

    (@decode $owner:ident, $name:ident, $value:ident, nested($item:ty)) => {
        <$item as $crate::item::Item>::from_value($value)?
    };
    (@decode $owner:ident, $name:ident, $value:ident, boxed($item:ty)) => {
        <$item as $crate::item::Item>::from_value($value)?.map(::std::boxed::Box::new)
    };
    (@decode $owner:ident, $name:ident, $value:ident, list($item:ty)) => {
        $crate::item::decode_nested_list::<$item>($owner, $name, $value)?
    };
    (@decode $owner:ident, $name:ident, $value:ident, nullable_list($item:ty)) => {
        $crate::item::decode_nullable_list::<$item>($owner, $name, $value)?
    };
    (@decode $owner:ident, $name:ident, $value:ident, $kind:ident ($($args:tt)*)) => {
        $crate::item::decode_field($owner, $name, $value)?
    };

    ($ty:ident { $( $field:ident : $key:literal => $kind:ident ( $($args:tt)* ) ),+ $(,)? }) => {
        impl $crate::item::Item for $ty {
            fn schema() -> &'static $crate::field::ItemSchema {
                static SCHEMA: ::std::sync::OnceLock<$crate::field::ItemSchema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let builder = $crate::field::ItemSchema::builder(stringify!($ty));
                    $( let builder = $crate::impl_item!(@declare builder, $key, $kind($($args)*)); )+
                    builder.build()
                })
            }

            fn from_fields(
                fields: &mut $crate::item::FieldReader<'_>,
            ) -> $crate::error::Result<Self> {
                Ok(Self {
                    $( $field: $crate::impl_item!(@read fields, $key, $kind($($args)*)), )+
                    unknown_fields: $crate::item::UnknownFields::new(),
                })
            }

            fn field_value(&self, name: &str) -> Option<$crate::serde_json::Value> {
                match name {
                    $( $key => Some($crate::item::encode_field(&self.$field)), )+
                    _ => None,
                }
            }

            fn raw_field_value(&self, name: &str) -> Option<$crate::serde_json::Value> {
                match name {
                    $( $key => Some($crate::impl_item!(@raw self.$field, $kind($($args)*))), )+
                    _ => None,
                }
            }

            fn set_field_value(
                &mut self,
                name: &str,
                value: $crate::serde_json::Value,
            ) -> $crate::error::Result<()> {
                let owner = <Self as $crate::item::Item>::schema().name();
                match name {
                    $( $key => self.$field = $crate::impl_item!(@decode owner, name, value, $kind($($args)*)), )+
                    _ => return Err($crate::item::undeclared_field(owner, name)),
                }
                Ok(())
            }

            fn unknown_fields(&self) -> &$crate::item::UnknownFields {
                &self.unknown_fields
            }

            fn unknown_fields_mut(&mut self) -> &mut $crate::item::UnknownFields {
                &mut self.unknown_fields
            }
        }

        $crate::impl_item_serde!($ty);
    };
}
