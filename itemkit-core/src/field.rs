//! Field declarations and item schemas
//!
//! An [`ItemSchema`] is the closed, ordered set of fields an item type
//! declares. Each field carries a [`FieldType`] annotation, which the
//! resolver in [`crate::spec`] classifies, and a [`FieldDefault`] used by
//! construction and casting.

use crate::item::Item;
use crate::value::values_match;
use ahash::AHashMap;
use serde_json::Value;
use std::any::TypeId;
use std::fmt;

/// Primitive field types, passed through coercion unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// String value
    Str,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// Boolean value
    Bool,
    /// Arbitrary JSON value
    Any,
}

impl Primitive {
    fn as_str(self) -> &'static str {
        match self {
            Primitive::Str => "str",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Bool => "bool",
            Primitive::Any => "any",
        }
    }
}

/// Reference to an item type used as a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    name: &'static str,
    type_id: TypeId,
}

impl ItemRef {
    /// Reference the item type `T`
    pub fn of<T: Item>() -> Self {
        // Only the type name is read here: schemas may reference their own
        // type, so T::schema() must not be touched while it is being built.
        let full = std::any::type_name::<T>();
        Self {
            name: full.rsplit("::").next().unwrap_or(full),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Short type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type identity
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Whether this reference points at `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Declared type annotation of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// The null type
    Null,
    /// A primitive type
    Primitive(Primitive),
    /// A nested item type
    Item(ItemRef),
    /// Homogeneous list
    List(Box<FieldType>),
    /// Union of alternatives
    Union(Vec<FieldType>),
}

impl FieldType {
    /// `str`
    pub fn str() -> Self {
        FieldType::Primitive(Primitive::Str)
    }

    /// `int`
    pub fn int() -> Self {
        FieldType::Primitive(Primitive::Int)
    }

    /// `float`
    pub fn float() -> Self {
        FieldType::Primitive(Primitive::Float)
    }

    /// `bool`
    pub fn boolean() -> Self {
        FieldType::Primitive(Primitive::Bool)
    }

    /// Arbitrary JSON
    pub fn any() -> Self {
        FieldType::Primitive(Primitive::Any)
    }

    /// Nested item type `T`
    pub fn item<T: Item>() -> Self {
        FieldType::Item(ItemRef::of::<T>())
    }

    /// `List[inner]`
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    /// `Optional[inner]`, i.e. `Union[inner, None]`
    pub fn optional(inner: FieldType) -> Self {
        match inner {
            FieldType::Null => FieldType::Null,
            FieldType::Union(mut alternatives) => {
                if !alternatives.iter().any(FieldType::is_null) {
                    alternatives.push(FieldType::Null);
                }
                FieldType::Union(alternatives)
            }
            other => FieldType::Union(vec![other, FieldType::Null]),
        }
    }

    /// Union of the given alternatives
    pub fn union<I: IntoIterator<Item = FieldType>>(alternatives: I) -> Self {
        FieldType::Union(alternatives.into_iter().collect())
    }

    /// Whether this is the null type
    pub fn is_null(&self) -> bool {
        matches!(self, FieldType::Null)
    }

    /// Whether null is a valid value of this type
    pub fn accepts_null(&self) -> bool {
        match self {
            FieldType::Null | FieldType::Primitive(Primitive::Any) => true,
            FieldType::Union(alternatives) => alternatives.iter().any(FieldType::accepts_null),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Null => f.write_str("None"),
            FieldType::Primitive(primitive) => f.write_str(primitive.as_str()),
            FieldType::Item(item) => f.write_str(item.name()),
            FieldType::List(inner) => write!(f, "List[{inner}]"),
            FieldType::Union(alternatives) => {
                let non_null: Vec<&FieldType> =
                    alternatives.iter().filter(|alt| !alt.is_null()).collect();
                if non_null.len() == 1 && non_null.len() < alternatives.len() {
                    return write!(f, "Optional[{}]", non_null[0]);
                }
                f.write_str("Union[")?;
                for (idx, alt) in alternatives.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alt}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Default of a declared field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// No default, the field must be supplied
    Required,
    /// Absent unless supplied
    Null,
    /// Explicit default value
    Value(Value),
}

impl FieldDefault {
    /// Value used when the field is not supplied
    pub fn value(&self) -> Option<Value> {
        match self {
            FieldDefault::Required => None,
            FieldDefault::Null => Some(Value::Null),
            FieldDefault::Value(value) => Some(value.clone()),
        }
    }

    /// Whether `value` is what the field holds when left alone
    ///
    /// Required fields have no default, so only null counts. Numbers are
    /// compared by value, so `1` matches a default of `1.0`.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldDefault::Required | FieldDefault::Null => value.is_null(),
            FieldDefault::Value(default) => values_match(default, value),
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    name: &'static str,
    ty: FieldType,
    default: FieldDefault,
}

impl FieldDecl {
    /// Create a field declaration
    pub fn new(name: &'static str, ty: FieldType, default: FieldDefault) -> Self {
        Self { name, ty, default }
    }

    /// Field name, as it appears in dicts
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type annotation
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// Declared default
    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    /// Whether the field has no default
    pub fn is_required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }
}

/// Declared fields of an item type
#[derive(Debug, Clone)]
pub struct ItemSchema {
    name: &'static str,
    fields: Vec<FieldDecl>,
    index: AHashMap<&'static str, usize>,
}

impl ItemSchema {
    /// Start building a schema for the item type called `name`
    pub fn builder(name: &'static str) -> ItemSchemaBuilder {
        ItemSchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    /// Item type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Look up a declared field
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.index.get(name).map(|&idx| &self.fields[idx])
    }

    /// Whether `name` is a declared field
    pub fn declares(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared field names, in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(FieldDecl::name)
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`ItemSchema`]
#[derive(Debug)]
pub struct ItemSchemaBuilder {
    name: &'static str,
    fields: Vec<FieldDecl>,
}

impl ItemSchemaBuilder {
    /// Declare a field without default
    pub fn required(self, name: &'static str, ty: FieldType) -> Self {
        self.field(FieldDecl::new(name, ty, FieldDefault::Required))
    }

    /// Declare an `Optional[ty]` field defaulting to null
    pub fn optional(self, name: &'static str, ty: FieldType) -> Self {
        self.field(FieldDecl::new(
            name,
            FieldType::optional(ty),
            FieldDefault::Null,
        ))
    }

    /// Declare a field with an explicit default value
    pub fn with_default(self, name: &'static str, ty: FieldType, default: Value) -> Self {
        self.field(FieldDecl::new(name, ty, FieldDefault::Value(default)))
    }

    /// Declare a field; redeclaring a name replaces the earlier declaration
    pub fn field(mut self, decl: FieldDecl) -> Self {
        match self.fields.iter().position(|f| f.name == decl.name) {
            Some(idx) => self.fields[idx] = decl,
            None => self.fields.push(decl),
        }
        self
    }

    /// Finish the schema
    pub fn build(self) -> ItemSchema {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(idx, decl)| (decl.name, idx))
            .collect();
        ItemSchema {
            name: self.name,
            fields: self.fields,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_does_not_nest() {
        let once = FieldType::optional(FieldType::str());
        let twice = FieldType::optional(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.to_string(), "Optional[str]");
    }

    #[test]
    fn test_accepts_null() {
        assert!(FieldType::optional(FieldType::item::<crate::test_items::Link>()).accepts_null());
        assert!(FieldType::any().accepts_null());
        assert!(!FieldType::str().accepts_null());
        assert!(!FieldType::list(FieldType::optional(FieldType::str())).accepts_null());
    }

    #[test]
    fn test_field_type_display() {
        let ty = FieldType::union([FieldType::str(), FieldType::int(), FieldType::Null]);
        assert_eq!(ty.to_string(), "Union[str, int, None]");
        assert_eq!(FieldType::list(FieldType::float()).to_string(), "List[float]");
    }

    #[test]
    fn test_schema_builder_preserves_order() {
        let schema = ItemSchema::builder("Request")
            .required("url", FieldType::str())
            .with_default("method", FieldType::str(), json!("GET"))
            .optional("body", FieldType::str())
            .build();

        assert_eq!(schema.name(), "Request");
        assert_eq!(
            schema.field_names().collect::<Vec<_>>(),
            vec!["url", "method", "body"]
        );
        assert!(schema.field("url").map(FieldDecl::is_required).unwrap_or(false));
        assert_eq!(
            schema.field("method").and_then(|f| f.default().value()),
            Some(json!("GET"))
        );
        assert!(!schema.declares("headers"));
    }

    #[test]
    fn test_redeclared_field_replaces_earlier() {
        let schema = ItemSchema::builder("Thing")
            .optional("name", FieldType::str())
            .required("id", FieldType::int())
            .required("name", FieldType::str())
            .build();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].name(), "name");
        assert!(schema.fields()[0].is_required());
    }

    #[test]
    fn test_default_matching() {
        assert!(FieldDefault::Null.matches(&Value::Null));
        assert!(!FieldDefault::Null.matches(&json!("q")));
        assert!(FieldDefault::Value(json!(1.0)).matches(&json!(1.0)));
        assert!(!FieldDefault::Value(json!(1.0)).matches(&json!(0.5)));
        assert!(FieldDefault::Value(json!(1.0)).matches(&json!(1)));
        assert!(!FieldDefault::Required.matches(&json!("x")));
    }
}
