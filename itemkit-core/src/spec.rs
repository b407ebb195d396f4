//! Field spec resolution
//!
//! Classifies every declared field of an item type into one of three shapes
//! and records the nested item type, if any, that coercion must recurse
//! into:
//!
//! - **Scalar**: `T`
//! - **Optional**: `Optional[T]`, a union with exactly one non-null
//!   alternative
//! - **List**: `List[T]` or `Optional[List[T]]`
//!
//! A union with more than one non-null alternative has no shape. It is
//! recorded as a rejection and surfaces as [`ItemError::AmbiguousUnion`]
//! when coercion touches that field.
//!
//! Resolved specs are cached per item type. Entries are never invalidated:
//! a schema is fixed for the lifetime of the process, so a missing entry is
//! simply recomputed.

use crate::error::{ItemError, Result};
use crate::field::{FieldDecl, FieldType, ItemRef, ItemSchema};
use crate::item::Item;
use ahash::AHashMap;
use std::any::TypeId;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Shape of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A single value
    Scalar,
    /// A single value or null
    Optional,
    /// A homogeneous list, possibly null as a whole
    List,
}

/// Resolved shape of one declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: &'static str,
    declared: FieldType,
    shape: FieldShape,
    element: FieldType,
    nullable: bool,
    nullable_elements: bool,
    nested: Option<ItemRef>,
}

impl FieldSpec {
    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type annotation as declared
    pub fn declared(&self) -> &FieldType {
        &self.declared
    }

    /// Resolved shape
    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// `T` of the shape: the value type, or the list element type
    pub fn element(&self) -> &FieldType {
        &self.element
    }

    /// Whether null is accepted for the field as a whole
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether list elements may be null (always false for non-lists)
    pub fn has_nullable_elements(&self) -> bool {
        self.nullable_elements
    }

    /// Nested item type, when `T` is an item
    pub fn nested(&self) -> Option<&ItemRef> {
        self.nested.as_ref()
    }

    /// Whether coercion recurses into this field
    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }
}

/// Strip null alternatives from a union, returning the single remaining
/// type and whether null was allowed. Fails with the non-null alternatives
/// when there is more than one.
fn strip_optional(ty: &FieldType) -> std::result::Result<(FieldType, bool), Vec<String>> {
    let FieldType::Union(alternatives) = ty else {
        return Ok((ty.clone(), ty.is_null()));
    };

    let non_null: Vec<&FieldType> = alternatives.iter().filter(|alt| !alt.is_null()).collect();
    let nullable = non_null.len() < alternatives.len();
    match non_null.as_slice() {
        [] => Ok((FieldType::Null, true)),
        [single] => {
            let (inner, inner_nullable) = strip_optional(single)?;
            Ok((inner, nullable || inner_nullable))
        }
        many => Err(many.iter().map(|alt| alt.to_string()).collect()),
    }
}

fn nested_ref(ty: &FieldType) -> Option<ItemRef> {
    match ty {
        FieldType::Item(item) => Some(*item),
        _ => None,
    }
}

/// Resolve the spec of one field declared by the item type `item`
pub fn resolve_field(item: &'static str, decl: &FieldDecl) -> Result<FieldSpec> {
    let ambiguous = |alternatives| ItemError::AmbiguousUnion {
        item,
        field: decl.name().to_string(),
        alternatives,
    };

    let (inner, nullable) = strip_optional(decl.ty()).map_err(ambiguous)?;
    let spec = match inner {
        FieldType::List(element) => {
            let (element, nullable_elements) = strip_optional(&element).map_err(ambiguous)?;
            FieldSpec {
                name: decl.name(),
                declared: decl.ty().clone(),
                shape: FieldShape::List,
                nested: nested_ref(&element),
                element,
                nullable,
                nullable_elements,
            }
        }
        element => FieldSpec {
            name: decl.name(),
            declared: decl.ty().clone(),
            shape: if nullable {
                FieldShape::Optional
            } else {
                FieldShape::Scalar
            },
            nested: nested_ref(&element),
            element,
            nullable,
            nullable_elements: false,
        },
    };
    Ok(spec)
}

/// Resolved specs of every field of one item type
#[derive(Debug)]
pub struct TypeSpecs {
    item: &'static str,
    entries: Vec<(&'static str, std::result::Result<FieldSpec, Vec<String>>)>,
    index: AHashMap<&'static str, usize>,
}

impl TypeSpecs {
    /// Resolve all fields of `schema`, without caching
    pub fn resolve(schema: &ItemSchema) -> Self {
        let mut entries = Vec::with_capacity(schema.len());
        let mut index = AHashMap::with_capacity(schema.len());

        for decl in schema.fields() {
            let resolved = match resolve_field(schema.name(), decl) {
                Ok(spec) => Ok(spec),
                Err(ItemError::AmbiguousUnion { alternatives, .. }) => Err(alternatives),
                Err(other) => Err(vec![other.to_string()]),
            };
            index.insert(decl.name(), entries.len());
            entries.push((decl.name(), resolved));
        }

        Self {
            item: schema.name(),
            entries,
            index,
        }
    }

    /// Item type name
    pub fn item_name(&self) -> &'static str {
        self.item
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the item declares no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spec of a declared field
    ///
    /// Fails with [`ItemError::UndeclaredField`] for unknown names and
    /// [`ItemError::AmbiguousUnion`] for fields that have no shape.
    pub fn spec(&self, name: &str) -> Result<&FieldSpec> {
        let idx = self
            .index
            .get(name)
            .ok_or_else(|| ItemError::UndeclaredField {
                owner: self.item.to_string(),
                field: name.to_string(),
            })?;
        let (field, resolved) = &self.entries[*idx];
        resolved
            .as_ref()
            .map_err(|alternatives| ItemError::AmbiguousUnion {
                item: self.item,
                field: field.to_string(),
                alternatives: alternatives.clone(),
            })
    }
}

type SpecCache = RwLock<AHashMap<TypeId, Arc<TypeSpecs>>>;

fn spec_cache() -> &'static SpecCache {
    static CACHE: OnceLock<SpecCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Resolved specs of item type `T`, cached per type
pub fn field_specs<T: Item>() -> Arc<TypeSpecs> {
    let key = TypeId::of::<T>();
    let cached = spec_cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(specs) = cached {
        return specs;
    }

    // Resolve outside the lock; concurrent callers may race here and the
    // first insert wins, which is fine because resolution is deterministic.
    let resolved = Arc::new(TypeSpecs::resolve(T::schema()));
    spec_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert(resolved)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDefault, Primitive};
    use crate::test_items::{Link, Page};

    fn decl(ty: FieldType) -> FieldDecl {
        FieldDecl::new("field", ty, FieldDefault::Null)
    }

    #[test]
    fn test_scalar_primitive() {
        let spec = resolve_field("Thing", &decl(FieldType::str())).unwrap();
        assert_eq!(spec.shape(), FieldShape::Scalar);
        assert_eq!(spec.element(), &FieldType::Primitive(Primitive::Str));
        assert!(!spec.is_nested());
        assert!(!spec.is_nullable());
    }

    #[test]
    fn test_optional_item() {
        let spec = resolve_field(
            "Thing",
            &decl(FieldType::optional(FieldType::item::<Link>())),
        )
        .unwrap();
        assert_eq!(spec.shape(), FieldShape::Optional);
        assert!(spec.is_nullable());
        assert!(spec.nested().map(|n| n.is::<Link>()).unwrap_or(false));
    }

    #[test]
    fn test_optional_list_is_list_shaped() {
        let spec = resolve_field(
            "Thing",
            &decl(FieldType::optional(FieldType::list(FieldType::item::<Link>()))),
        )
        .unwrap();
        assert_eq!(spec.shape(), FieldShape::List);
        assert!(spec.is_nullable());
        assert!(!spec.has_nullable_elements());
        assert_eq!(spec.nested().map(ItemRef::name), Some("Link"));
    }

    #[test]
    fn test_list_of_optional_elements() {
        let spec = resolve_field(
            "Thing",
            &decl(FieldType::list(FieldType::optional(FieldType::item::<Link>()))),
        )
        .unwrap();
        assert_eq!(spec.shape(), FieldShape::List);
        assert!(!spec.is_nullable());
        assert!(spec.has_nullable_elements());
        assert!(spec.is_nested());
    }

    #[test]
    fn test_primitive_list_is_not_nested() {
        let spec = resolve_field("Thing", &decl(FieldType::list(FieldType::str()))).unwrap();
        assert_eq!(spec.shape(), FieldShape::List);
        assert!(!spec.is_nested());
    }

    #[test]
    fn test_union_of_two_items_is_rejected() {
        let ty = FieldType::union([
            FieldType::item::<Link>(),
            FieldType::item::<Page>(),
            FieldType::Null,
        ]);
        let err = resolve_field("Thing", &decl(ty)).unwrap_err();
        match err {
            ItemError::AmbiguousUnion {
                item,
                field,
                alternatives,
            } => {
                assert_eq!(item, "Thing");
                assert_eq!(field, "field");
                assert_eq!(alternatives, vec!["Link".to_string(), "Page".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_union_of_two_primitives_is_rejected() {
        let ty = FieldType::union([FieldType::str(), FieldType::int()]);
        assert!(matches!(
            resolve_field("Thing", &decl(ty)),
            Err(ItemError::AmbiguousUnion { .. })
        ));
    }

    #[test]
    fn test_list_of_union_is_rejected() {
        let ty = FieldType::list(FieldType::union([FieldType::str(), FieldType::int()]));
        assert!(matches!(
            resolve_field("Thing", &decl(ty)),
            Err(ItemError::AmbiguousUnion { .. })
        ));
    }

    #[test]
    fn test_type_specs_keep_rejections_per_field() {
        let schema = ItemSchema::builder("Mixed")
            .required("url", FieldType::str())
            .optional(
                "target",
                FieldType::union([FieldType::item::<Link>(), FieldType::item::<Page>()]),
            )
            .build();
        let specs = TypeSpecs::resolve(&schema);

        assert_eq!(specs.len(), 2);
        assert!(specs.spec("url").is_ok());
        assert!(matches!(
            specs.spec("target"),
            Err(ItemError::AmbiguousUnion { .. })
        ));
        assert!(matches!(
            specs.spec("other"),
            Err(ItemError::UndeclaredField { .. })
        ));
    }

    #[test]
    fn test_field_specs_are_cached_per_type() {
        let first = field_specs::<Page>();
        let second = field_specs::<Page>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.item_name(), "Page");
        assert_eq!(first.len(), 4);
        assert!(first.spec("link").is_ok_and(FieldSpec::is_nested));
        assert!(!first.spec("title").is_ok_and(FieldSpec::is_nested));
    }
}
