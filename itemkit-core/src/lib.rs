//! itemkit - Extensible, schema-typed data containers
//!
//! This crate provides the machinery shared by every item schema:
//!
//! - Field declarations and per-type schemas
//! - Field spec resolution (scalar, optional and list shapes)
//! - Coercion of raw nested maps into typed items, keeping unknown fields
//! - A dict-like adapter over declared and unknown fields
//! - Casting between related item types with data-loss reporting
//! - Detection of auto output fields for usage telemetry
//! - Error types and coercion limits

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod auto;
pub mod cast;
pub mod error;
pub mod field;
pub mod item;
pub mod limits;
pub mod spec;
pub mod value;

#[cfg(test)]
mod test_items;

// Re-export commonly used types
pub use adapter::{ItemAdapter, ItemView};
pub use auto::{AutoFieldReport, AutoFieldStats, FieldProducer, OutputFields};
pub use cast::{cast, cast_with_report, CastOutcome, CastTarget, DataLossWarning};
pub use error::{ErrorKind, ItemError, Result};
pub use field::{FieldDefault, FieldType, ItemSchema};
pub use item::{DynItem, FieldReader, Item, UnknownFields};
pub use limits::Limits;
pub use spec::{field_specs, FieldShape, FieldSpec};
pub use value::{Float, RawMap};

#[doc(hidden)]
pub use serde;
#[doc(hidden)]
pub use serde_json;
