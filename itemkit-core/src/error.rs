//! Error types for item coercion, access and casting

use thiserror::Error;

/// Broad class of an [`ItemError`].
///
/// Every failure is a structural or schema mismatch; none of them succeed on
/// retry without changing the input or the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input value (or a field declaration) cannot be interpreted
    Value,
    /// Construction failed: missing, unexpected or undeletable fields
    Type,
    /// A key or field name is not known to the item
    Key,
    /// An item implementation broke one of its own invariants
    Internal,
}

/// itemkit error types
#[derive(Debug, Error)]
pub enum ItemError {
    /// A field is annotated with a union of more than one non-null type.
    #[error(
        "Field {field:?} of {item} is a union of several non-null types ({}), which cannot be coerced",
        alternatives.join(", ")
    )]
    AmbiguousUnion {
        /// Item type name
        item: &'static str,
        /// Field name
        field: String,
        /// Non-null alternatives of the union
        alternatives: Vec<String>,
    },
    /// A required field was not supplied.
    #[error("{item} is missing required field {field:?}")]
    MissingField {
        /// Item type name
        item: &'static str,
        /// Field name
        field: String,
    },
    /// Direct construction received a keyword the item does not declare.
    #[error("{item} got an unexpected keyword argument {field:?}")]
    UnexpectedField {
        /// Item type name
        item: &'static str,
        /// Offending keyword
        field: String,
    },
    /// A declared field cannot be reset to absent.
    #[error("Field {field:?} of {item} cannot be deleted")]
    FieldNotDeletable {
        /// Item type name
        item: &'static str,
        /// Field name
        field: String,
    },
    /// Key is neither a declared field nor an unknown field.
    #[error("Unknown key {key:?}")]
    UnknownKey {
        /// The missing key
        key: String,
    },
    /// Field name is not declared by the queried type.
    #[error("{owner} does not declare field {field:?}")]
    UndeclaredField {
        /// Type that was queried
        owner: String,
        /// Field name
        field: String,
    },
    /// A field value could not be converted into the declared Rust type.
    #[error("Invalid value for field {field:?} of {item}: {source}")]
    InvalidFieldValue {
        /// Item type name
        item: &'static str,
        /// Field name
        field: String,
        /// Conversion failure
        #[source]
        source: serde_json::Error,
    },
    /// A nested item position held something other than an object or null.
    #[error("Expected an object or null for {item}, found {found}")]
    ExpectedObject {
        /// Item type name
        item: &'static str,
        /// JSON type found instead
        found: &'static str,
    },
    /// A list-shaped field held something other than an array or null.
    #[error("Expected a list or null for field {field:?} of {item}, found {found}")]
    ExpectedList {
        /// Item type name
        item: &'static str,
        /// Field name
        field: String,
        /// JSON type found instead
        found: &'static str,
    },
    /// A list declared without nullable elements contained null.
    #[error("Field {field:?} of {item} contains null at index {index}")]
    NullListElement {
        /// Item type name
        item: &'static str,
        /// Field name
        field: String,
        /// Position of the null element
        index: usize,
    },
    /// Nested items went deeper than the configured limit.
    #[error("Nesting depth limit exceeded while coercing {item} (max: {max_depth})")]
    DepthLimitExceeded {
        /// Item type name
        item: &'static str,
        /// Configured maximum depth
        max_depth: usize,
    },
    /// Limits configuration is outside the hard caps.
    #[error("Invalid limits: {0}")]
    InvalidLimits(String),
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ItemError {
    /// Class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ItemError::AmbiguousUnion { .. }
            | ItemError::InvalidFieldValue { .. }
            | ItemError::ExpectedObject { .. }
            | ItemError::ExpectedList { .. }
            | ItemError::NullListElement { .. }
            | ItemError::DepthLimitExceeded { .. }
            | ItemError::InvalidLimits(_) => ErrorKind::Value,
            ItemError::MissingField { .. }
            | ItemError::UnexpectedField { .. }
            | ItemError::FieldNotDeletable { .. } => ErrorKind::Type,
            ItemError::UnknownKey { .. } | ItemError::UndeclaredField { .. } => ErrorKind::Key,
            ItemError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ItemError>;
