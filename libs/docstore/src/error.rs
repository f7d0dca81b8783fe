//! Error types reported by the document store bindings

use thiserror::Error;

/// Error type shared by every document store binding
///
/// Each binding translates its native failures into this type. Uniqueness
/// violations always surface as [`StoreError::Conflict`] so callers can stay
/// binding-agnostic.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("unique index {index} violated")]
    Conflict {
        /// Name of the violated index
        index: String,
        /// Document fields covered by the index
        fields: Vec<String>,
    },

    /// The backing store failed or could not be reached
    #[error("document store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A document could not be converted to or from JSON
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored or submitted document has an unexpected shape
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A collection, field, or index name cannot be used in a query
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl StoreError {
    /// Returns true for any uniqueness violation
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Returns true when the violated index covers `field`
    pub fn is_conflict_on(&self, field: &str) -> bool {
        match self {
            StoreError::Conflict { fields, .. } => fields.iter().any(|f| f == field),
            _ => false,
        }
    }
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
