//! Document store abstraction for the Corkboard workspace
//!
//! Collections hold JSON objects keyed by a string `id` field. Bindings must
//! enforce declared unique indexes and report violations as
//! [`StoreError::Conflict`], return documents in insertion order, and apply
//! each single-document write atomically.
//!
//! Two bindings are provided: [`PgDocumentStore`] (JSONB rows in PostgreSQL)
//! and [`MemoryStore`] (in-process, used by tests and local development).

use async_trait::async_trait;

pub mod error;
pub mod filter;
pub mod index;
pub mod memory;
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use filter::{Clause, Filter, family_suffix};
pub use index::IndexSpec;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// A stored document: a JSON object with at least a string `id` field
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Operations every document store binding provides
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the collection if it does not exist yet
    async fn ensure_collection(&self, collection: &str) -> StoreResult<()>;

    /// Create an index if it does not exist yet
    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()>;

    /// Insert a new document
    ///
    /// Fails with [`StoreError::Conflict`] when the id or any unique index
    /// value is already taken.
    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()>;

    /// Fetch the first matching document
    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Fetch every matching document, in insertion order
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Merge `patch` into the first matching document
    ///
    /// Top-level keys of `patch` replace the stored ones. Returns the updated
    /// document, or `None` when nothing matched.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> StoreResult<Option<Document>>;

    /// Remove the first matching document, returning whether one was removed
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool>;

    /// Remove every matching document, returning how many were removed
    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;
}

/// Extract the `id` field of a document
pub fn document_id(doc: &Document) -> StoreResult<&str> {
    doc.get("id")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| StoreError::InvalidDocument("document has no string id".to_string()))
}
