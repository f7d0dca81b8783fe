//! In-process document store
//!
//! Collections are kept in insertion order behind a single lock. Every
//! operation completes while holding the lock, which gives the same
//! per-document atomicity the PostgreSQL binding relies on.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    Document, DocumentStore, Filter, IndexSpec, StoreError, StoreResult, document_id,
};

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl Collection {
    /// Check `candidate` against the primary key and every unique index,
    /// ignoring the document at `skip`.
    fn check_unique(
        &self,
        collection: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> StoreResult<()> {
        let id = document_id(candidate)?;
        let others = self
            .docs
            .iter()
            .enumerate()
            .filter(|(pos, _)| Some(*pos) != skip)
            .map(|(_, doc)| doc);

        for other in others {
            if other.get("id").and_then(Value::as_str) == Some(id) {
                return Err(StoreError::Conflict {
                    index: format!("{}_pkey", collection),
                    fields: vec!["id".to_string()],
                });
            }

            for index in self.indexes.iter().filter(|index| index.unique) {
                let Some(key) = index_key(index, candidate) else {
                    continue;
                };

                if index_key(index, other).as_ref() == Some(&key) {
                    return Err(StoreError::Conflict {
                        index: index.name(collection),
                        fields: index.fields.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Values of the indexed fields, or `None` when any of them is missing
fn index_key<'a>(index: &IndexSpec, doc: &'a Document) -> Option<Vec<&'a Value>> {
    index
        .fields
        .iter()
        .map(|field| doc.get(field).filter(|value| !value.is_null()))
        .collect()
}

/// Document store living in process memory
///
/// Cloning is cheap and every clone shares the same collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let col = collections.entry(collection.to_string()).or_default();

        if !col.indexes.contains(index) {
            debug!("Creating index {}", index.name(collection));
            col.indexes.push(index.clone());
        }

        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let col = collections.entry(collection.to_string()).or_default();

        col.check_unique(collection, &doc, None)?;
        col.docs.push(doc);

        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .and_then(|col| col.docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|col| {
                col.docs
                    .iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(col) = collections.get_mut(collection) else {
            return Ok(None);
        };

        let Some(pos) = col.docs.iter().position(|doc| filter.matches(doc)) else {
            return Ok(None);
        };

        let mut updated = col.docs[pos].clone();
        for (key, value) in patch {
            if key != "id" {
                updated.insert(key, value);
            }
        }

        col.check_unique(collection, &updated, Some(pos))?;
        col.docs[pos] = updated.clone();

        Ok(Some(updated))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(col) = collections.get_mut(collection) else {
            return Ok(false);
        };

        match col.docs.iter().position(|doc| filter.matches(doc)) {
            Some(pos) => {
                col.docs.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(col) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = col.docs.len();
        col.docs.retain(|doc| !filter.matches(doc));

        Ok((before - col.docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test documents must be objects"),
        }
    }

    async fn store_with_slug_index() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .ensure_index("boards", &IndexSpec::unique(&["ownerId", "slug"]))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_and_find_in_insertion_order() {
        let store = MemoryStore::new();

        for i in 0..5 {
            store
                .insert("boards", doc(json!({"id": format!("b{}", i), "n": i})))
                .await
                .unwrap();
        }

        let docs = store.find("boards", &Filter::new()).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b0", "b1", "b2", "b3", "b4"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert("users", doc(json!({"id": "a"}))).await.unwrap();

        let err = store
            .insert("users", doc(json!({"id": "a"})))
            .await
            .unwrap_err();
        assert!(err.is_conflict_on("id"));
    }

    #[tokio::test]
    async fn test_unique_index_is_scoped_by_all_fields() {
        let store = store_with_slug_index().await;

        store
            .insert("boards", doc(json!({"id": "1", "ownerId": "u1", "slug": "a"})))
            .await
            .unwrap();
        store
            .insert("boards", doc(json!({"id": "2", "ownerId": "u2", "slug": "a"})))
            .await
            .unwrap();

        let err = store
            .insert("boards", doc(json!({"id": "3", "ownerId": "u1", "slug": "a"})))
            .await
            .unwrap_err();

        assert!(err.is_conflict_on("slug"));
        match err {
            StoreError::Conflict { index, .. } => assert_eq!(index, "ux_boards__ownerId__slug"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unique_index_is_sparse() {
        let store = store_with_slug_index().await;

        store
            .insert("boards", doc(json!({"id": "1", "ownerId": "u1"})))
            .await
            .unwrap();
        store
            .insert("boards", doc(json!({"id": "2", "ownerId": "u1"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_merges_and_checks_uniqueness() {
        let store = store_with_slug_index().await;

        store
            .insert("boards", doc(json!({"id": "1", "ownerId": "u1", "slug": "a"})))
            .await
            .unwrap();
        store
            .insert("boards", doc(json!({"id": "2", "ownerId": "u1", "slug": "b"})))
            .await
            .unwrap();

        // Writing a document's own slug back is not a conflict
        let same = store
            .update_one("boards", &Filter::by_id("2"), doc(json!({"slug": "b"})))
            .await
            .unwrap();
        assert!(same.is_some());

        let err = store
            .update_one("boards", &Filter::by_id("2"), doc(json!({"slug": "a"})))
            .await
            .unwrap_err();
        assert!(err.is_conflict_on("slug"));

        let updated = store
            .update_one(
                "boards",
                &Filter::by_id("2"),
                doc(json!({"slug": "c", "name": "C"})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["slug"], "c");
        assert_eq!(updated["name"], "C");
        assert_eq!(updated["ownerId"], "u1");
    }

    #[tokio::test]
    async fn test_update_missing_document_returns_none() {
        let store = MemoryStore::new();

        let result = store
            .update_one("boards", &Filter::by_id("nope"), doc(json!({"name": "x"})))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let store = MemoryStore::new();

        for i in 0..6 {
            store
                .insert(
                    "cards",
                    doc(json!({"id": i.to_string(), "listId": format!("l{}", i % 2)})),
                )
                .await
                .unwrap();
        }

        assert!(store.delete_one("cards", &Filter::by_id("0")).await.unwrap());
        assert!(!store.delete_one("cards", &Filter::by_id("0")).await.unwrap());

        let removed = store
            .delete_many("cards", &Filter::new().eq("listId", "l1"))
            .await
            .unwrap();
        assert_eq!(removed, 3);

        let left = store.find("cards", &Filter::new()).await.unwrap();
        assert_eq!(left.len(), 2);
    }

    #[tokio::test]
    async fn test_slug_family_filter() {
        let store = MemoryStore::new();

        for (id, slug) in [("1", "todo"), ("2", "todo-1"), ("3", "todo-list"), ("4", "todo-7")] {
            store
                .insert("lists", doc(json!({"id": id, "slug": slug})))
                .await
                .unwrap();
        }

        let family = store
            .find("lists", &Filter::new().slug_family("slug", "todo", "-"))
            .await
            .unwrap();
        let slugs: Vec<_> = family.iter().map(|d| d["slug"].as_str().unwrap()).collect();
        assert_eq!(slugs, vec!["todo", "todo-1", "todo-7"]);
    }
}
