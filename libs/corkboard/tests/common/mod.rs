//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use corkboard::{
    Client,
    models::{NewUser, User},
};
use docstore::{Document, DocumentStore, Filter, IndexSpec, MemoryStore, StoreError, StoreResult};

/// Client over a fresh memory store with every index in place
pub async fn client() -> Client {
    client_over(Arc::new(MemoryStore::new())).await
}

/// Client over the given store with every index in place
pub async fn client_over(store: Arc<dyn DocumentStore>) -> Client {
    let client = Client::new(store);
    client
        .ensure_indexes()
        .await
        .expect("indexes should be created");
    client
}

/// Register a user and open a login session, returning the user and token
pub async fn sign_up(client: &Client, full_name: &str, email: &str) -> (User, String) {
    let session = client.connect(None);
    let user = session
        .users()
        .register(NewUser {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: "Secret-passw0rd".to_string(),
        })
        .await
        .expect("registration should succeed");
    let login = session
        .user_sessions()
        .create(user.id)
        .await
        .expect("login session should be created");

    (user, login.id)
}

/// Memory store that counts token lookups and can fail bulk deletes
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    inner: MemoryStore,
    session_lookups: AtomicUsize,
    failing_collection: Option<&'static str>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `delete_many` on `collection` fail
    pub fn failing_bulk_delete_on(collection: &'static str) -> Self {
        Self {
            failing_collection: Some(collection),
            ..Self::default()
        }
    }

    /// Number of `find_one` calls against the login session collection
    pub fn session_lookups(&self) -> usize {
        self.session_lookups.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl DocumentStore for InstrumentedStore {
    async fn ensure_collection(&self, collection: &str) -> StoreResult<()> {
        self.inner.ensure_collection(collection).await
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()> {
        self.inner.ensure_index(collection, index).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        self.inner.insert(collection, doc).await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        if collection == "user_sessions" {
            self.session_lookups.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.find_one(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.inner.find(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> StoreResult<Option<Document>> {
        self.inner.update_one(collection, filter, patch).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        if self.failing_collection == Some(collection) {
            return Err(StoreError::InvalidQuery(format!(
                "bulk delete on {} disabled",
                collection
            )));
        }
        self.inner.delete_many(collection, filter).await
    }
}
