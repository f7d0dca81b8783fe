//! Process-wide entry point to the board store

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use docstore::{DocumentStore, IndexSpec};
use tracing::info;

use crate::{
    Result,
    repositories::{BOARDS, CARDS, LISTS, USER_SESSIONS, USERS},
    session::Session,
};

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Default lifetime of a login session
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Shared handle to the document store
///
/// Cloning is cheap. Open one [`Session`] per request with
/// [`Client::connect`].
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn DocumentStore>,
    clock: Clock,
    session_ttl: Duration,
}

impl Client {
    /// Create a client over a document store binding
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: Arc::new(Utc::now),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    /// Replace the clock used to stamp documents and check expiry
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Set the lifetime of login sessions created through this client
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// The underlying document store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Create every collection index the repositories rely on
    ///
    /// Call once at startup. Slug uniqueness depends on these indexes.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let indexes = [
            (BOARDS, IndexSpec::unique(&["ownerId", "slug"])),
            (BOARDS, IndexSpec::lookup(&["ownerId"])),
            (LISTS, IndexSpec::unique(&["boardId", "slug"])),
            (LISTS, IndexSpec::lookup(&["ownerId", "boardId"])),
            (CARDS, IndexSpec::unique(&["boardId", "slug"])),
            (CARDS, IndexSpec::lookup(&["ownerId", "listId"])),
            (CARDS, IndexSpec::lookup(&["ownerId", "boardId"])),
            (USERS, IndexSpec::unique(&["login"])),
            (USERS, IndexSpec::unique(&["email"])),
            (USER_SESSIONS, IndexSpec::lookup(&["userId"])),
            (USER_SESSIONS, IndexSpec::lookup(&["expiresAt"])),
        ];

        for (collection, index) in &indexes {
            self.store.ensure_index(collection, index).await?;
        }

        info!("Ensured {} indexes", indexes.len());
        Ok(())
    }

    /// Open a session for one request
    ///
    /// `token` is the opaque login session id presented by the caller, if
    /// any. It is only resolved when an operation needs the principal.
    pub fn connect(&self, token: Option<String>) -> Session {
        Session::new(
            Arc::clone(&self.store),
            (self.clock)(),
            self.session_ttl,
            token,
        )
    }
}
