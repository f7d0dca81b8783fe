//! Per-request session
//!
//! A [`Session`] bundles the repositories with a lazily resolved principal.
//! The principal is looked up at most once per session and is never
//! refreshed; sessions are meant to live for a single request.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use docstore::DocumentStore;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Error, Result,
    models::{User, UserSession},
    repositories::{
        BoardRepository, CardRepository, ListRepository, UserRepository, UserSessionRepository,
    },
};

/// Request-scoped handle to the repositories
pub struct Session {
    store: Arc<dyn DocumentStore>,
    now: DateTime<Utc>,
    session_ttl: Duration,
    token: Option<String>,
    principal: OnceCell<User>,
}

impl Session {
    pub(crate) fn new(
        store: Arc<dyn DocumentStore>,
        now: DateTime<Utc>,
        session_ttl: Duration,
        token: Option<String>,
    ) -> Self {
        Self {
            store,
            now,
            session_ttl,
            token,
            principal: OnceCell::new(),
        }
    }

    /// Board repository bound to this session
    pub fn boards(&self) -> BoardRepository<'_> {
        BoardRepository::new(self)
    }

    /// List repository bound to this session
    pub fn lists(&self) -> ListRepository<'_> {
        ListRepository::new(self)
    }

    /// Card repository bound to this session
    pub fn cards(&self) -> CardRepository<'_> {
        CardRepository::new(self)
    }

    /// User repository bound to this session
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self)
    }

    /// Login session repository bound to this session
    pub fn user_sessions(&self) -> UserSessionRepository<'_> {
        UserSessionRepository::new(self)
    }

    /// The token this session was opened with
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Time at which this session was opened
    ///
    /// Every timestamp written through the session uses this instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub(crate) fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Resolve the principal behind the session token
    ///
    /// A missing, unknown, or expired token, or one whose user no longer
    /// exists, fails with [`Error::NotAuthenticated`]. The first successful
    /// result is cached for the rest of the session.
    pub async fn authenticate(&self) -> Result<&User> {
        self.principal
            .get_or_try_init(|| async {
                let Some(token) = self.token.as_deref() else {
                    return Err(Error::NotAuthenticated);
                };

                let login = match self.user_sessions().get(token).await {
                    Ok(login) => login,
                    Err(Error::SessionNotFound) => return Err(Error::NotAuthenticated),
                    Err(err) => return Err(err),
                };

                match self.users().get(login.user_id).await {
                    Ok(user) => Ok(user),
                    Err(Error::UserNotFound) => Err(Error::NotAuthenticated),
                    Err(err) => Err(err),
                }
            })
            .await
    }

    /// Id of the authenticated principal
    pub(crate) async fn principal_id(&self) -> Result<Uuid> {
        self.authenticate().await.map(|user| user.id)
    }

    /// Check credentials and open a new login session
    pub async fn login(&self, login_or_email: &str, password: &str) -> Result<UserSession> {
        let user = self
            .users()
            .verify_credentials(login_or_email, password)
            .await?;
        let login = self.user_sessions().create(user.id).await?;

        info!("User {} logged in", user.login);
        Ok(login)
    }

    /// End the login session behind the session token
    pub async fn logout(&self) -> Result<()> {
        let token = self.token.as_deref().ok_or(Error::NotAuthenticated)?;

        if self.user_sessions().delete(token).await? {
            info!("Login session ended");
        }
        Ok(())
    }

    /// Release the session
    ///
    /// A session owns no connection of its own. Closing it releases its
    /// handle on the shared store (an `Arc`, so the process-wide pool stays
    /// open) and discards the cached principal. Dropping the session has the
    /// same effect; this only makes the end of the request explicit.
    pub fn close(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(
            "Closing session (authenticated: {})",
            self.principal.initialized()
        );
    }
}
