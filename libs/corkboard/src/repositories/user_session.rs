//! Login session repository

use docstore::Filter;
use rand::{Rng, distributions::Alphanumeric};
use tracing::info;
use uuid::Uuid;

use super::{USER_SESSIONS, from_document, to_document};
use crate::{Error, Result, models::UserSession, session::Session};

/// Length of generated session tokens
const TOKEN_LENGTH: usize = 48;

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Login sessions
pub struct UserSessionRepository<'a> {
    session: &'a Session,
}

impl<'a> UserSessionRepository<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Open a login session for a user
    pub async fn create(&self, user_id: Uuid) -> Result<UserSession> {
        let now = self.session.now();
        let login = UserSession {
            id: generate_token(),
            user_id,
            expires_at: now + self.session.session_ttl(),
            updated_at: now,
        };

        self.session
            .store()
            .insert(USER_SESSIONS, to_document(&login)?)
            .await?;

        info!("Created login session for user {}", user_id);
        Ok(login)
    }

    /// Get a login session by token
    ///
    /// Expired sessions are reported as [`Error::SessionNotFound`] even
    /// before they are purged.
    pub async fn get(&self, token: &str) -> Result<UserSession> {
        let doc = self
            .session
            .store()
            .find_one(USER_SESSIONS, &Filter::by_id(token))
            .await?
            .ok_or(Error::SessionNotFound)?;
        let login: UserSession = from_document(doc)?;

        if login.is_expired(self.session.now()) {
            return Err(Error::SessionNotFound);
        }

        Ok(login)
    }

    /// Delete a login session, returning whether it existed
    pub async fn delete(&self, token: &str) -> Result<bool> {
        Ok(self
            .session
            .store()
            .delete_one(USER_SESSIONS, &Filter::by_id(token))
            .await?)
    }

    /// Delete every login session that expired before now
    pub async fn purge_expired(&self) -> Result<u64> {
        let filter = Filter::new().before("expiresAt", self.session.now());
        let purged = self
            .session
            .store()
            .delete_many(USER_SESSIONS, &filter)
            .await?;

        if purged > 0 {
            info!("Purged {} expired login sessions", purged);
        }
        Ok(purged)
    }
}
