//! Error types for the board domain

use docstore::StoreError;
use thiserror::Error;

/// Errors reported by sessions and repositories
#[derive(Error, Debug)]
pub enum Error {
    #[error("board not found")]
    BoardNotFound,

    #[error("list not found")]
    ListNotFound,

    #[error("card not found")]
    CardNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("session not found")]
    SessionNotFound,

    /// The session has no valid principal
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("email address is already registered")]
    EmailConflict,

    /// A unique index other than a slug index rejected the write
    #[error("conflict on {0}")]
    Conflict(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Store(StoreError),
}

impl Error {
    /// True for every `*NotFound` variant
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::BoardNotFound
                | Error::ListNotFound
                | Error::CardNotFound
                | Error::UserNotFound
                | Error::SessionNotFound
        )
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { index, .. } => Error::Conflict(index),
            other => Error::Store(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Store(StoreError::Serialization(err))
    }
}

/// Type alias for Result with the domain error
pub type Result<T> = std::result::Result<T, Error>;
