//! Repositories mapping entities onto document collections
//!
//! Every repository is a short-lived view borrowed from a
//! [`Session`](crate::Session). Board, list, and card operations are scoped to
//! the authenticated principal: documents owned by someone else behave as if
//! they did not exist.

use docstore::{Document, StoreError, StoreResult};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

pub mod board;
pub mod card;
pub mod list;
pub mod user;
pub mod user_session;

pub use board::BoardRepository;
pub use card::CardRepository;
pub use list::ListRepository;
pub use user::UserRepository;
pub use user_session::UserSessionRepository;

pub(crate) const BOARDS: &str = "boards";
pub(crate) const LISTS: &str = "lists";
pub(crate) const CARDS: &str = "cards";
pub(crate) const USERS: &str = "users";
pub(crate) const USER_SESSIONS: &str = "user_sessions";

/// Serialize a typed document or patch into a store document
pub(crate) fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, serialized {}",
            other
        ))),
    }
}

/// Deserialize a store document into its typed form
pub(crate) fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Parse a client supplied id; malformed ids identify nothing
pub(crate) fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}
