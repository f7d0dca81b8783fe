//! Wire-level entities and the argument shapes of the repository operations

pub mod board;
pub mod card;
pub mod list;
pub mod patch;
pub mod session;
pub mod user;

// Re-export for convenience
pub use board::{Board, NewBoard, UpdateBoard};
pub use card::{Card, NewCard, UpdateCard};
pub use list::{List, NewList, UpdateList};
pub use patch::Patch;
pub use session::UserSession;
pub use user::{LoginCredentials, NewUser, User};
