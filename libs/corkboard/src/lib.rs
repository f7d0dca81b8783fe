//! Persistence and consistency layer for Corkboard task boards
//!
//! Users own boards, boards hold lists, and lists hold cards. This crate maps
//! those entities onto a [`docstore::DocumentStore`], keeps human readable
//! slugs unique under concurrent writes, deletes boards and lists together
//! with their children, and scopes every operation to the principal of a
//! per-request [`Session`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use corkboard::{Client, models::NewBoard};
//! use docstore::MemoryStore;
//!
//! # async fn example(token: String) -> corkboard::Result<()> {
//! let client = Client::new(Arc::new(MemoryStore::new()));
//! client.ensure_indexes().await?;
//!
//! let session = client.connect(Some(token));
//! let board = session
//!     .boards()
//!     .create(NewBoard {
//!         name: "Release plan".to_string(),
//!         settings: None,
//!     })
//!     .await?;
//! assert_eq!(board.slug, "release-plan");
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod cascade;
pub mod client;
pub mod error;
pub mod models;
pub mod repositories;
pub mod session;
pub mod slug;

pub use cascade::CascadeState;
pub use client::Client;
pub use error::{Error, Result};
pub use session::Session;
