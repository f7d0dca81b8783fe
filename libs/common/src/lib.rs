//! Common library for the Corkboard workspace
//!
//! This crate provides shared infrastructure used by the storage bindings
//! and the services: PostgreSQL pool configuration, infrastructure errors,
//! and tracing initialisation.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     assert!(health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod telemetry;
