//! Service settings
//!
//! Read from `CORKBOARD__*` environment variables on top of built-in
//! defaults, e.g. `CORKBOARD__PORT=8080` or `CORKBOARD__STORE=memory`.
//! Database settings are read separately through
//! [`common::database::DatabaseConfig`].

use anyhow::Result;
use chrono::Duration;
use ::config::{Config, Environment};
use serde::Deserialize;

/// Document store binding used by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSONB collections in PostgreSQL
    Postgres,
    /// In-process store; data is lost on restart
    Memory,
}

/// Settings of the API service
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    /// Lifetime of login sessions in hours
    pub session_ttl_hours: i64,
    /// Cron expression for the expired session sweep
    pub sweep_schedule: String,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl Settings {
    /// Load settings from the environment
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3001)?
            .set_default("store", "postgres")?
            .set_default("session_ttl_hours", 24)?
            .set_default("sweep_schedule", "0 */15 * * * *")?
            .set_default("secure_cookies", false)?
            .add_source(
                Environment::with_prefix("CORKBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Address the HTTP listener binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}
