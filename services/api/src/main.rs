use std::sync::Arc;

use anyhow::Result;
use common::{
    database::{DatabaseConfig, health_check, init_pool},
    telemetry,
};
use corkboard::Client;
use docstore::{DocumentStore, MemoryStore, PgDocumentStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod config;
mod error;
mod extract;
mod routes;
mod state;
mod sweeper;
mod validation;

use crate::{
    config::{Settings, StoreKind},
    state::AppState,
};

/// Open the configured document store binding
async fn open_store(kind: StoreKind) -> Result<Arc<dyn DocumentStore>> {
    match kind {
        StoreKind::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            // Check database connectivity
            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store, data will be lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init(telemetry::DEFAULT_FILTER)?;

    info!("Starting Corkboard API service");

    let settings = Settings::load()?;
    let store = open_store(settings.store).await?;

    let client = Client::new(store).with_session_ttl(settings.session_ttl());
    client.ensure_indexes().await?;

    // Held for the lifetime of the process
    let _sweeper = sweeper::start(client.clone(), &settings.sweep_schedule).await?;

    let app_state = AppState {
        client,
        cookie_max_age: settings.session_ttl().num_seconds(),
        secure_cookies: settings.secure_cookies,
    };

    info!("API service initialized successfully");

    let app = routes::create_router(app_state);

    let addr = settings.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("API service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
