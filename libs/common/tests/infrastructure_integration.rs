//! Integration tests for the infrastructure components
//!
//! These tests need a reachable PostgreSQL instance (`DATABASE_URL`) and are
//! ignored by default. Run them with `cargo test -- --ignored`.

use common::database::{DatabaseConfig, health_check, init_pool};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_database_connectivity() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    // JSONB support is required by the document collections
    let row = sqlx::query(r#"SELECT '{"a": 1}'::jsonb @> '{"a": 1}'::jsonb AS contained"#)
        .fetch_one(&pool)
        .await?;

    let contained: bool = row.get("contained");
    assert!(contained, "PostgreSQL JSONB containment test failed");

    Ok(())
}
