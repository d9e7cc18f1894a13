use anyhow::{Context, Result};
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type PostgresPool = Pool<Postgres>;

pub async fn create_postgres_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PostgresPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tracing::info!(max_connections, "Connected to PostgreSQL database");
    Ok(pool)
}

/// Pool that connects on first use; lets the service start while the
/// database is still coming up.
pub fn create_lazy_postgres_pool(database_url: &str, max_connections: u32) -> Result<PostgresPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy(database_url)
        .context("Invalid PostgreSQL connection URL")
}

pub async fn health_check(pool: &PostgresPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await?;
    Ok(())
}
