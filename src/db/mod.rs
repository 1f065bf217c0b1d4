// src/db/mod.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::lifecycle::LifecycleError;

pub mod orders;

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    info!(max_connections = config.db_max_connections, "connected to PostgreSQL");
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("migrations applied");
    Ok(())
}

/// Failures of the order-lifecycle persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Rule(#[from] LifecycleError),

    #[error("order '{0}' kept changing, giving up after retries")]
    Contended(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}
