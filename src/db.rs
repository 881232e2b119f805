use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::ImportConfig;

/// Open the pool imports run against.
pub async fn connect(database_url: &str, config: &ImportConfig) -> Result<PgPool, sqlx::Error> {
    log::debug!(
        "connecting to database (max_connections={}, acquire_timeout={:?})",
        config.max_connections,
        config.acquire_timeout
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await
}
