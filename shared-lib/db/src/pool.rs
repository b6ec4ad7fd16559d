//! MySQL pool setup for the user store.

use std::time::Duration;

use error::DatabaseError;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use crate::config::DbConfig;

pub type DbPool = MySqlPool;

fn pool_options(config: &DbConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(config.connect_timeout())
}

/// Open a pool and make sure the server answers before handing it out.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, DatabaseError> {
    tracing::info!(?config, "Connecting user database");

    let pool = pool_options(config)
        .connect(&config.connection_url())
        .await
        .map_err(|e| {
            tracing::error!("User database unreachable: {}", e);
            DatabaseError::ConnectionFailed(e.to_string())
        })?;

    health_check(&pool, config.connect_timeout()).await?;
    tracing::info!(size = pool.size(), "User database ready");
    Ok(pool)
}

/// Round-trip a trivial query, bounded by `timeout`.
pub async fn health_check(pool: &DbPool, timeout: Duration) -> Result<(), DatabaseError> {
    tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool))
        .await
        .map_err(|_| DatabaseError::Timeout(timeout))?
        .map(|_| ())
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_follow_config() {
        let config = DbConfig::default()
            .with_max_connections(4)
            .with_connect_timeout(2);
        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 4);
        assert!(options.get_min_connections() <= 4);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(2));
    }
}
