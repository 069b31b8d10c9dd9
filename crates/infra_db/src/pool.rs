//! Connection pool and schema migrations
//!
//! Pool sizing comes from the API configuration; the schema ships with
//! the crate and is applied at start-up.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use crate::error::DatabaseError;

pub type DatabasePool = PgPool;

/// Pool settings for the MeterProof database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Connections kept open while idle; capped at `max_connections`
    pub min_connections: u32,
    /// How long a request waits for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    /// Settings for `url` with a small pool sized for a single API node
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }

    fn effective_min(&self) -> u32 {
        self.min_connections.min(self.max_connections)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.effective_min())
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }
}

/// Opens the connection pool
///
/// # Errors
///
/// `DatabaseError::ConnectionFailed` when the database is unreachable or
/// `max_connections` is zero
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    if config.max_connections == 0 {
        return Err(DatabaseError::ConnectionFailed("max_connections must be positive".to_string()));
    }
    if config.min_connections > config.max_connections {
        warn!(
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "min_connections above max_connections; capping"
        );
    }
    info!(
        max_connections = config.max_connections,
        acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
        "Opening bill database pool"
    );

    config
        .pool_options()
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

/// Applies the embedded schema migrations
///
/// Migrations are idempotent; already-applied versions are skipped.
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_connections_capped_at_max() {
        let config = DatabaseConfig {
            min_connections: 8,
            max_connections: 3,
            ..DatabaseConfig::new("postgres://localhost/meterproof")
        };
        assert_eq!(config.effective_min(), 3);

        let options = config.pool_options();
        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_min_connections(), 3);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));
    }
}
