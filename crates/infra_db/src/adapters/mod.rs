//! Port Adapters
//!
//! PostgreSQL implementations of the domain storage ports. Each adapter
//! wraps a repository, maps rows to domain types and translates
//! `DatabaseError` into `PortError`.
//!
//! # Available Adapters
//!
//! - `PostgresOwnerStore`: implements `domain_party::OwnerStore`
//! - `PostgresTenantStore`: implements `domain_party::TenantStore`
//! - `PostgresBillStore`: implements `domain_billing::BillStore`

pub mod party;
pub mod billing;

pub use party::{PostgresOwnerStore, PostgresTenantStore};
pub use billing::PostgresBillStore;

use chrono::Utc;
use sqlx::PgPool;

use core_kernel::{AdapterHealth, HealthCheckResult};

/// Runs `SELECT 1` and reports the outcome for `adapter_id`
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(format!("Database error: {}", e)),
            checked_at: Utc::now(),
        },
    }
}
