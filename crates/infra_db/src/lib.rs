//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for MeterProof using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories own the SQL and
//! work in rows; adapters implement the domain storage ports on top of
//! them. Queries are checked at runtime, so building the crate does not
//! need a live database.
//!
//! # Schema
//!
//! Three tables: `owners`, `tenants` (one per owner) and `bills`
//! (unique per owner and month). Migrations are embedded and applied by
//! [`run_migrations`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBillStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/meterproof")).await?;
//! run_migrations(&pool).await?;
//! let bills = PostgresBillStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{PostgresBillStore, PostgresOwnerStore, PostgresTenantStore};
