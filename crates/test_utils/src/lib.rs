//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! MeterProof test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for test data construction
//! - `harness`: `BillingService` wired to in-memory ports
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use assertions::*;
pub use generators::*;
