//! Core Kernel - Foundational types shared by every MeterProof crate
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with exact decimal arithmetic
//! - Billing months (`YYYY-MM`) with chronological ordering
//! - Strongly-typed identifiers
//! - Port abstractions for the hexagonal architecture

pub mod money;
pub mod month;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use month::{BillingMonth, MonthError};
pub use identifiers::{OwnerId, TenantId, BillId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
};
