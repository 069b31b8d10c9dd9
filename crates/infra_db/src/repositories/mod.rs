//! Repository implementations
//!
//! Repositories own the SQL and work in database rows. The adapters in
//! [`crate::adapters`] map those rows to domain types and implement the
//! domain ports on top of them.

pub mod party;
pub mod billing;

pub use party::{OwnerRepository, OwnerRow, TenantRepository, TenantRow};
pub use billing::{BillRepository, BillRow};
