//! Party Domain
//!
//! This crate manages the two parties of a sub-billing arrangement:
//!
//! - **Owner**: the account holder who records meter readings and
//!   receives payments. Owners authenticate and may publish a UPI id.
//! - **Tenant**: the occupant being billed. Exactly one tenant exists per
//!   owner; the tenant's unit rate is copied onto each bill at creation.
//!
//! Tenants have no account of their own. They reach their bills through
//! public links sent by SMS.

pub mod owner;
pub mod tenant;
pub mod error;
pub mod validation;
pub mod ports;
pub mod services;

pub use owner::{Owner, OwnerProfile, RegisterOwner};
pub use tenant::{Tenant, Language, SetupTenant, UpdateTenant};
pub use error::PartyError;
pub use ports::{OwnerStore, TenantStore, PasswordHasher};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockOwnerStore, MockTenantStore, PlainTextHasher};
pub use services::{AccountService, Registration, TenancyService};
