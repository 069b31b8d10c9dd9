//! Party domain errors
//!
//! This module defines all error types that can occur in the party domain,
//! including validation errors, not found errors and uniqueness conflicts.

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the party domain
#[derive(Debug, Error)]
pub enum PartyError {
    /// Owner account was not found
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    /// The owner has not set up a tenant yet
    #[error("Tenant not found")]
    TenantNotFound,

    /// A tenant is already configured for this owner
    #[error("Tenant already exists")]
    TenantExists,

    /// Email or mobile is already registered
    #[error("{0} already registered")]
    DuplicateAccount(String),

    /// Login failed; deliberately does not say which part was wrong
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email verification token is unknown or expired
    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    /// Invalid data provided
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Request validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Storage port failure
    #[error(transparent)]
    Port(#[from] PortError),
}

impl PartyError {
    /// Creates an OwnerNotFound error from any ID type
    pub fn owner_not_found(id: impl std::fmt::Display) -> Self {
        PartyError::OwnerNotFound(id.to_string())
    }

    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        PartyError::InvalidData(message.into())
    }

    /// Creates a ValidationFailed error from validation errors
    pub fn validation_failed(errors: Vec<String>) -> Self {
        PartyError::ValidationFailed(errors.join("; "))
    }

    /// Returns true for errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PartyError::Port(_))
    }
}
