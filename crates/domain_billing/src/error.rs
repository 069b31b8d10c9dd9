//! Billing domain errors
//!
//! Every error maps onto one `ErrorKind`, which the HTTP layer turns into
//! a status code. Validation and conflict errors are raised before any
//! write happens.

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{BillingMonth, MonthError, PortError};

/// Error classification used for propagation and HTTP mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input
    Validation,
    /// Duplicate month or already paid
    Conflict,
    /// Caller does not own the bill
    Unauthorized,
    /// Missing bill or tenant
    NotFound,
    /// Payment or webhook signature did not verify
    SignatureInvalid,
    /// Storage, statement or gateway collaborator failed
    ExternalService,
    /// Persistence or other unexpected failure
    Internal,
}

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid month: {0}")]
    InvalidMonth(#[from] MonthError),

    /// Month precedes the owner's latest bill
    #[error("Month {month} must be after the latest billed month {latest}")]
    BackdatedMonth {
        month: BillingMonth,
        latest: BillingMonth,
    },

    #[error("Current reading cannot be less than previous reading ({current} < {previous})")]
    InvalidReading {
        previous: Decimal,
        current: Decimal,
    },

    #[error("Photo is mandatory")]
    MissingProof,

    #[error("Tenant setup required")]
    SetupRequired,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bill for {0} already exists")]
    DuplicateMonth(BillingMonth),

    #[error("Bill is already paid")]
    AlreadyPaid,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Bill not found: {0}")]
    BillNotFound(String),

    #[error("Payment verification failed")]
    SignatureInvalid,

    #[error("Photo storage failed: {0}")]
    Storage(#[source] PortError),

    #[error("Statement rendering failed: {0}")]
    Statement(#[source] PortError),

    #[error("Payment gateway error: {0}")]
    Gateway(#[source] PortError),

    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl BillingError {
    /// Creates a BillNotFound error from any ID type
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        BillingError::BillNotFound(id.to_string())
    }

    /// Creates an InvalidInput error
    pub fn invalid(message: impl Into<String>) -> Self {
        BillingError::InvalidInput(message.into())
    }

    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::InvalidMonth(_)
            | BillingError::BackdatedMonth { .. }
            | BillingError::InvalidReading { .. }
            | BillingError::MissingProof
            | BillingError::SetupRequired
            | BillingError::InvalidInput(_)
            | BillingError::Calculation(_) => ErrorKind::Validation,
            BillingError::DuplicateMonth(_) | BillingError::AlreadyPaid => ErrorKind::Conflict,
            BillingError::Unauthorized => ErrorKind::Unauthorized,
            BillingError::BillNotFound(_) => ErrorKind::NotFound,
            BillingError::SignatureInvalid => ErrorKind::SignatureInvalid,
            BillingError::Storage(_) | BillingError::Statement(_) | BillingError::Gateway(_) => {
                ErrorKind::ExternalService
            }
            BillingError::Port(_) => ErrorKind::Internal,
        }
    }
}
