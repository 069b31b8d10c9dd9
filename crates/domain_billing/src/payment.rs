//! Payment sub-record
//!
//! Each bill carries one payment record. The two ways a bill can be paid
//! are kept apart: `ManualPayment` holds the UPI path (tenant claims,
//! owner confirms) and `GatewayPayment` holds the hosted-checkout path.
//! A single `PaymentStatus` summarizes both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing confirmed yet
    #[default]
    Pending,
    /// Tenant says they paid; waiting for the owner
    TenantConfirmed,
    /// Settled by the owner or the gateway
    Paid,
    /// Gateway reported a failed attempt
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::TenantConfirmed => "TENANT_CONFIRMED",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "TENANT_CONFIRMED" => Ok(PaymentStatus::TenantConfirmed),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Manual UPI payment path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPayment {
    /// Owner's UPI id at the time the bill was created
    pub upi_id: Option<String>,
    pub tenant_confirmed_at: Option<DateTime<Utc>>,
    pub owner_confirmed_at: Option<DateTime<Utc>>,
    /// Bank or UPI reference supplied by the owner
    pub reference_id: Option<String>,
}

/// Hosted gateway payment path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub order_id: String,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
    /// Instrument reported by the gateway (upi, card, netbanking, ...)
    pub method: Option<String>,
}

impl GatewayPayment {
    /// Creates the record for a freshly created order
    pub fn for_order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            payment_id: None,
            signature: None,
            method: None,
        }
    }
}

/// A bill's payment sub-record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub status: PaymentStatus,
    pub manual: ManualPayment,
    pub gateway: Option<GatewayPayment>,
    /// Set when the gateway settles the bill
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Initial record for a new bill
    pub fn pending(upi_id: Option<String>) -> Self {
        Self {
            status: PaymentStatus::Pending,
            manual: ManualPayment {
                upi_id: upi_id.filter(|id| !id.trim().is_empty()),
                ..Default::default()
            },
            gateway: None,
            paid_at: None,
        }
    }

    /// Order id of the current gateway attempt, if any
    pub fn order_id(&self) -> Option<&str> {
        self.gateway.as_ref().map(|g| g.order_id.as_str())
    }
}
