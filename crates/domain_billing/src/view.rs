//! Read models served to tenants and owners
//!
//! These are assembled by the billing service from a bill plus the
//! owner and tenant it belongs to. They never feed back into the
//! aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::BillId;
use crate::bill::{Bill, BillStatus};
use crate::payment::PaymentRecord;

/// Public owner details shown on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub name: String,
    pub mobile: String,
}

/// Public tenant details shown on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub name: String,
    pub mobile: Option<String>,
    pub unit_rate: Decimal,
}

/// A bill with its parties and, while unpaid, a UPI payment link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillView {
    #[serde(flatten)]
    pub bill: Bill,
    pub owner: Option<OwnerSummary>,
    pub tenant: Option<TenantSummary>,
    pub upi_link: Option<String>,
}

/// Payment state of a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusView {
    pub bill_id: BillId,
    pub amount: Decimal,
    pub status: BillStatus,
    pub payment: PaymentRecord,
}

impl From<&Bill> for PaymentStatusView {
    fn from(bill: &Bill) -> Self {
        Self {
            bill_id: bill.id,
            amount: bill.amount,
            status: bill.status,
            payment: bill.payment.clone(),
        }
    }
}

/// Details the checkout widget needs to open a gateway payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub order_id: String,
    /// Minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub bill_id: BillId,
    pub tenant: Option<String>,
    pub description: String,
}

/// A rendered, downloadable statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
