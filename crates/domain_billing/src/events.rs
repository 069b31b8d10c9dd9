//! Domain events for the bill aggregate
//!
//! Events are emitted after a change has been committed to the bill
//! store. They drive notification delivery, which happens outside the
//! request that caused the change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillId, OwnerId};

/// How a bill came to be paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    /// Owner confirmed a manual UPI payment
    OwnerConfirm,
    /// Checkout callback with a verified signature
    GatewayVerify,
    /// Gateway webhook with a verified signature
    GatewayWebhook,
}

/// Domain events emitted by the Bill aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillEvent {
    /// A bill was created and should be sent to the tenant
    BillCreated {
        bill_id: BillId,
        owner_id: OwnerId,
        timestamp: DateTime<Utc>,
    },

    /// A bill moved to PAID
    PaymentConfirmed {
        bill_id: BillId,
        owner_id: OwnerId,
        channel: PaymentChannel,
        timestamp: DateTime<Utc>,
    },
}

impl BillEvent {
    /// Returns the bill ID associated with this event
    pub fn bill_id(&self) -> BillId {
        match self {
            BillEvent::BillCreated { bill_id, .. } => *bill_id,
            BillEvent::PaymentConfirmed { bill_id, .. } => *bill_id,
        }
    }

    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            BillEvent::BillCreated { .. } => "BillCreated",
            BillEvent::PaymentConfirmed { .. } => "PaymentConfirmed",
        }
    }
}
