//! Bill aggregate
//!
//! A bill is one month's charge for an owner's tenant: the reading pair,
//! the unit rate frozen at creation, the exact amount, the photo proofs and
//! the payment sub-record. Every status change goes through a method on
//! this type so the payment state machine lives in one place.
//!
//! # State machine
//!
//! ```text
//!              tenant_confirm            owner toggle/confirm
//!   PENDING ──────────────────► TENANT_CONFIRMED ───────────► PAID
//!      │  ▲                                                    ▲ │
//!      │  └──────────────── owner toggle (unmark) ─────────────┼─┘
//!      │                                                       │
//!      ├──── owner toggle/confirm, gateway verify/webhook ─────┘
//!      │
//!      └──── gateway payment.failed ────► FAILED
//! ```
//!
//! PAID is absorbing for the tenant and gateway paths; only the owner
//! toggle leaves it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BillId, BillingMonth, Money, OwnerId, TenantId};

use crate::error::BillingError;
use crate::payment::{GatewayPayment, PaymentRecord, PaymentStatus};
use crate::reading::Consumption;

/// Owner-facing bill status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    #[default]
    Unpaid,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Unpaid => "UNPAID",
            BillStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(BillStatus::Unpaid),
            "PAID" => Ok(BillStatus::Paid),
            other => Err(format!("unknown bill status: {other}")),
        }
    }
}

/// Result of applying a gateway settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The bill moved to PAID
    Applied,
    /// The bill was already PAID; nothing changed
    AlreadyPaid,
}

/// Everything needed to construct a bill
#[derive(Debug, Clone)]
pub struct NewBill {
    pub owner_id: OwnerId,
    pub tenant_id: TenantId,
    pub month: BillingMonth,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub consumption: Consumption,
    pub unit_rate: Decimal,
    pub previous_photo_url: Option<String>,
    pub current_photo_url: String,
    pub upi_id: Option<String>,
    pub revision_of: Option<BillId>,
}

/// One month's electricity bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub owner_id: OwnerId,
    pub tenant_id: TenantId,
    pub month: BillingMonth,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub units: Decimal,
    /// Copied from the tenant at creation; never changes afterwards
    pub unit_rate: Decimal,
    /// Exact `units * unit_rate`
    pub amount: Decimal,
    pub previous_photo_url: Option<String>,
    pub current_photo_url: String,
    pub status: BillStatus,
    pub payment: PaymentRecord,
    pub revision_of: Option<BillId>,
    pub sms_sent: bool,
    pub sms_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Creates an unpaid bill with a pending payment record
    pub fn new(new: NewBill, now: DateTime<Utc>) -> Self {
        Self {
            id: BillId::new_v7(),
            owner_id: new.owner_id,
            tenant_id: new.tenant_id,
            month: new.month,
            previous_reading: new.previous_reading,
            current_reading: new.current_reading,
            units: new.consumption.units,
            unit_rate: new.unit_rate,
            amount: new.consumption.amount,
            previous_photo_url: new.previous_photo_url,
            current_photo_url: new.current_photo_url,
            status: BillStatus::Unpaid,
            payment: PaymentRecord::pending(new.upi_id),
            revision_of: new.revision_of,
            sms_sent: false,
            sms_sent_at: None,
            created_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == BillStatus::Paid
    }

    /// The amount as money in the local currency
    pub fn amount_money(&self) -> Money {
        Money::inr(self.amount)
    }

    /// Fails with `Unauthorized` unless `owner_id` owns this bill
    pub fn ensure_owned_by(&self, owner_id: OwnerId) -> Result<(), BillingError> {
        if self.owner_id != owner_id {
            return Err(BillingError::Unauthorized);
        }
        Ok(())
    }

    /// Tenant reports having paid
    ///
    /// Only flags the bill for owner review; the bill stays UNPAID.
    /// Confirming again overwrites the timestamp.
    pub fn tenant_confirm(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        if self.is_paid() {
            return Err(BillingError::AlreadyPaid);
        }
        self.payment.status = PaymentStatus::TenantConfirmed;
        self.payment.manual.tenant_confirmed_at = Some(now);
        Ok(())
    }

    /// Flips UNPAID and PAID
    ///
    /// Marking paid records the owner's confirmation time. Unmarking
    /// resets the payment record to PENDING and clears that time.
    pub fn toggle_status(&mut self, now: DateTime<Utc>) -> BillStatus {
        match self.status {
            BillStatus::Unpaid => {
                self.status = BillStatus::Paid;
                self.payment.status = PaymentStatus::Paid;
                self.payment.manual.owner_confirmed_at = Some(now);
            }
            BillStatus::Paid => {
                self.status = BillStatus::Unpaid;
                self.payment.status = PaymentStatus::Pending;
                self.payment.manual.owner_confirmed_at = None;
            }
        }
        self.status
    }

    /// Owner confirms receipt of a manual payment
    ///
    /// # Returns
    ///
    /// `true` if the bill moved to PAID. On an already paid bill only a
    /// newly supplied reference id is recorded and `false` is returned.
    pub fn owner_confirm(&mut self, reference_id: Option<String>, now: DateTime<Utc>) -> bool {
        let reference_id = reference_id.filter(|r| !r.trim().is_empty());
        if reference_id.is_some() {
            self.payment.manual.reference_id = reference_id;
        }

        if self.is_paid() {
            return false;
        }
        self.status = BillStatus::Paid;
        self.payment.status = PaymentStatus::Paid;
        self.payment.manual.owner_confirmed_at = Some(now);
        true
    }

    /// Records a new gateway order for this bill
    ///
    /// A new order starts a new attempt, so a FAILED record goes back to
    /// PENDING.
    pub fn attach_gateway_order(&mut self, order_id: impl Into<String>) -> Result<(), BillingError> {
        if self.is_paid() {
            return Err(BillingError::AlreadyPaid);
        }
        self.payment.gateway = Some(GatewayPayment::for_order(order_id));
        if self.payment.status == PaymentStatus::Failed {
            self.payment.status = PaymentStatus::Pending;
        }
        Ok(())
    }

    /// Settles the bill from a verified gateway payment
    ///
    /// PAID is absorbing: when the bill is already paid nothing changes,
    /// so a verify call and a webhook for the same payment can arrive in
    /// either order.
    pub fn settle_via_gateway(
        &mut self,
        payment_id: &str,
        signature: Option<&str>,
        method: Option<&str>,
        now: DateTime<Utc>,
    ) -> Settlement {
        if self.is_paid() {
            return Settlement::AlreadyPaid;
        }

        let gateway = self
            .payment
            .gateway
            .get_or_insert_with(|| GatewayPayment::for_order(String::new()));
        gateway.payment_id = Some(payment_id.to_string());
        if let Some(signature) = signature {
            gateway.signature = Some(signature.to_string());
        }
        if let Some(method) = method {
            gateway.method = Some(method.to_string());
        }

        self.status = BillStatus::Paid;
        self.payment.status = PaymentStatus::Paid;
        self.payment.paid_at = Some(now);
        Settlement::Applied
    }

    /// Records a failed gateway attempt
    ///
    /// # Returns
    ///
    /// `true` if the record moved from PENDING to FAILED. Any other state,
    /// including PAID, is left alone.
    pub fn fail_via_gateway(&mut self, payment_id: &str) -> bool {
        if self.is_paid() || self.payment.status != PaymentStatus::Pending {
            return false;
        }
        if let Some(gateway) = self.payment.gateway.as_mut() {
            gateway.payment_id = Some(payment_id.to_string());
        }
        self.payment.status = PaymentStatus::Failed;
        true
    }

    /// Marks the tenant notification as sent
    pub fn mark_notified(&mut self, now: DateTime<Utc>) {
        self.sms_sent = true;
        self.sms_sent_at = Some(now);
    }

    /// Human-readable statement number, e.g. `MP-202403-9F2C`
    pub fn statement_number(&self) -> String {
        let id = self.id.as_uuid().simple().to_string();
        let tail = &id[id.len() - 4..];
        format!("MP-{}-{}", self.month.compact(), tail.to_uppercase())
    }

    /// Download file name for a rendered statement
    pub fn statement_file_name(&self, extension: &str) -> String {
        format!("MeterProof_Bill_{}.{}", self.month, extension)
    }
}
