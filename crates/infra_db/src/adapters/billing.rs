//! PostgreSQL adapter for the bill store port

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    BillId, BillingMonth, DomainPort, HealthCheckResult, HealthCheckable, OwnerId, PortError, TenantId,
};
use domain_billing::{
    Bill, BillStatus, BillStore, GatewayPayment, ManualPayment, PaymentRecord, PaymentStatus,
};

use super::ping;
use crate::error::DatabaseError;
use crate::repositories::{BillRepository, BillRow};

/// PostgreSQL-backed bill store
///
/// Duplicate `(owner_id, month)` inserts are rejected by the
/// `bills_owner_month_key` constraint and reported as
/// `PortError::Conflict`.
#[derive(Debug, Clone)]
pub struct PostgresBillStore {
    repository: BillRepository,
    pool: PgPool,
}

impl PostgresBillStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresBillStore {}

#[async_trait]
impl HealthCheckable for PostgresBillStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-bill-store").await
    }
}

#[async_trait]
impl BillStore for PostgresBillStore {
    #[instrument(skip(self, bill), fields(bill_id = %bill.id, month = %bill.month))]
    async fn insert(&self, bill: &Bill) -> Result<(), PortError> {
        debug!("Inserting bill");
        Ok(self.repository.insert(&bill_to_row(bill)).await?)
    }

    async fn get(&self, id: BillId) -> Result<Option<Bill>, PortError> {
        optional(self.repository.get_by_id(*id.as_uuid()).await?)
    }

    async fn find_by_owner_month(
        &self,
        owner_id: OwnerId,
        month: BillingMonth,
    ) -> Result<Option<Bill>, PortError> {
        optional(
            self.repository
                .find_by_owner_month(*owner_id.as_uuid(), &month.to_string())
                .await?,
        )
    }

    async fn latest_for_owner(&self, owner_id: OwnerId) -> Result<Option<Bill>, PortError> {
        optional(self.repository.latest_for_owner(*owner_id.as_uuid()).await?)
    }

    async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Bill>, PortError> {
        let rows = self.repository.list_for_owner(*owner_id.as_uuid()).await?;
        let bills = rows
            .into_iter()
            .map(row_to_bill)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bills)
    }

    async fn find_by_gateway_order(&self, order_id: &str) -> Result<Option<Bill>, PortError> {
        optional(self.repository.find_by_gateway_order(order_id).await?)
    }

    #[instrument(skip(self, bill), fields(bill_id = %bill.id, status = %bill.status))]
    async fn save(&self, bill: &Bill) -> Result<(), PortError> {
        Ok(self.repository.update_payment(&bill_to_row(bill)).await?)
    }

    #[instrument(skip(self, bill), fields(bill_id = %bill.id, status = %bill.status))]
    async fn save_unless_paid(&self, bill: &Bill) -> Result<bool, PortError> {
        let written = self.repository.update_payment_if_unpaid(&bill_to_row(bill)).await?;
        if !written {
            debug!("Stored bill already PAID; update skipped");
        }
        Ok(written)
    }

    async fn mark_notified(&self, id: BillId, at: DateTime<Utc>) -> Result<(), PortError> {
        Ok(self.repository.mark_notified(*id.as_uuid(), at).await?)
    }
}

fn optional(row: Option<BillRow>) -> Result<Option<Bill>, PortError> {
    Ok(row.map(row_to_bill).transpose()?)
}

// ============================================================================
// Row mapping
// ============================================================================

fn bill_to_row(bill: &Bill) -> BillRow {
    let gateway = bill.payment.gateway.as_ref();
    BillRow {
        bill_id: *bill.id.as_uuid(),
        owner_id: *bill.owner_id.as_uuid(),
        tenant_id: *bill.tenant_id.as_uuid(),
        month: bill.month.to_string(),
        previous_reading: bill.previous_reading,
        current_reading: bill.current_reading,
        units: bill.units,
        unit_rate: bill.unit_rate,
        amount: bill.amount,
        previous_photo_url: bill.previous_photo_url.clone(),
        current_photo_url: bill.current_photo_url.clone(),
        status: bill.status.as_str().to_string(),
        payment_status: bill.payment.status.as_str().to_string(),
        upi_id: bill.payment.manual.upi_id.clone(),
        tenant_confirmed_at: bill.payment.manual.tenant_confirmed_at,
        owner_confirmed_at: bill.payment.manual.owner_confirmed_at,
        reference_id: bill.payment.manual.reference_id.clone(),
        gateway_order_id: gateway.map(|g| g.order_id.clone()),
        gateway_payment_id: gateway.and_then(|g| g.payment_id.clone()),
        gateway_signature: gateway.and_then(|g| g.signature.clone()),
        gateway_method: gateway.and_then(|g| g.method.clone()),
        paid_at: bill.payment.paid_at,
        revision_of: bill.revision_of.map(|id| *id.as_uuid()),
        sms_sent: bill.sms_sent,
        sms_sent_at: bill.sms_sent_at,
        created_at: bill.created_at,
    }
}

fn row_to_bill(row: BillRow) -> Result<Bill, DatabaseError> {
    let month: BillingMonth = row
        .month
        .parse()
        .map_err(|_| DatabaseError::corrupt("bills.month", &row.month))?;
    let status: BillStatus = row
        .status
        .parse()
        .map_err(|_| DatabaseError::corrupt("bills.status", &row.status))?;
    let payment_status: PaymentStatus = row
        .payment_status
        .parse()
        .map_err(|_| DatabaseError::corrupt("bills.payment_status", &row.payment_status))?;

    // A gateway payment id without an order id can only come from a
    // webhook that settled a bill before the order was recorded.
    let gateway = match (row.gateway_order_id, row.gateway_payment_id) {
        (None, None) => None,
        (order_id, payment_id) => Some(GatewayPayment {
            order_id: order_id.unwrap_or_default(),
            payment_id,
            signature: row.gateway_signature,
            method: row.gateway_method,
        }),
    };

    Ok(Bill {
        id: BillId::from(row.bill_id),
        owner_id: OwnerId::from(row.owner_id),
        tenant_id: TenantId::from(row.tenant_id),
        month,
        previous_reading: row.previous_reading,
        current_reading: row.current_reading,
        units: row.units,
        unit_rate: row.unit_rate,
        amount: row.amount,
        previous_photo_url: row.previous_photo_url,
        current_photo_url: row.current_photo_url,
        status,
        payment: PaymentRecord {
            status: payment_status,
            manual: ManualPayment {
                upi_id: row.upi_id,
                tenant_confirmed_at: row.tenant_confirmed_at,
                owner_confirmed_at: row.owner_confirmed_at,
                reference_id: row.reference_id,
            },
            gateway,
            paid_at: row.paid_at,
        },
        revision_of: row.revision_of.map(BillId::from),
        sms_sent: row.sms_sent,
        sms_sent_at: row.sms_sent_at,
        created_at: row.created_at,
    })
}
