//! Bill repository implementation
//!
//! Bills are stored flat: the payment sub-record is spread over
//! `payment_status`, the manual-path columns and the `gateway_*` columns.
//! The `(owner_id, month)` unique constraint is the authority on
//! duplicate months.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const BILL_COLUMNS: &str = "bill_id, owner_id, tenant_id, month, previous_reading, current_reading, \
     units, unit_rate, amount, previous_photo_url, current_photo_url, status, payment_status, \
     upi_id, tenant_confirmed_at, owner_confirmed_at, reference_id, gateway_order_id, \
     gateway_payment_id, gateway_signature, gateway_method, paid_at, revision_of, \
     sms_sent, sms_sent_at, created_at";

const UPDATE_PAYMENT: &str = "UPDATE bills SET \
     status = $2, payment_status = $3, tenant_confirmed_at = $4, owner_confirmed_at = $5, \
     reference_id = $6, gateway_order_id = $7, gateway_payment_id = $8, gateway_signature = $9, \
     gateway_method = $10, paid_at = $11 \
     WHERE bill_id = $1";

/// Repository for bills
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    /// Creates a new BillRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a bill
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` when the owner already has a bill for the month
    pub async fn insert(&self, row: &BillRow) -> Result<(), DatabaseError> {
        sqlx::query(&format!(
            "INSERT INTO bills ({BILL_COLUMNS}) VALUES (\
             $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, \
             $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)"
        ))
        .bind(row.bill_id)
        .bind(row.owner_id)
        .bind(row.tenant_id)
        .bind(&row.month)
        .bind(row.previous_reading)
        .bind(row.current_reading)
        .bind(row.units)
        .bind(row.unit_rate)
        .bind(row.amount)
        .bind(&row.previous_photo_url)
        .bind(&row.current_photo_url)
        .bind(&row.status)
        .bind(&row.payment_status)
        .bind(&row.upi_id)
        .bind(row.tenant_confirmed_at)
        .bind(row.owner_confirmed_at)
        .bind(&row.reference_id)
        .bind(&row.gateway_order_id)
        .bind(&row.gateway_payment_id)
        .bind(&row.gateway_signature)
        .bind(&row.gateway_method)
        .bind(row.paid_at)
        .bind(row.revision_of)
        .bind(row.sms_sent)
        .bind(row.sms_sent_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Retrieves a bill by ID
    pub async fn get_by_id(&self, bill_id: Uuid) -> Result<Option<BillRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE bill_id = $1"
        ))
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Retrieves the owner's bill for a month
    pub async fn find_by_owner_month(
        &self,
        owner_id: Uuid,
        month: &str,
    ) -> Result<Option<BillRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE owner_id = $1 AND month = $2"
        ))
        .bind(owner_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Retrieves the owner's bill with the greatest month
    pub async fn latest_for_owner(&self, owner_id: Uuid) -> Result<Option<BillRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE owner_id = $1 ORDER BY month DESC LIMIT 1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Lists the owner's bills, newest month first
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<BillRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE owner_id = $1 ORDER BY month DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Retrieves the bill whose current gateway order matches
    pub async fn find_by_gateway_order(&self, order_id: &str) -> Result<Option<BillRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BillRow>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE gateway_order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Writes status and payment columns
    ///
    /// Readings, amounts and photos are immutable after insert and are
    /// not touched. Neither are the notification columns, which only
    /// `mark_notified` writes.
    pub async fn update_payment(&self, row: &BillRow) -> Result<(), DatabaseError> {
        if self.execute_payment_update(UPDATE_PAYMENT, row).await? == 0 {
            return Err(DatabaseError::not_found("Bill", row.bill_id));
        }
        Ok(())
    }

    /// Writes status and payment columns only while the stored bill is not PAID
    ///
    /// Returns `false` when the row was already PAID and nothing changed.
    pub async fn update_payment_if_unpaid(&self, row: &BillRow) -> Result<bool, DatabaseError> {
        let sql = format!("{UPDATE_PAYMENT} AND status <> 'PAID'");
        if self.execute_payment_update(&sql, row).await? > 0 {
            return Ok(true);
        }
        match self.get_by_id(row.bill_id).await? {
            Some(_) => Ok(false),
            None => Err(DatabaseError::not_found("Bill", row.bill_id)),
        }
    }

    async fn execute_payment_update(&self, sql: &str, row: &BillRow) -> Result<u64, DatabaseError> {
        let result = sqlx::query(sql)
            .bind(row.bill_id)
            .bind(&row.status)
            .bind(&row.payment_status)
            .bind(row.tenant_confirmed_at)
            .bind(row.owner_confirmed_at)
            .bind(&row.reference_id)
            .bind(&row.gateway_order_id)
            .bind(&row.gateway_payment_id)
            .bind(&row.gateway_signature)
            .bind(&row.gateway_method)
            .bind(row.paid_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Sets only the notification columns
    pub async fn mark_notified(&self, bill_id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE bills SET sms_sent = TRUE, sms_sent_at = $2 WHERE bill_id = $1")
            .bind(bill_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Bill", bill_id));
        }
        Ok(())
    }
}

/// Database row for a bill
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BillRow {
    pub bill_id: Uuid,
    pub owner_id: Uuid,
    pub tenant_id: Uuid,
    pub month: String,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub units: Decimal,
    pub unit_rate: Decimal,
    pub amount: Decimal,
    pub previous_photo_url: Option<String>,
    pub current_photo_url: String,
    pub status: String,
    pub payment_status: String,
    pub upi_id: Option<String>,
    pub tenant_confirmed_at: Option<DateTime<Utc>>,
    pub owner_confirmed_at: Option<DateTime<Utc>>,
    pub reference_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub gateway_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub revision_of: Option<Uuid>,
    pub sms_sent: bool,
    pub sms_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
