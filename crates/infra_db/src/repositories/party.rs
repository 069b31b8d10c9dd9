//! Owner and tenant repositories
//!
//! Row-level access to the `owners` and `tenants` tables. Mapping to the
//! domain types happens in the adapters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const OWNER_COLUMNS: &str = "owner_id, name, mobile, email, password_hash, upi_id, \
     email_verified, email_verify_token, email_verify_expires, created_at";

const TENANT_COLUMNS: &str = "tenant_id, owner_id, name, mobile, language, unit_rate, created_at";

/// Repository for owner accounts
#[derive(Debug, Clone)]
pub struct OwnerRepository {
    pool: PgPool,
}

impl OwnerRepository {
    /// Creates a new OwnerRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an owner
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` when the email or mobile is already registered
    pub async fn insert(&self, row: &OwnerRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO owners (
                owner_id, name, mobile, email, password_hash, upi_id,
                email_verified, email_verify_token, email_verify_expires, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(row.owner_id)
        .bind(&row.name)
        .bind(&row.mobile)
        .bind(&row.email)
        .bind(&row.password_hash)
        .bind(&row.upi_id)
        .bind(row.email_verified)
        .bind(&row.email_verify_token)
        .bind(row.email_verify_expires)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Retrieves an owner by ID
    pub async fn get_by_id(&self, owner_id: Uuid) -> Result<Option<OwnerRow>, DatabaseError> {
        let row = sqlx::query_as::<_, OwnerRow>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Finds an owner by (lower-cased) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<OwnerRow>, DatabaseError> {
        let row = sqlx::query_as::<_, OwnerRow>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Finds the owner holding an email-verification token
    pub async fn find_by_verify_token(&self, token: &str) -> Result<Option<OwnerRow>, DatabaseError> {
        let row = sqlx::query_as::<_, OwnerRow>(&format!(
            "SELECT {OWNER_COLUMNS} FROM owners WHERE email_verify_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Updates the mutable owner fields
    pub async fn update(&self, row: &OwnerRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE owners SET
                name = $2, mobile = $3, upi_id = $4, email_verified = $5,
                email_verify_token = $6, email_verify_expires = $7
            WHERE owner_id = $1
            "#,
        )
        .bind(row.owner_id)
        .bind(&row.name)
        .bind(&row.mobile)
        .bind(&row.upi_id)
        .bind(row.email_verified)
        .bind(&row.email_verify_token)
        .bind(row.email_verify_expires)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Owner", row.owner_id));
        }
        Ok(())
    }
}

/// Repository for tenants
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    /// Creates a new TenantRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a tenant
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` when the owner already has a tenant
    pub async fn insert(&self, row: &TenantRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (tenant_id, owner_id, name, mobile, language, unit_rate, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.tenant_id)
        .bind(row.owner_id)
        .bind(&row.name)
        .bind(&row.mobile)
        .bind(&row.language)
        .bind(row.unit_rate)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Retrieves the owner's tenant
    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<TenantRow>, DatabaseError> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Updates rate, mobile and language
    pub async fn update(&self, row: &TenantRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE tenants SET mobile = $2, language = $3, unit_rate = $4 WHERE tenant_id = $1",
        )
        .bind(row.tenant_id)
        .bind(&row.mobile)
        .bind(&row.language)
        .bind(row.unit_rate)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Tenant", row.tenant_id));
        }
        Ok(())
    }
}

// ============================================================================
// Row types
// ============================================================================

/// Database row for an owner
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnerRow {
    pub owner_id: Uuid,
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub password_hash: String,
    pub upi_id: Option<String>,
    pub email_verified: bool,
    pub email_verify_token: Option<String>,
    pub email_verify_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Database row for a tenant
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub mobile: Option<String>,
    /// `en` or `mr`
    pub language: String,
    pub unit_rate: Decimal,
    pub created_at: DateTime<Utc>,
}
