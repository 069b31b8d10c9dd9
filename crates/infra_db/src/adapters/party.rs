//! PostgreSQL adapters for the party ports

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, OwnerId, PortError, TenantId};
use domain_party::{Language, Owner, OwnerStore, Tenant, TenantStore};

use super::ping;
use crate::error::DatabaseError;
use crate::repositories::{OwnerRepository, OwnerRow, TenantRepository, TenantRow};

/// PostgreSQL-backed owner store
///
/// The `owners` table carries unique indexes on email and mobile, so a
/// racing duplicate registration surfaces as `PortError::Conflict`.
#[derive(Debug, Clone)]
pub struct PostgresOwnerStore {
    repository: OwnerRepository,
    pool: PgPool,
}

impl PostgresOwnerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: OwnerRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresOwnerStore {}

#[async_trait]
impl HealthCheckable for PostgresOwnerStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-owner-store").await
    }
}

#[async_trait]
impl OwnerStore for PostgresOwnerStore {
    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    async fn insert(&self, owner: &Owner) -> Result<(), PortError> {
        debug!("Inserting owner");
        Ok(self.repository.insert(&owner_to_row(owner)).await?)
    }

    async fn get(&self, id: OwnerId) -> Result<Option<Owner>, PortError> {
        let row = self.repository.get_by_id(*id.as_uuid()).await?;
        Ok(row.map(row_to_owner))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Owner>, PortError> {
        let row = self.repository.find_by_email(email).await?;
        Ok(row.map(row_to_owner))
    }

    async fn find_by_verify_token(&self, token: &str) -> Result<Option<Owner>, PortError> {
        let row = self.repository.find_by_verify_token(token).await?;
        Ok(row.map(row_to_owner))
    }

    #[instrument(skip(self, owner), fields(owner_id = %owner.id))]
    async fn save(&self, owner: &Owner) -> Result<(), PortError> {
        Ok(self.repository.update(&owner_to_row(owner)).await?)
    }
}

/// PostgreSQL-backed tenant store
///
/// `tenants.owner_id` is unique, which enforces one tenant per owner.
#[derive(Debug, Clone)]
pub struct PostgresTenantStore {
    repository: TenantRepository,
    pool: PgPool,
}

impl PostgresTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: TenantRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresTenantStore {}

#[async_trait]
impl HealthCheckable for PostgresTenantStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-tenant-store").await
    }
}

#[async_trait]
impl TenantStore for PostgresTenantStore {
    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id))]
    async fn insert(&self, tenant: &Tenant) -> Result<(), PortError> {
        Ok(self.repository.insert(&tenant_to_row(tenant)).await?)
    }

    async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Option<Tenant>, PortError> {
        match self.repository.find_by_owner(*owner_id.as_uuid()).await? {
            Some(row) => Ok(Some(row_to_tenant(row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.id))]
    async fn save(&self, tenant: &Tenant) -> Result<(), PortError> {
        Ok(self.repository.update(&tenant_to_row(tenant)).await?)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn owner_to_row(owner: &Owner) -> OwnerRow {
    OwnerRow {
        owner_id: *owner.id.as_uuid(),
        name: owner.name.clone(),
        mobile: owner.mobile.clone(),
        email: owner.email.clone(),
        password_hash: owner.password_hash.clone(),
        upi_id: owner.upi_id.clone(),
        email_verified: owner.email_verified,
        email_verify_token: owner.email_verify_token.clone(),
        email_verify_expires: owner.email_verify_expires,
        created_at: owner.created_at,
    }
}

fn row_to_owner(row: OwnerRow) -> Owner {
    Owner {
        id: OwnerId::from(row.owner_id),
        name: row.name,
        mobile: row.mobile,
        email: row.email,
        password_hash: row.password_hash,
        upi_id: row.upi_id,
        email_verified: row.email_verified,
        email_verify_token: row.email_verify_token,
        email_verify_expires: row.email_verify_expires,
        created_at: row.created_at,
    }
}

fn tenant_to_row(tenant: &Tenant) -> TenantRow {
    TenantRow {
        tenant_id: *tenant.id.as_uuid(),
        owner_id: *tenant.owner_id.as_uuid(),
        name: tenant.name.clone(),
        mobile: tenant.mobile.clone(),
        language: tenant.language.code().to_string(),
        unit_rate: tenant.unit_rate,
        created_at: tenant.created_at,
    }
}

fn row_to_tenant(row: TenantRow) -> Result<Tenant, DatabaseError> {
    let language: Language = row
        .language
        .parse()
        .map_err(|_| DatabaseError::corrupt("tenants.language", &row.language))?;

    Ok(Tenant {
        id: TenantId::from(row.tenant_id),
        owner_id: OwnerId::from(row.owner_id),
        name: row.name,
        mobile: row.mobile,
        language,
        unit_rate: row.unit_rate,
        created_at: row.created_at,
    })
}
