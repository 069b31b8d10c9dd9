//! Party Domain Ports
//!
//! This module defines the storage and credential ports the party domain
//! needs. Adapters live outside the domain:
//!
//! - **Internal Adapter**: PostgreSQL stores in `infra_db`
//! - **Credential Adapter**: bcrypt hashing in `interface_api`
//! - **Mock Adapter**: in-memory stores for testing (feature `mock`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_party::{AccountService, OwnerStore, PasswordHasher};
//! use std::sync::Arc;
//!
//! let owners: Arc<dyn OwnerStore> = Arc::new(PostgresOwnerStore::new(pool));
//! let accounts = AccountService::new(owners, Arc::new(BcryptHasher::default()));
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, OwnerId, PortError};

use crate::owner::Owner;
use crate::tenant::Tenant;

/// Storage port for owner accounts
///
/// Email and mobile are unique across owners; implementations report a
/// violation as `PortError::Conflict`.
#[async_trait]
pub trait OwnerStore: DomainPort {
    /// Inserts a new owner
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if the email or mobile is already registered
    async fn insert(&self, owner: &Owner) -> Result<(), PortError>;

    /// Retrieves an owner by ID
    async fn get(&self, id: OwnerId) -> Result<Option<Owner>, PortError>;

    /// Finds an owner by (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<Owner>, PortError>;

    /// Finds an owner holding the given email-verification token
    async fn find_by_verify_token(&self, token: &str) -> Result<Option<Owner>, PortError>;

    /// Persists changes to an existing owner
    async fn save(&self, owner: &Owner) -> Result<(), PortError>;
}

/// Storage port for tenants
#[async_trait]
pub trait TenantStore: DomainPort {
    /// Inserts a new tenant
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if the owner already has a tenant
    async fn insert(&self, tenant: &Tenant) -> Result<(), PortError>;

    /// Finds the tenant configured by an owner
    async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Option<Tenant>, PortError>;

    /// Persists changes to an existing tenant
    async fn save(&self, tenant: &Tenant) -> Result<(), PortError>;
}

/// Password hashing port
///
/// Hashing is CPU-bound; implementations decide how to keep it off the
/// async executor.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plain-text password
    async fn hash(&self, password: &str) -> Result<String, PortError>;

    /// Checks a plain-text password against a stored hash
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, PortError>;
}

/// In-memory implementations for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use chrono::Utc;

    use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};

    /// In-memory owner store
    #[derive(Debug, Default, Clone)]
    pub struct MockOwnerStore {
        owners: Arc<RwLock<HashMap<OwnerId, Owner>>>,
    }

    impl MockOwnerStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of stored owners
        pub async fn len(&self) -> usize {
            self.owners.read().await.len()
        }
    }

    impl DomainPort for MockOwnerStore {}

    #[async_trait]
    impl HealthCheckable for MockOwnerStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-owner-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl OwnerStore for MockOwnerStore {
        async fn insert(&self, owner: &Owner) -> Result<(), PortError> {
            let mut owners = self.owners.write().await;
            if owners.values().any(|o| o.email == owner.email) {
                return Err(PortError::conflict("email already registered"));
            }
            if owners.values().any(|o| o.mobile == owner.mobile) {
                return Err(PortError::conflict("mobile already registered"));
            }
            owners.insert(owner.id, owner.clone());
            Ok(())
        }

        async fn get(&self, id: OwnerId) -> Result<Option<Owner>, PortError> {
            Ok(self.owners.read().await.get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Owner>, PortError> {
            Ok(self
                .owners
                .read()
                .await
                .values()
                .find(|o| o.email == email)
                .cloned())
        }

        async fn find_by_verify_token(&self, token: &str) -> Result<Option<Owner>, PortError> {
            Ok(self
                .owners
                .read()
                .await
                .values()
                .find(|o| o.email_verify_token.as_deref() == Some(token))
                .cloned())
        }

        async fn save(&self, owner: &Owner) -> Result<(), PortError> {
            let mut owners = self.owners.write().await;
            if !owners.contains_key(&owner.id) {
                return Err(PortError::not_found("Owner", owner.id));
            }
            owners.insert(owner.id, owner.clone());
            Ok(())
        }
    }

    /// In-memory tenant store keyed by owner
    #[derive(Debug, Default, Clone)]
    pub struct MockTenantStore {
        tenants: Arc<RwLock<HashMap<OwnerId, Tenant>>>,
    }

    impl MockTenantStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MockTenantStore {}

    #[async_trait]
    impl TenantStore for MockTenantStore {
        async fn insert(&self, tenant: &Tenant) -> Result<(), PortError> {
            let mut tenants = self.tenants.write().await;
            if tenants.contains_key(&tenant.owner_id) {
                return Err(PortError::conflict("tenant already exists for owner"));
            }
            tenants.insert(tenant.owner_id, tenant.clone());
            Ok(())
        }

        async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Option<Tenant>, PortError> {
            Ok(self.tenants.read().await.get(&owner_id).cloned())
        }

        async fn save(&self, tenant: &Tenant) -> Result<(), PortError> {
            let mut tenants = self.tenants.write().await;
            if !tenants.contains_key(&tenant.owner_id) {
                return Err(PortError::not_found("Tenant", tenant.id));
            }
            tenants.insert(tenant.owner_id, tenant.clone());
            Ok(())
        }
    }

    /// Reversible "hasher" for fast tests
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PlainTextHasher;

    #[async_trait]
    impl PasswordHasher for PlainTextHasher {
        async fn hash(&self, password: &str) -> Result<String, PortError> {
            Ok(format!("plain:{password}"))
        }

        async fn verify(&self, password: &str, hash: &str) -> Result<bool, PortError> {
            Ok(hash.strip_prefix("plain:") == Some(password))
        }
    }
}
