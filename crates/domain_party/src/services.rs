//! Party application services
//!
//! `AccountService` covers owner registration, login and profile
//! changes. `TenancyService` covers the one-tenant-per-owner setup.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use core_kernel::{OwnerId, PortError};

use crate::error::PartyError;
use crate::owner::{normalize_email, Owner, RegisterOwner};
use crate::ports::{OwnerStore, PasswordHasher, TenantStore};
use crate::tenant::{SetupTenant, Tenant, UpdateTenant};
use crate::validation::validate_request;

/// Outcome of a successful registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub owner: Owner,
    /// Token to embed in the verification email
    pub verify_token: String,
}

/// Owner account operations
pub struct AccountService {
    owners: Arc<dyn OwnerStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    pub fn new(owners: Arc<dyn OwnerStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { owners, hasher }
    }

    /// Registers a new owner account
    ///
    /// The email is lower-cased before the uniqueness check. A
    /// verification token valid for 24 hours is issued with the account.
    ///
    /// # Returns
    ///
    /// The stored owner and the verification token, or
    /// `DuplicateAccount` when the email or mobile is taken
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterOwner) -> Result<Registration, PartyError> {
        validate_request(&request)?;

        let email = normalize_email(&request.email);
        if self.owners.find_by_email(&email).await?.is_some() {
            return Err(PartyError::DuplicateAccount("Email".to_string()));
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let now = Utc::now();
        let mut owner = Owner::new(request.name.trim(), request.mobile.trim(), &email, password_hash, now);
        let verify_token = owner.issue_verification_token(now);

        self.owners.insert(&owner).await.map_err(|e| match e {
            PortError::Conflict { .. } => PartyError::DuplicateAccount("Email or mobile".to_string()),
            other => PartyError::Port(other),
        })?;

        info!(owner_id = %owner.id, "Owner registered");
        Ok(Registration { owner, verify_token })
    }

    /// Checks credentials
    ///
    /// Unknown email and wrong password produce the same error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Owner, PartyError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(PartyError::invalid("Please provide email and password"));
        }

        let owner = self
            .owners
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(PartyError::InvalidCredentials)?;

        if !self.hasher.verify(password, &owner.password_hash).await? {
            return Err(PartyError::InvalidCredentials);
        }
        Ok(owner)
    }

    /// Loads an owner by ID
    pub async fn get(&self, owner_id: OwnerId) -> Result<Owner, PartyError> {
        self.owners
            .get(owner_id)
            .await?
            .ok_or_else(|| PartyError::owner_not_found(owner_id))
    }

    /// Consumes an email-verification token
    #[instrument(skip(self, token))]
    pub async fn verify_email(&self, token: &str) -> Result<Owner, PartyError> {
        let mut owner = self
            .owners
            .find_by_verify_token(token)
            .await?
            .ok_or(PartyError::InvalidVerificationToken)?;

        owner.verify_email(token, Utc::now())?;
        self.owners.save(&owner).await?;
        info!(owner_id = %owner.id, "Owner email verified");
        Ok(owner)
    }

    /// Sets the UPI id snapshotted by future bills
    ///
    /// Bills already issued keep the UPI id they were created with.
    #[instrument(skip(self))]
    pub async fn set_upi_id(&self, owner_id: OwnerId, upi_id: &str) -> Result<Owner, PartyError> {
        let mut owner = self.get(owner_id).await?;
        owner.set_upi_id(upi_id);
        self.owners.save(&owner).await?;
        Ok(owner)
    }
}

/// Tenant setup and maintenance
pub struct TenancyService {
    tenants: Arc<dyn TenantStore>,
}

impl TenancyService {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }

    /// Creates the owner's tenant; at most one per owner
    #[instrument(skip(self, request), fields(owner_id = %owner_id))]
    pub async fn setup(&self, owner_id: OwnerId, request: SetupTenant) -> Result<Tenant, PartyError> {
        validate_request(&request)?;

        if self.tenants.find_by_owner(owner_id).await?.is_some() {
            return Err(PartyError::TenantExists);
        }

        let tenant = Tenant::new(owner_id, request, Utc::now())?;
        self.tenants.insert(&tenant).await.map_err(|e| match e {
            PortError::Conflict { .. } => PartyError::TenantExists,
            other => PartyError::Port(other),
        })?;

        info!(tenant_id = %tenant.id, "Tenant set up");
        Ok(tenant)
    }

    /// Returns the owner's tenant
    pub async fn get(&self, owner_id: OwnerId) -> Result<Tenant, PartyError> {
        self.find(owner_id).await?.ok_or(PartyError::TenantNotFound)
    }

    /// Returns the owner's tenant if one is set up
    pub async fn find(&self, owner_id: OwnerId) -> Result<Option<Tenant>, PartyError> {
        Ok(self.tenants.find_by_owner(owner_id).await?)
    }

    /// Updates rate, mobile or language
    #[instrument(skip(self, update), fields(owner_id = %owner_id))]
    pub async fn update(&self, owner_id: OwnerId, update: UpdateTenant) -> Result<Tenant, PartyError> {
        validate_request(&update)?;

        let mut tenant = self.get(owner_id).await?;
        tenant.apply(update)?;
        self.tenants.save(&tenant).await?;
        Ok(tenant)
    }
}
