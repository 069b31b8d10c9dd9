//! Tenant entity
//!
//! One tenant exists per owner. The tenant's name is fixed at setup;
//! the unit rate, mobile and language may be edited later, and rate
//! changes only affect bills created afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use core_kernel::{OwnerId, TenantId};
use crate::error::PartyError;

/// Language used for tenant-facing messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// Marathi
    Mr,
}

impl Language {
    /// Returns the BCP 47 language code
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Mr => "mr",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = PartyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Language::En),
            "mr" => Ok(Language::Mr),
            other => Err(PartyError::invalid(format!("unsupported language: {other}"))),
        }
    }
}

/// Request to set up the owner's tenant
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetupTenant {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 10, max = 15, message = "mobile must be 10-15 characters"))]
    pub mobile: Option<String>,
    pub unit_rate: Decimal,
    #[serde(default)]
    pub language: Option<Language>,
}

/// Editable tenant fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTenant {
    pub unit_rate: Option<Decimal>,
    #[validate(length(min = 10, max = 15, message = "mobile must be 10-15 characters"))]
    pub mobile: Option<String>,
    pub language: Option<Language>,
}

/// The tenant billed by an owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub owner_id: OwnerId,
    pub name: String,
    pub mobile: Option<String>,
    pub language: Language,
    /// Price per consumed unit, in rupees
    pub unit_rate: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a tenant from a validated setup request
    pub fn new(owner_id: OwnerId, request: SetupTenant, now: DateTime<Utc>) -> Result<Self, PartyError> {
        ensure_positive_rate(request.unit_rate)?;
        Ok(Self {
            id: TenantId::new_v7(),
            owner_id,
            name: request.name.trim().to_string(),
            mobile: request.mobile.filter(|m| !m.trim().is_empty()),
            language: request.language.unwrap_or_default(),
            unit_rate: request.unit_rate,
            created_at: now,
        })
    }

    /// Applies an update. The name is never editable.
    pub fn apply(&mut self, update: UpdateTenant) -> Result<(), PartyError> {
        if let Some(rate) = update.unit_rate {
            ensure_positive_rate(rate)?;
            self.unit_rate = rate;
        }
        if let Some(mobile) = update.mobile {
            self.mobile = Some(mobile).filter(|m| !m.trim().is_empty());
        }
        if let Some(language) = update.language {
            self.language = language;
        }
        Ok(())
    }
}

fn ensure_positive_rate(rate: Decimal) -> Result<(), PartyError> {
    if rate <= Decimal::ZERO {
        return Err(PartyError::invalid("unit rate must be greater than zero"));
    }
    Ok(())
}
