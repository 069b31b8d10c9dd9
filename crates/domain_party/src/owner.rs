//! Owner account entity
//!
//! An owner is the authenticated party who records readings and collects
//! payment. The account carries the UPI id that new bills snapshot for
//! their payment links, and an email-verification token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::OwnerId;
use crate::error::PartyError;

/// Lifetime of an email-verification token
pub const EMAIL_VERIFY_TTL_HOURS: i64 = 24;

/// Registration request for a new owner account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterOwner {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 10, max = 15, message = "mobile must be 10-15 characters"))]
    pub mobile: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

/// An owner account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
    pub mobile: String,
    /// Always stored lower case
    pub email: String,
    pub password_hash: String,
    pub upi_id: Option<String>,
    pub email_verified: bool,
    pub email_verify_token: Option<String>,
    pub email_verify_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Owner {
    /// Creates a new, unverified owner
    ///
    /// # Arguments
    ///
    /// * `name` - Display name, used as the UPI payee name
    /// * `mobile` - Contact number, unique across owners
    /// * `email` - Login email; normalized to lower case
    /// * `password_hash` - Hash produced by the configured `PasswordHasher`
    /// * `now` - Creation timestamp
    pub fn new(
        name: impl Into<String>,
        mobile: impl Into<String>,
        email: &str,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OwnerId::new_v7(),
            name: name.into(),
            mobile: mobile.into(),
            email: normalize_email(email),
            password_hash: password_hash.into(),
            upi_id: None,
            email_verified: false,
            email_verify_token: None,
            email_verify_expires: None,
            created_at: now,
        }
    }

    /// Issues a fresh verification token, replacing any earlier one
    pub fn issue_verification_token(&mut self, now: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.email_verify_token = Some(token.clone());
        self.email_verify_expires = Some(now + Duration::hours(EMAIL_VERIFY_TTL_HOURS));
        token
    }

    /// Marks the email verified if `token` matches and has not expired
    pub fn verify_email(&mut self, token: &str, now: DateTime<Utc>) -> Result<(), PartyError> {
        let matches = self.email_verify_token.as_deref() == Some(token);
        let live = self.email_verify_expires.is_some_and(|expires| now <= expires);
        if !matches || !live {
            return Err(PartyError::InvalidVerificationToken);
        }

        self.email_verified = true;
        self.email_verify_token = None;
        self.email_verify_expires = None;
        Ok(())
    }

    /// Sets or clears the UPI id; blank input clears it
    pub fn set_upi_id(&mut self, upi_id: &str) {
        let trimmed = upi_id.trim();
        self.upi_id = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Returns the public view of the account
    pub fn profile(&self) -> OwnerProfile {
        OwnerProfile {
            id: self.id,
            name: self.name.clone(),
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            upi_id: self.upi_id.clone(),
            email_verified: self.email_verified,
            created_at: self.created_at,
        }
    }
}

/// Owner account without credentials or tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: OwnerId,
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub upi_id: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Lower-cases and trims an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
