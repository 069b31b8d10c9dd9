//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for owners, tenants, photos and
//! gateway payloads. These fixtures are consistent and predictable so
//! tests can assert on exact values.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{BillingMonth, Currency, Money, OwnerId};
use domain_billing::{GatewaySecrets, PhotoUpload};
use domain_party::{Language, Owner, SetupTenant, Tenant};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// 50 units at rate 10
    pub fn inr_500() -> Money {
        Money::inr(dec!(500))
    }

    /// An amount with a half-paisa fraction
    pub fn inr_half_paisa() -> Money {
        Money::inr(dec!(22.005))
    }

    pub fn inr_zero() -> Money {
        Money::zero(Currency::INR)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Account creation time used by party fixtures
    pub fn registered_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap()
    }

    pub fn first_month() -> BillingMonth {
        BillingMonth::new(2024, 1).unwrap()
    }

    pub fn march() -> BillingMonth {
        BillingMonth::new(2024, 3).unwrap()
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn owner_name() -> &'static str {
        "Asha Patil"
    }

    pub fn owner_mobile() -> &'static str {
        "9876543210"
    }

    pub fn owner_email() -> &'static str {
        "asha@example.com"
    }

    pub fn owner_password() -> &'static str {
        "secret123"
    }

    /// `owner_password` as stored by `PlainTextHasher`
    pub fn owner_password_hash() -> &'static str {
        "plain:secret123"
    }

    pub fn upi_id() -> &'static str {
        "asha@okbank"
    }

    pub fn tenant_name() -> &'static str {
        "Ravi Kulkarni"
    }

    pub fn tenant_mobile() -> &'static str {
        "9123456789"
    }
}

/// Fixture for owners and tenants
pub struct PartyFixtures;

impl PartyFixtures {
    /// An owner with a UPI id whose password is `owner_password`
    pub fn owner() -> Owner {
        let mut owner = Owner::new(
            StringFixtures::owner_name(),
            StringFixtures::owner_mobile(),
            StringFixtures::owner_email(),
            StringFixtures::owner_password_hash(),
            TemporalFixtures::registered_at(),
        );
        owner.set_upi_id(StringFixtures::upi_id());
        owner
    }

    /// An owner who has not published a UPI id
    pub fn owner_without_upi() -> Owner {
        Owner::new(
            "Meena Shah",
            "9000000001",
            "meena@example.com",
            StringFixtures::owner_password_hash(),
            TemporalFixtures::registered_at(),
        )
    }

    pub fn setup_tenant(unit_rate: Decimal) -> SetupTenant {
        SetupTenant {
            name: StringFixtures::tenant_name().to_string(),
            mobile: Some(StringFixtures::tenant_mobile().to_string()),
            unit_rate,
            language: Some(Language::En),
        }
    }

    /// A tenant billed at `unit_rate`
    pub fn tenant(owner_id: OwnerId, unit_rate: Decimal) -> Tenant {
        Tenant::new(owner_id, Self::setup_tenant(unit_rate), TemporalFixtures::registered_at()).unwrap()
    }
}

/// Fixture for meter photos
pub struct PhotoFixtures;

impl PhotoFixtures {
    pub fn jpeg() -> PhotoUpload {
        PhotoUpload {
            file_name: Some("meter.jpg".to_string()),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }
    }

    pub fn empty() -> PhotoUpload {
        PhotoUpload::default()
    }
}

/// Fixture for gateway credentials and webhook bodies
pub struct GatewayFixtures;

impl GatewayFixtures {
    pub fn secrets() -> GatewaySecrets {
        GatewaySecrets::new("rzp_test_key", "test_key_secret", Some("test_webhook_secret".to_string()))
    }

    /// Secrets without a webhook secret
    pub fn secrets_without_webhook() -> GatewaySecrets {
        GatewaySecrets::new("rzp_test_key", "test_key_secret", None)
    }

    pub fn captured(order_id: &str, payment_id: &str) -> Vec<u8> {
        json!({
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": { "id": payment_id, "order_id": order_id, "method": "upi" }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    pub fn failed(order_id: &str, payment_id: &str) -> Vec<u8> {
        json!({
            "event": "payment.failed",
            "payload": {
                "payment": {
                    "entity": { "id": payment_id, "order_id": order_id }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    pub fn other_event(event: &str) -> Vec<u8> {
        json!({ "event": event, "payload": {} }).to_string().into_bytes()
    }
}
