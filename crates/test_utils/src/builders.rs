//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{DateTime, Utc};
use core_kernel::{BillId, BillingMonth, OwnerId, TenantId};
use domain_billing::{calculate, Bill, CreateBill, NewBill, PhotoUpload};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{PhotoFixtures, StringFixtures, TemporalFixtures};

/// Builder for stored bills, bypassing the billing service
///
/// Useful for seeding a store with history.
pub struct TestBillBuilder {
    owner_id: OwnerId,
    tenant_id: TenantId,
    month: BillingMonth,
    previous_reading: Decimal,
    current_reading: Decimal,
    unit_rate: Decimal,
    previous_photo_url: Option<String>,
    current_photo_url: String,
    upi_id: Option<String>,
    revision_of: Option<BillId>,
    paid: bool,
    created_at: DateTime<Utc>,
}

impl Default for TestBillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBillBuilder {
    /// Creates a new builder with default values: 100 to 150 at rate 10
    pub fn new() -> Self {
        Self {
            owner_id: OwnerId::new(),
            tenant_id: TenantId::new(),
            month: TemporalFixtures::march(),
            previous_reading: dec!(100),
            current_reading: dec!(150),
            unit_rate: dec!(10),
            previous_photo_url: None,
            current_photo_url: "https://photos.example/current.jpg".to_string(),
            upi_id: Some(StringFixtures::upi_id().to_string()),
            revision_of: None,
            paid: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_month(mut self, month: BillingMonth) -> Self {
        self.month = month;
        self
    }

    /// Sets both readings
    pub fn with_readings(mut self, previous: Decimal, current: Decimal) -> Self {
        self.previous_reading = previous;
        self.current_reading = current;
        self
    }

    pub fn with_unit_rate(mut self, rate: Decimal) -> Self {
        self.unit_rate = rate;
        self
    }

    pub fn with_previous_photo(mut self, url: impl Into<String>) -> Self {
        self.previous_photo_url = Some(url.into());
        self
    }

    pub fn with_upi_id(mut self, upi_id: Option<&str>) -> Self {
        self.upi_id = upi_id.map(str::to_string);
        self
    }

    pub fn revising(mut self, bill_id: BillId) -> Self {
        self.revision_of = Some(bill_id);
        self
    }

    /// Marks the bill paid by owner confirmation
    pub fn paid(mut self) -> Self {
        self.paid = true;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Builds the bill
    ///
    /// # Panics
    ///
    /// Panics if the current reading is below the previous one
    pub fn build(self) -> Bill {
        let consumption = calculate(self.previous_reading, self.current_reading, self.unit_rate)
            .expect("builder readings must not decrease");
        let mut bill = Bill::new(
            NewBill {
                owner_id: self.owner_id,
                tenant_id: self.tenant_id,
                month: self.month,
                previous_reading: self.previous_reading,
                current_reading: self.current_reading,
                consumption,
                unit_rate: self.unit_rate,
                previous_photo_url: self.previous_photo_url,
                current_photo_url: self.current_photo_url,
                upi_id: self.upi_id,
                revision_of: self.revision_of,
            },
            self.created_at,
        );
        if self.paid {
            bill.owner_confirm(None, self.created_at);
        }
        bill
    }
}

/// Builder for bill creation requests
pub struct CreateBillBuilder {
    month: String,
    current_reading: Decimal,
    photo: Option<PhotoUpload>,
    revision_of: Option<BillId>,
}

impl Default for CreateBillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateBillBuilder {
    /// March 2024, reading 150, with a photo
    pub fn new() -> Self {
        Self {
            month: TemporalFixtures::march().to_string(),
            current_reading: dec!(150),
            photo: Some(PhotoFixtures::jpeg()),
            revision_of: None,
        }
    }

    pub fn month(mut self, month: impl Into<String>) -> Self {
        self.month = month.into();
        self
    }

    pub fn reading(mut self, reading: Decimal) -> Self {
        self.current_reading = reading;
        self
    }

    pub fn without_photo(mut self) -> Self {
        self.photo = None;
        self
    }

    pub fn with_photo(mut self, photo: PhotoUpload) -> Self {
        self.photo = Some(photo);
        self
    }

    pub fn revising(mut self, bill_id: BillId) -> Self {
        self.revision_of = Some(bill_id);
        self
    }

    pub fn build(self) -> CreateBill {
        CreateBill {
            month: self.month,
            current_reading: self.current_reading,
            photo: self.photo,
            revision_of: self.revision_of,
        }
    }
}
