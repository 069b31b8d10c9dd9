//! Billing application service
//!
//! `BillingService` runs every bill operation: creation against the
//! reading chain, the manual and gateway payment transitions, and the
//! read models. Validation and conflict checks all happen before the
//! first write. Events are published only after the store accepted the
//! change, and publishing cannot fail an operation.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use core_kernel::{BillId, BillingMonth, Currency, OwnerId, PortError};
use domain_party::{OwnerStore, TenantStore};

use crate::bill::{Bill, NewBill, Settlement};
use crate::error::BillingError;
use crate::events::{BillEvent, PaymentChannel};
use crate::ports::{
    BillStore, EventPublisher, OrderRequest, PaymentGateway, PhotoStorage, PhotoUpload,
    StatementRenderer,
};
use crate::reading;
use crate::upi::{build_upi_link, UpiRequest};
use crate::view::{BillView, CheckoutOrder, OwnerSummary, PaymentStatusView, Statement, TenantSummary};
use crate::webhook::{self, WebhookEvent};

/// Payee name used in UPI links when the owner cannot be loaded
const FALLBACK_PAYEE: &str = "Owner";

/// Collaborators of the billing service
#[derive(Clone)]
pub struct BillingPorts {
    pub bills: Arc<dyn BillStore>,
    pub owners: Arc<dyn OwnerStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub photos: Arc<dyn PhotoStorage>,
    pub statements: Arc<dyn StatementRenderer>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub events: Arc<dyn EventPublisher>,
}

/// Input for creating a bill
#[derive(Debug, Clone)]
pub struct CreateBill {
    /// `YYYY-MM`
    pub month: String,
    pub current_reading: Decimal,
    pub photo: Option<PhotoUpload>,
    /// Bill this one corrects, if any
    pub revision_of: Option<BillId>,
}

/// Identifiers returned by the checkout widget
#[derive(Debug, Clone)]
pub struct GatewayConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// What a webhook delivery did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The bill moved to PAID
    Settled(BillId),
    /// The bill was already PAID; nothing changed
    AlreadyPaid(BillId),
    /// The payment record moved to FAILED
    Failed(BillId),
    /// Failure reported for a bill that is not pending; nothing changed
    FailureIgnored(BillId),
    /// No bill carries the order id
    UnknownOrder,
    /// Event type the service does not act on
    Ignored(String),
}

/// Bill lifecycle and payment reconciliation
pub struct BillingService {
    ports: BillingPorts,
}

impl BillingService {
    pub fn new(ports: BillingPorts) -> Self {
        Self { ports }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Creates the owner's bill for a month
    ///
    /// The previous reading and photo come from the owner's latest bill
    /// (zero and none for the first bill). The unit rate is copied from
    /// the tenant. The photo is stored before the bill is built, so a
    /// storage failure leaves nothing behind.
    ///
    /// # Returns
    ///
    /// The persisted bill. Fails with `InvalidMonth`, `SetupRequired`,
    /// `DuplicateMonth`, `BackdatedMonth`, `MissingProof`,
    /// `InvalidReading` or `InvalidInput` before any write, and with
    /// `Storage` when the photo cannot be stored.
    #[instrument(skip(self, request), fields(owner_id = %owner_id, month = %request.month))]
    pub async fn create_bill(&self, owner_id: OwnerId, request: CreateBill) -> Result<Bill, BillingError> {
        let month: BillingMonth = request.month.trim().parse()?;

        let tenant = self
            .ports
            .tenants
            .find_by_owner(owner_id)
            .await?
            .ok_or(BillingError::SetupRequired)?;

        if self.ports.bills.find_by_owner_month(owner_id, month).await?.is_some() {
            return Err(BillingError::DuplicateMonth(month));
        }

        let latest = self.ports.bills.latest_for_owner(owner_id).await?;
        if let Some(latest) = &latest {
            if latest.month > month {
                return Err(BillingError::BackdatedMonth {
                    month,
                    latest: latest.month,
                });
            }
        }

        let photo = request
            .photo
            .filter(|p| !p.is_empty())
            .ok_or(BillingError::MissingProof)?;

        let previous_reading = latest.as_ref().map_or(Decimal::ZERO, |b| b.current_reading);
        let previous_photo_url = latest.as_ref().map(|b| b.current_photo_url.clone());
        let consumption = reading::calculate(previous_reading, request.current_reading, tenant.unit_rate)?;

        if let Some(revised) = request.revision_of {
            let original = self.ports.bills.get(revised).await?;
            if !original.is_some_and(|b| b.owner_id == owner_id) {
                return Err(BillingError::invalid("revision_of must reference one of your bills"));
            }
        }

        let upi_id = self
            .ports
            .owners
            .get(owner_id)
            .await?
            .and_then(|owner| owner.upi_id);

        let current_photo_url = self
            .ports
            .photos
            .store(photo)
            .await
            .map_err(BillingError::Storage)?;

        let bill = Bill::new(
            NewBill {
                owner_id,
                tenant_id: tenant.id,
                month,
                previous_reading,
                current_reading: request.current_reading,
                consumption,
                unit_rate: tenant.unit_rate,
                previous_photo_url,
                current_photo_url,
                upi_id,
                revision_of: request.revision_of,
            },
            Utc::now(),
        );

        self.ports.bills.insert(&bill).await.map_err(|e| match e {
            PortError::Conflict { .. } => BillingError::DuplicateMonth(month),
            other => BillingError::Port(other),
        })?;

        info!(bill_id = %bill.id, units = %bill.units, amount = %bill.amount, "Bill created");
        self.ports.events.publish(BillEvent::BillCreated {
            bill_id: bill.id,
            owner_id,
            timestamp: bill.created_at,
        });
        Ok(bill)
    }

    // ========================================================================
    // Manual payment path
    // ========================================================================

    /// Tenant reports payment; no authentication
    ///
    /// Fails with `AlreadyPaid` when the bill is settled, including a
    /// settlement that lands between the read and the write.
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn tenant_confirm(&self, bill_id: BillId) -> Result<Bill, BillingError> {
        let mut bill = self.load(bill_id).await?;
        bill.tenant_confirm(Utc::now())?;
        if !self.ports.bills.save_unless_paid(&bill).await? {
            debug!("Bill settled concurrently; tenant confirmation dropped");
            return Err(BillingError::AlreadyPaid);
        }
        info!("Tenant confirmed payment");
        Ok(bill)
    }

    /// Owner flips the bill between UNPAID and PAID
    #[instrument(skip(self), fields(bill_id = %bill_id, owner_id = %owner_id))]
    pub async fn owner_toggle_status(&self, bill_id: BillId, owner_id: OwnerId) -> Result<Bill, BillingError> {
        let mut bill = self.load(bill_id).await?;
        bill.ensure_owned_by(owner_id)?;
        let status = bill.toggle_status(Utc::now());
        self.ports.bills.save(&bill).await?;
        info!(status = %status, "Bill status toggled");
        Ok(bill)
    }

    /// Owner confirms a manual payment, optionally with a reference id
    ///
    /// A confirmation notification is published only when the bill
    /// actually moves to PAID.
    #[instrument(skip(self), fields(bill_id = %bill_id, owner_id = %owner_id))]
    pub async fn owner_confirm(
        &self,
        bill_id: BillId,
        owner_id: OwnerId,
        reference_id: Option<String>,
    ) -> Result<Bill, BillingError> {
        let mut bill = self.load(bill_id).await?;
        bill.ensure_owned_by(owner_id)?;
        let now = Utc::now();
        let newly_paid = bill.owner_confirm(reference_id, now);
        self.ports.bills.save(&bill).await?;

        if newly_paid {
            info!("Owner confirmed payment");
            self.ports.events.publish(BillEvent::PaymentConfirmed {
                bill_id,
                owner_id,
                channel: PaymentChannel::OwnerConfirm,
                timestamp: now,
            });
        }
        Ok(bill)
    }

    // ========================================================================
    // Gateway payment path
    // ========================================================================

    /// Opens a gateway checkout for an unpaid bill
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn create_gateway_order(&self, bill_id: BillId) -> Result<CheckoutOrder, BillingError> {
        let mut bill = self.load(bill_id).await?;
        if bill.is_paid() {
            return Err(BillingError::AlreadyPaid);
        }

        let amount = bill
            .amount_money()
            .to_minor()
            .map_err(|e| BillingError::Calculation(e.to_string()))?;
        let order = self
            .ports
            .gateway
            .create_order(OrderRequest {
                amount,
                currency: Currency::INR,
                receipt: format!("bill_{}", bill.id.as_uuid()),
                bill_id,
            })
            .await
            .map_err(BillingError::Gateway)?;

        bill.attach_gateway_order(order.id.clone())?;
        if !self.ports.bills.save_unless_paid(&bill).await? {
            return Err(BillingError::AlreadyPaid);
        }
        info!(order_id = %order.id, "Gateway order created");

        let tenant = self.ports.tenants.find_by_owner(bill.owner_id).await?;
        Ok(CheckoutOrder {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency.code().to_string(),
            key_id: self.ports.gateway.key_id().to_string(),
            bill_id,
            tenant: tenant.map(|t| t.name),
            description: format!("Electricity Bill - {}", bill.month),
        })
    }

    /// Settles a bill from a checkout callback
    ///
    /// The signature is checked before the bill is even looked up, so a
    /// tampered request never touches the store. A bill already PAID,
    /// or settled by another path while this one runs, is returned as
    /// stored.
    #[instrument(skip(self, confirmation), fields(order_id = %confirmation.order_id))]
    pub async fn gateway_verify(&self, confirmation: GatewayConfirmation) -> Result<Bill, BillingError> {
        let GatewayConfirmation {
            order_id,
            payment_id,
            signature,
        } = confirmation;
        if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
            return Err(BillingError::invalid("Missing payment details"));
        }

        if !self
            .ports
            .gateway
            .verify_payment_signature(&order_id, &payment_id, &signature)
        {
            warn!("Invalid payment signature");
            return Err(BillingError::SignatureInvalid);
        }

        let mut bill = self
            .ports
            .bills
            .find_by_gateway_order(&order_id)
            .await?
            .ok_or_else(|| BillingError::not_found(format!("order {order_id}")))?;

        let now = Utc::now();
        match bill.settle_via_gateway(&payment_id, Some(&signature), None, now) {
            Settlement::Applied => {
                if !self.ports.bills.save_unless_paid(&bill).await? {
                    debug!(bill_id = %bill.id, "Bill settled concurrently; verify is a no-op");
                    return self.load(bill.id).await;
                }
                info!(bill_id = %bill.id, "Payment verified, bill PAID");
                self.ports.events.publish(BillEvent::PaymentConfirmed {
                    bill_id: bill.id,
                    owner_id: bill.owner_id,
                    channel: PaymentChannel::GatewayVerify,
                    timestamp: now,
                });
            }
            Settlement::AlreadyPaid => debug!(bill_id = %bill.id, "Bill already paid; verify is a no-op"),
        }
        Ok(bill)
    }

    /// Processes a gateway webhook
    ///
    /// The signature covers the raw body and uses the webhook secret.
    /// Unknown orders and other event types are acknowledged so the
    /// gateway stops retrying.
    #[instrument(skip(self, body, signature), fields(body_len = body.len()))]
    pub async fn gateway_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, BillingError> {
        let verified = signature
            .is_some_and(|sig| self.ports.gateway.verify_webhook_signature(body, sig));
        if !verified {
            warn!("Invalid webhook signature");
            return Err(BillingError::SignatureInvalid);
        }

        match webhook::parse(body)? {
            WebhookEvent::Captured {
                order_id,
                payment_id,
                method,
            } => {
                let Some(mut bill) = self.bill_for_order(order_id.as_deref()).await? else {
                    return Ok(WebhookOutcome::UnknownOrder);
                };
                let now = Utc::now();
                match bill.settle_via_gateway(&payment_id, None, method.as_deref(), now) {
                    Settlement::Applied => {
                        if !self.ports.bills.save_unless_paid(&bill).await? {
                            debug!(bill_id = %bill.id, "Bill settled concurrently");
                            return Ok(WebhookOutcome::AlreadyPaid(bill.id));
                        }
                        info!(bill_id = %bill.id, "Webhook: bill PAID");
                        self.ports.events.publish(BillEvent::PaymentConfirmed {
                            bill_id: bill.id,
                            owner_id: bill.owner_id,
                            channel: PaymentChannel::GatewayWebhook,
                            timestamp: now,
                        });
                        Ok(WebhookOutcome::Settled(bill.id))
                    }
                    Settlement::AlreadyPaid => Ok(WebhookOutcome::AlreadyPaid(bill.id)),
                }
            }
            WebhookEvent::Failed { order_id, payment_id } => {
                let Some(mut bill) = self.bill_for_order(order_id.as_deref()).await? else {
                    return Ok(WebhookOutcome::UnknownOrder);
                };
                if bill.fail_via_gateway(&payment_id)
                    && self.ports.bills.save_unless_paid(&bill).await?
                {
                    info!(bill_id = %bill.id, "Webhook: payment failed");
                    Ok(WebhookOutcome::Failed(bill.id))
                } else {
                    Ok(WebhookOutcome::FailureIgnored(bill.id))
                }
            }
            WebhookEvent::Other(event) => {
                debug!(event = %event, "Webhook event ignored");
                Ok(WebhookOutcome::Ignored(event))
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Loads a bill
    pub async fn get_bill(&self, bill_id: BillId) -> Result<Bill, BillingError> {
        self.load(bill_id).await
    }

    /// Owner's bill history, newest month first
    pub async fn list_bills(&self, owner_id: OwnerId) -> Result<Vec<Bill>, BillingError> {
        Ok(self.ports.bills.list_for_owner(owner_id).await?)
    }

    /// Owner's most recent bill
    pub async fn last_bill(&self, owner_id: OwnerId) -> Result<Option<Bill>, BillingError> {
        Ok(self.ports.bills.latest_for_owner(owner_id).await?)
    }

    /// Public view of a bill
    ///
    /// Includes a UPI link while the bill is UNPAID, carries a UPI id
    /// snapshot and has a positive amount.
    pub async fn bill_view(&self, bill_id: BillId) -> Result<BillView, BillingError> {
        let bill = self.load(bill_id).await?;
        self.view_of(bill).await
    }

    /// Payment state of a bill
    pub async fn payment_status(&self, bill_id: BillId) -> Result<PaymentStatusView, BillingError> {
        let bill = self.load(bill_id).await?;
        Ok(PaymentStatusView::from(&bill))
    }

    /// Renders the downloadable statement for a bill
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn render_statement(&self, bill_id: BillId) -> Result<Statement, BillingError> {
        let view = self.bill_view(bill_id).await?;
        self.ports
            .statements
            .render(&view)
            .await
            .map_err(BillingError::Statement)
    }

    /// Records that the tenant has been notified about a bill
    pub async fn mark_notified(&self, bill_id: BillId) -> Result<(), BillingError> {
        Ok(self.ports.bills.mark_notified(bill_id, Utc::now()).await?)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load(&self, bill_id: BillId) -> Result<Bill, BillingError> {
        self.ports
            .bills
            .get(bill_id)
            .await?
            .ok_or_else(|| BillingError::not_found(bill_id))
    }

    async fn bill_for_order(&self, order_id: Option<&str>) -> Result<Option<Bill>, BillingError> {
        let Some(order_id) = order_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let bill = self.ports.bills.find_by_gateway_order(order_id).await?;
        if bill.is_none() {
            warn!(order_id = %order_id, "Webhook for unknown order");
        }
        Ok(bill)
    }

    async fn view_of(&self, bill: Bill) -> Result<BillView, BillingError> {
        let owner = self.ports.owners.get(bill.owner_id).await?;
        let tenant = self.ports.tenants.find_by_owner(bill.owner_id).await?;

        let upi_link = if bill.is_paid() || bill.amount <= Decimal::ZERO {
            None
        } else {
            bill.payment.manual.upi_id.as_deref().and_then(|upi_id| {
                let note = format!("Electricity Bill {}", bill.month);
                build_upi_link(&UpiRequest {
                    upi_id: Some(upi_id),
                    payee_name: Some(owner.as_ref().map_or(FALLBACK_PAYEE, |o| o.name.as_str())),
                    amount: Some(bill.amount),
                    note: Some(&note),
                })
                .map_err(|e| warn!(error = %e, "Could not build UPI link"))
                .ok()
            })
        };

        Ok(BillView {
            owner: owner.map(|o| OwnerSummary {
                name: o.name,
                mobile: o.mobile,
            }),
            tenant: tenant.map(|t| TenantSummary {
                name: t.name,
                mobile: t.mobile,
                unit_rate: t.unit_rate,
            }),
            upi_link,
            bill,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::BillStatus;
    use crate::payment::PaymentStatus;
    use crate::ports::mock::{
        InMemoryBillStore, MockPaymentGateway, MockPhotoStorage, MockStatementRenderer,
        RecordingPublisher,
    };
    use crate::signature::GatewaySecrets;
    use domain_party::{MockOwnerStore, MockTenantStore, Owner, SetupTenant, Tenant};
    use rust_decimal_macros::dec;

    struct Fixture {
        service: BillingService,
        bills: InMemoryBillStore,
        owners: MockOwnerStore,
        tenants: MockTenantStore,
        photos: Arc<MockPhotoStorage>,
        statements: Arc<MockStatementRenderer>,
        gateway: Arc<MockPaymentGateway>,
        events: RecordingPublisher,
        owner: Owner,
    }

    async fn fixture(rate: Decimal) -> Fixture {
        let bills = InMemoryBillStore::new();
        let owners = MockOwnerStore::new();
        let tenants = MockTenantStore::new();
        let photos = Arc::new(MockPhotoStorage::new());
        let statements = Arc::new(MockStatementRenderer::new());
        let gateway = Arc::new(MockPaymentGateway::new(GatewaySecrets::new(
            "key_id",
            "key_secret",
            Some("hook_secret".to_string()),
        )));
        let events = RecordingPublisher::new();

        let mut owner = Owner::new("Asha", "9876543210", "asha@example.com", "hash", Utc::now());
        owner.set_upi_id("asha@okbank");
        owners.insert(&owner).await.unwrap();
        let tenant = Tenant::new(
            owner.id,
            SetupTenant {
                name: "Ravi".to_string(),
                mobile: Some("9123456789".to_string()),
                unit_rate: rate,
                language: None,
            },
            Utc::now(),
        )
        .unwrap();
        tenants.insert(&tenant).await.unwrap();

        let service = BillingService::new(BillingPorts {
            bills: Arc::new(bills.clone()),
            owners: Arc::new(owners.clone()),
            tenants: Arc::new(tenants.clone()),
            photos: photos.clone(),
            statements: statements.clone(),
            gateway: gateway.clone(),
            events: Arc::new(events.clone()),
        });

        Fixture {
            service,
            bills,
            owners,
            tenants,
            photos,
            statements,
            gateway,
            events,
            owner,
        }
    }

    /// Bill store whose next read returns a snapshot taken earlier
    struct StaleRead {
        inner: InMemoryBillStore,
        snapshot: std::sync::Mutex<Option<Bill>>,
    }

    impl StaleRead {
        fn take(&self) -> Option<Bill> {
            self.snapshot.lock().unwrap().take()
        }
    }

    impl core_kernel::DomainPort for StaleRead {}

    #[async_trait::async_trait]
    impl BillStore for StaleRead {
        async fn insert(&self, bill: &Bill) -> Result<(), PortError> {
            self.inner.insert(bill).await
        }

        async fn get(&self, id: BillId) -> Result<Option<Bill>, PortError> {
            match self.take() {
                Some(bill) => Ok(Some(bill)),
                None => self.inner.get(id).await,
            }
        }

        async fn find_by_owner_month(
            &self,
            owner_id: OwnerId,
            month: BillingMonth,
        ) -> Result<Option<Bill>, PortError> {
            self.inner.find_by_owner_month(owner_id, month).await
        }

        async fn latest_for_owner(&self, owner_id: OwnerId) -> Result<Option<Bill>, PortError> {
            self.inner.latest_for_owner(owner_id).await
        }

        async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Bill>, PortError> {
            self.inner.list_for_owner(owner_id).await
        }

        async fn find_by_gateway_order(&self, order_id: &str) -> Result<Option<Bill>, PortError> {
            match self.take() {
                Some(bill) => Ok(Some(bill)),
                None => self.inner.find_by_gateway_order(order_id).await,
            }
        }

        async fn save(&self, bill: &Bill) -> Result<(), PortError> {
            self.inner.save(bill).await
        }

        async fn save_unless_paid(&self, bill: &Bill) -> Result<bool, PortError> {
            self.inner.save_unless_paid(bill).await
        }

        async fn mark_notified(&self, id: BillId, at: chrono::DateTime<Utc>) -> Result<(), PortError> {
            self.inner.mark_notified(id, at).await
        }
    }

    /// A second service over the fixture's stores whose next read is `snapshot`
    fn lagging_service(f: &Fixture, snapshot: Bill) -> (BillingService, RecordingPublisher) {
        let events = RecordingPublisher::new();
        let service = BillingService::new(BillingPorts {
            bills: Arc::new(StaleRead {
                inner: f.bills.clone(),
                snapshot: std::sync::Mutex::new(Some(snapshot)),
            }),
            owners: Arc::new(f.owners.clone()),
            tenants: Arc::new(f.tenants.clone()),
            photos: f.photos.clone(),
            statements: f.statements.clone(),
            gateway: f.gateway.clone(),
            events: Arc::new(events.clone()),
        });
        (service, events)
    }

    async fn verify(f: &Fixture, order_id: &str, payment_id: &str) -> Bill {
        let signature = f.gateway.secrets().sign_payment(order_id, payment_id);
        f.service
            .gateway_verify(GatewayConfirmation {
                order_id: order_id.to_string(),
                payment_id: payment_id.to_string(),
                signature,
            })
            .await
            .unwrap()
    }

    fn photo() -> Option<PhotoUpload> {
        Some(PhotoUpload {
            file_name: Some("meter.jpg".to_string()),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xFF, 0xD8, 0xFF],
        })
    }

    fn request(month: &str, reading: Decimal) -> CreateBill {
        CreateBill {
            month: month.to_string(),
            current_reading: reading,
            photo: photo(),
            revision_of: None,
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    #[tokio::test]
    async fn test_first_bill_starts_from_zero() {
        let f = fixture(dec!(5)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(20))).await.unwrap();

        assert_eq!(bill.previous_reading, Decimal::ZERO);
        assert_eq!(bill.units, dec!(20));
        assert_eq!(bill.amount, dec!(100));
        assert!(bill.previous_photo_url.is_none());
        assert_eq!(bill.payment.manual.upi_id.as_deref(), Some("asha@okbank"));
        assert!(matches!(f.events.events().as_slice(), [BillEvent::BillCreated { .. }]));
    }

    #[tokio::test]
    async fn test_second_bill_chains_previous_reading() {
        let f = fixture(dec!(10)).await;
        let first = f.service.create_bill(f.owner.id, request("2024-01", dec!(100))).await.unwrap();
        let second = f.service.create_bill(f.owner.id, request("2024-02", dec!(150))).await.unwrap();

        assert_eq!(second.previous_reading, first.current_reading);
        assert_eq!(second.previous_photo_url.as_deref(), Some(first.current_photo_url.as_str()));
        assert_eq!(second.units, dec!(50));
        assert_eq!(second.amount, dec!(500));
    }

    #[tokio::test]
    async fn test_rate_is_frozen_at_creation() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();

        let mut tenant = f.tenants.find_by_owner(f.owner.id).await.unwrap().unwrap();
        tenant.unit_rate = dec!(99);
        f.tenants.save(&tenant).await.unwrap();

        let stored = f.service.get_bill(bill.id).await.unwrap();
        assert_eq!(stored.unit_rate, dec!(10));
        assert_eq!(stored.amount, dec!(100));
    }

    #[tokio::test]
    async fn test_setup_required() {
        let f = fixture(dec!(10)).await;
        let result = f.service.create_bill(OwnerId::new(), request("2024-01", dec!(10))).await;
        assert!(matches!(result, Err(BillingError::SetupRequired)));
    }

    #[tokio::test]
    async fn test_duplicate_month_is_conflict() {
        let f = fixture(dec!(10)).await;
        f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let result = f.service.create_bill(f.owner.id, request("2024-01", dec!(20))).await;

        assert!(matches!(result, Err(BillingError::DuplicateMonth(_))));
        assert_eq!(f.bills.len().await, 1);
    }

    #[tokio::test]
    async fn test_backdated_month_rejected() {
        let f = fixture(dec!(10)).await;
        f.service.create_bill(f.owner.id, request("2024-03", dec!(10))).await.unwrap();
        let result = f.service.create_bill(f.owner.id, request("2024-02", dec!(20))).await;
        assert!(matches!(result, Err(BillingError::BackdatedMonth { .. })));
    }

    #[tokio::test]
    async fn test_invalid_reading_persists_nothing() {
        let f = fixture(dec!(10)).await;
        f.service.create_bill(f.owner.id, request("2024-01", dec!(150))).await.unwrap();
        f.events.clear();

        let result = f.service.create_bill(f.owner.id, request("2024-02", dec!(100))).await;
        assert!(matches!(result, Err(BillingError::InvalidReading { .. })));
        assert_eq!(f.bills.len().await, 1);
        assert_eq!(f.photos.stored(), 1);
        assert!(f.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_photo() {
        let f = fixture(dec!(10)).await;
        let mut req = request("2024-01", dec!(10));
        req.photo = None;
        let result = f.service.create_bill(f.owner.id, req).await;
        assert!(matches!(result, Err(BillingError::MissingProof)));

        let mut empty = request("2024-01", dec!(10));
        empty.photo = Some(PhotoUpload::default());
        let result = f.service.create_bill(f.owner.id, empty).await;
        assert!(matches!(result, Err(BillingError::MissingProof)));
    }

    #[tokio::test]
    async fn test_invalid_month_format() {
        let f = fixture(dec!(10)).await;
        let result = f.service.create_bill(f.owner.id, request("March 2024", dec!(10))).await;
        assert!(matches!(result, Err(BillingError::InvalidMonth(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_creates_no_bill() {
        let f = fixture(dec!(10)).await;
        f.photos.fail_next();
        let result = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await;

        assert!(matches!(result, Err(BillingError::Storage(_))));
        assert_eq!(f.bills.len().await, 0);
        assert!(f.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_revision_must_reference_own_bill() {
        let f = fixture(dec!(10)).await;
        let first = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();

        let mut bad = request("2024-02", dec!(20));
        bad.revision_of = Some(BillId::new());
        assert!(matches!(
            f.service.create_bill(f.owner.id, bad).await,
            Err(BillingError::InvalidInput(_))
        ));

        let mut good = request("2024-02", dec!(20));
        good.revision_of = Some(first.id);
        let revised = f.service.create_bill(f.owner.id, good).await.unwrap();
        assert_eq!(revised.revision_of, Some(first.id));
    }

    // ========================================================================
    // Manual payment path
    // ========================================================================

    #[tokio::test]
    async fn test_tenant_confirm_then_owner_toggle() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();

        let confirmed = f.service.tenant_confirm(bill.id).await.unwrap();
        assert_eq!(confirmed.status, BillStatus::Unpaid);
        assert_eq!(confirmed.payment.status, PaymentStatus::TenantConfirmed);

        let paid = f.service.owner_toggle_status(bill.id, f.owner.id).await.unwrap();
        assert_eq!(paid.status, BillStatus::Paid);
        assert_eq!(paid.payment.status, PaymentStatus::Paid);
        assert!(paid.payment.manual.tenant_confirmed_at.is_some());
        assert!(paid.payment.manual.owner_confirmed_at.is_some());

        let again = f.service.tenant_confirm(bill.id).await;
        assert!(matches!(again, Err(BillingError::AlreadyPaid)));
    }

    #[tokio::test]
    async fn test_toggle_by_other_owner_is_unauthorized() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();

        let result = f.service.owner_toggle_status(bill.id, OwnerId::new()).await;
        assert!(matches!(result, Err(BillingError::Unauthorized)));
        assert_eq!(f.service.get_bill(bill.id).await.unwrap().status, BillStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_owner_confirm_publishes_once() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        f.events.clear();

        let paid = f
            .service
            .owner_confirm(bill.id, f.owner.id, Some("UTR42".to_string()))
            .await
            .unwrap();
        assert_eq!(paid.payment.manual.reference_id.as_deref(), Some("UTR42"));
        f.service.owner_confirm(bill.id, f.owner.id, None).await.unwrap();

        let events = f.events.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            BillEvent::PaymentConfirmed {
                channel: PaymentChannel::OwnerConfirm,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_bill_is_not_found() {
        let f = fixture(dec!(10)).await;
        let result = f.service.tenant_confirm(BillId::new()).await;
        assert!(matches!(result, Err(BillingError::BillNotFound(_))));
    }

    // ========================================================================
    // Gateway payment path
    // ========================================================================

    #[tokio::test]
    async fn test_create_order_in_minor_units() {
        let f = fixture(dec!(7.777)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        assert_eq!(bill.amount, dec!(77.770));

        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        assert_eq!(order.amount, 7777);
        assert_eq!(order.currency, "INR");
        assert_eq!(order.key_id, "key_id");
        assert_eq!(order.tenant.as_deref(), Some("Ravi"));
        assert_eq!(order.description, "Electricity Bill - 2024-01");

        let requests = f.gateway.requests();
        assert_eq!(requests[0].receipt, format!("bill_{}", bill.id.as_uuid()));

        let stored = f.service.get_bill(bill.id).await.unwrap();
        assert_eq!(stored.payment.order_id(), Some(order.order_id.as_str()));
    }

    #[tokio::test]
    async fn test_create_order_for_paid_bill_is_conflict() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        f.service.owner_toggle_status(bill.id, f.owner.id).await.unwrap();

        let result = f.service.create_gateway_order(bill.id).await;
        assert!(matches!(result, Err(BillingError::AlreadyPaid)));
    }

    #[tokio::test]
    async fn test_verify_with_tampered_signature_changes_nothing() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        let before = f.service.get_bill(bill.id).await.unwrap();

        let result = f
            .service
            .gateway_verify(GatewayConfirmation {
                order_id: order.order_id,
                payment_id: "pay_1".to_string(),
                signature: "0".repeat(64),
            })
            .await;

        assert!(matches!(result, Err(BillingError::SignatureInvalid)));
        assert_eq!(f.service.get_bill(bill.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_verify_settles_and_second_verify_is_noop() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        f.events.clear();

        let signature = f.gateway.secrets().sign_payment(&order.order_id, "pay_1");
        let confirmation = GatewayConfirmation {
            order_id: order.order_id.clone(),
            payment_id: "pay_1".to_string(),
            signature,
        };

        let paid = f.service.gateway_verify(confirmation.clone()).await.unwrap();
        assert_eq!(paid.status, BillStatus::Paid);
        assert!(paid.payment.paid_at.is_some());

        let replay = f.service.gateway_verify(confirmation).await.unwrap();
        assert_eq!(replay, paid);
        assert_eq!(f.events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_requires_all_fields() {
        let f = fixture(dec!(10)).await;
        let result = f
            .service
            .gateway_verify(GatewayConfirmation {
                order_id: "order_1".to_string(),
                payment_id: String::new(),
                signature: "sig".to_string(),
            })
            .await;
        assert!(matches!(result, Err(BillingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_tenant_confirm_read_before_verify_keeps_gateway_paid() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        let before_verify = f.service.get_bill(bill.id).await.unwrap();

        let paid = verify(&f, &order.order_id, "pay_1").await;
        let (lagging, _) = lagging_service(&f, before_verify);

        let result = lagging.tenant_confirm(bill.id).await;
        assert!(matches!(result, Err(BillingError::AlreadyPaid)));

        let stored = f.service.get_bill(bill.id).await.unwrap();
        assert_eq!(stored, paid);
        assert_eq!(stored.status, BillStatus::Paid);
        assert!(stored.payment.paid_at.is_some());
        assert_eq!(
            stored.payment.gateway.as_ref().and_then(|g| g.payment_id.as_deref()),
            Some("pay_1")
        );
    }

    #[tokio::test]
    async fn test_webhook_read_before_verify_is_noop() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        let before_verify = f.service.get_bill(bill.id).await.unwrap();

        let paid = verify(&f, &order.order_id, "pay_1").await;
        let (lagging, lagging_events) = lagging_service(&f, before_verify);

        let body = captured(&order.order_id, "pay_2");
        let signature = f.gateway.secrets().sign_webhook(&body).unwrap();
        let outcome = lagging.gateway_webhook(&body, Some(&signature)).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::AlreadyPaid(bill.id));
        assert_eq!(f.service.get_bill(bill.id).await.unwrap(), paid);
        assert!(lagging_events.events().is_empty());
    }

    #[tokio::test]
    async fn test_verify_read_before_owner_confirm_returns_stored_bill() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        let before_confirm = f.service.get_bill(bill.id).await.unwrap();

        let confirmed = f
            .service
            .owner_confirm(bill.id, f.owner.id, Some("UTR1".to_string()))
            .await
            .unwrap();
        let (lagging, lagging_events) = lagging_service(&f, before_confirm);

        let signature = f.gateway.secrets().sign_payment(&order.order_id, "pay_1");
        let returned = lagging
            .gateway_verify(GatewayConfirmation {
                order_id: order.order_id.clone(),
                payment_id: "pay_1".to_string(),
                signature,
            })
            .await
            .unwrap();

        assert_eq!(returned, confirmed);
        assert_eq!(f.service.get_bill(bill.id).await.unwrap(), confirmed);
        assert!(lagging_events.events().is_empty());
    }

    fn captured(order_id: &str, payment_id: &str) -> Vec<u8> {
        format!(
            r#"{{"event":"payment.captured","payload":{{"payment":{{"entity":{{"id":"{payment_id}","order_id":"{order_id}","method":"upi"}}}}}}}}"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_webhook_replay_is_idempotent() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();
        f.events.clear();

        let body = captured(&order.order_id, "pay_9");
        let signature = f.gateway.secrets().sign_webhook(&body).unwrap();

        let first = f.service.gateway_webhook(&body, Some(&signature)).await.unwrap();
        assert_eq!(first, WebhookOutcome::Settled(bill.id));
        let after_first = f.service.get_bill(bill.id).await.unwrap();
        assert_eq!(after_first.payment.gateway.as_ref().and_then(|g| g.method.as_deref()), Some("upi"));

        let second = f.service.gateway_webhook(&body, Some(&signature)).await.unwrap();
        assert_eq!(second, WebhookOutcome::AlreadyPaid(bill.id));
        assert_eq!(f.service.get_bill(bill.id).await.unwrap(), after_first);
        assert_eq!(f.events.events().len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_signature_checks() {
        let f = fixture(dec!(10)).await;
        let body = captured("order_x", "pay_x");

        let missing = f.service.gateway_webhook(&body, None).await;
        assert!(matches!(missing, Err(BillingError::SignatureInvalid)));

        let payment_secret_sig = f.gateway.secrets().sign_payment("order_x", "pay_x");
        let wrong = f.service.gateway_webhook(&body, Some(&payment_secret_sig)).await;
        assert!(matches!(wrong, Err(BillingError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_webhook_unknown_order_and_other_events() {
        let f = fixture(dec!(10)).await;
        let body = captured("order_nobody", "pay_1");
        let signature = f.gateway.secrets().sign_webhook(&body).unwrap();
        assert_eq!(
            f.service.gateway_webhook(&body, Some(&signature)).await.unwrap(),
            WebhookOutcome::UnknownOrder
        );

        let other = br#"{"event":"refund.created","payload":{}}"#;
        let signature = f.gateway.secrets().sign_webhook(other).unwrap();
        assert_eq!(
            f.service.gateway_webhook(other, Some(&signature)).await.unwrap(),
            WebhookOutcome::Ignored("refund.created".to_string())
        );
    }

    #[tokio::test]
    async fn test_webhook_failure_moves_pending_to_failed() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let order = f.service.create_gateway_order(bill.id).await.unwrap();

        let body = format!(
            r#"{{"event":"payment.failed","payload":{{"payment":{{"entity":{{"id":"pay_f","order_id":"{}"}}}}}}}}"#,
            order.order_id
        )
        .into_bytes();
        let signature = f.gateway.secrets().sign_webhook(&body).unwrap();

        let outcome = f.service.gateway_webhook(&body, Some(&signature)).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Failed(bill.id));
        let stored = f.service.get_bill(bill.id).await.unwrap();
        assert_eq!(stored.payment.status, PaymentStatus::Failed);
        assert_eq!(stored.status, BillStatus::Unpaid);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[tokio::test]
    async fn test_bill_view_has_upi_link_only_while_unpaid() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(50))).await.unwrap();

        let view = f.service.bill_view(bill.id).await.unwrap();
        let link = view.upi_link.unwrap();
        assert!(link.starts_with("upi://pay?pa=asha%40okbank&pn=Asha&am=500.00&cu=INR"));
        assert!(link.ends_with("tn=Electricity+Bill+2024-01"));
        assert_eq!(view.owner.unwrap().name, "Asha");
        assert_eq!(view.tenant.unwrap().unit_rate, dec!(10));

        f.service.owner_toggle_status(bill.id, f.owner.id).await.unwrap();
        assert!(f.service.bill_view(bill.id).await.unwrap().upi_link.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_last() {
        let f = fixture(dec!(10)).await;
        for (month, reading) in [("2024-01", dec!(10)), ("2024-02", dec!(20)), ("2024-03", dec!(35))] {
            f.service.create_bill(f.owner.id, request(month, reading)).await.unwrap();
        }

        let months: Vec<String> = f
            .service
            .list_bills(f.owner.id)
            .await
            .unwrap()
            .iter()
            .map(|b| b.month.to_string())
            .collect();
        assert_eq!(months, ["2024-03", "2024-02", "2024-01"]);

        let last = f.service.last_bill(f.owner.id).await.unwrap().unwrap();
        assert_eq!(last.month.to_string(), "2024-03");
        assert!(f.service.last_bill(OwnerId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_payment_status_view() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let status = f.service.payment_status(bill.id).await.unwrap();
        assert_eq!(status.bill_id, bill.id);
        assert_eq!(status.amount, dec!(100));
        assert_eq!(status.payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_render_statement_failure_is_external() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();

        let statement = f.service.render_statement(bill.id).await.unwrap();
        assert_eq!(statement.file_name, "MeterProof_Bill_2024-01.txt");

        f.statements.fail_next();
        let result = f.service.render_statement(bill.id).await;
        assert!(matches!(result, Err(BillingError::Statement(_))));
    }

    #[tokio::test]
    async fn test_mark_notified() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        f.service.mark_notified(bill.id).await.unwrap();

        let stored = f.service.get_bill(bill.id).await.unwrap();
        assert!(stored.sms_sent);
        assert!(stored.sms_sent_at.is_some());
        assert_eq!(stored.status, bill.status);
    }

    #[tokio::test]
    async fn test_save_from_earlier_read_keeps_notification_flags() {
        let f = fixture(dec!(10)).await;
        let bill = f.service.create_bill(f.owner.id, request("2024-01", dec!(10))).await.unwrap();
        let before_notify = f.service.get_bill(bill.id).await.unwrap();
        f.service.mark_notified(bill.id).await.unwrap();
        let notified_at = f.service.get_bill(bill.id).await.unwrap().sms_sent_at;

        let (lagging, _) = lagging_service(&f, before_notify.clone());
        lagging.tenant_confirm(bill.id).await.unwrap();
        let (lagging, _) = lagging_service(&f, before_notify);
        lagging.owner_toggle_status(bill.id, f.owner.id).await.unwrap();

        let stored = f.service.get_bill(bill.id).await.unwrap();
        assert_eq!(stored.status, BillStatus::Paid);
        assert!(stored.sms_sent);
        assert_eq!(stored.sms_sent_at, notified_at);
    }
}
