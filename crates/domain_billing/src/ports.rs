//! Billing Domain Ports
//!
//! The billing service talks to persistence and to every external
//! collaborator through the traits in this module:
//!
//! - `BillStore`: bill persistence (PostgreSQL in `infra_db`)
//! - `PhotoStorage`: meter photo upload
//! - `StatementRenderer`: printable bill statement
//! - `PaymentGateway`: hosted checkout orders and signature checks
//! - `EventPublisher`: hand-off of committed events to the notification worker
//!
//! In-memory implementations live in [`mock`] behind the `mock` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{BillId, BillingMonth, Currency, DomainPort, OwnerId, PortError};

use crate::bill::Bill;
use crate::events::BillEvent;
use crate::view::{BillView, Statement};

/// Storage port for bills
///
/// `(owner_id, month)` is unique. Implementations must enforce this
/// atomically and report a violation from `insert` as
/// `PortError::Conflict`; the service's own pre-check is only a fast path.
#[async_trait]
pub trait BillStore: DomainPort {
    /// Inserts a new bill
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if the owner already has a bill for the month
    async fn insert(&self, bill: &Bill) -> Result<(), PortError>;

    /// Retrieves a bill by ID
    async fn get(&self, id: BillId) -> Result<Option<Bill>, PortError>;

    /// Finds the owner's bill for a month
    async fn find_by_owner_month(
        &self,
        owner_id: OwnerId,
        month: BillingMonth,
    ) -> Result<Option<Bill>, PortError>;

    /// Returns the owner's bill with the latest month
    async fn latest_for_owner(&self, owner_id: OwnerId) -> Result<Option<Bill>, PortError>;

    /// Lists the owner's bills, newest month first
    async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Bill>, PortError>;

    /// Finds the bill whose current gateway order has this id
    async fn find_by_gateway_order(&self, order_id: &str) -> Result<Option<Bill>, PortError>;

    /// Persists status and payment changes of an existing bill
    ///
    /// Notification flags are left as stored; only `mark_notified`
    /// writes them.
    async fn save(&self, bill: &Bill) -> Result<(), PortError>;

    /// Persists status and payment changes unless the stored bill is PAID
    ///
    /// The check and the write are a single atomic step. Tenant and
    /// gateway transitions go through here so a concurrent settlement is
    /// never overwritten.
    ///
    /// # Returns
    ///
    /// `false` if the stored bill was already PAID and nothing was written
    async fn save_unless_paid(&self, bill: &Bill) -> Result<bool, PortError>;

    /// Sets only the notification flags, leaving every other field alone
    async fn mark_notified(&self, id: BillId, at: DateTime<Utc>) -> Result<(), PortError>;
}

/// An uploaded meter photo
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Photo storage collaborator
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Stores a photo
    ///
    /// # Returns
    ///
    /// A stable URL for the stored photo
    async fn store(&self, photo: PhotoUpload) -> Result<String, PortError>;
}

/// Statement renderer collaborator
#[async_trait]
pub trait StatementRenderer: Send + Sync {
    /// Renders a statement for a fully-populated bill view
    async fn render(&self, view: &BillView) -> Result<Statement, PortError>;
}

/// Order request sent to the payment gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Minor units (paise)
    pub amount: i64,
    pub currency: Currency,
    /// Merchant receipt, `bill_<id>`
    pub receipt: String,
    pub bill_id: BillId,
}

/// Order created by the payment gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: Currency,
}

/// Payment gateway collaborator
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id for the checkout widget
    fn key_id(&self) -> &str;

    /// Creates a checkout order
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, PortError>;

    /// Verifies a checkout signature for an order/payment pair
    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Verifies a webhook signature over the raw body
    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool;
}

/// Publishes committed domain events
///
/// Publishing never fails the operation that produced the event;
/// implementations log delivery problems and move on.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: BillEvent);
}

/// In-memory implementations for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};
    use crate::signature::GatewaySecrets;

    /// In-memory bill store with a unique (owner, month) guard
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryBillStore {
        bills: Arc<RwLock<HashMap<BillId, Bill>>>,
    }

    impl InMemoryBillStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of stored bills
        pub async fn len(&self) -> usize {
            self.bills.read().await.len()
        }

        /// Stores a bill without any checks
        pub async fn put(&self, bill: Bill) {
            self.bills.write().await.insert(bill.id, bill);
        }
    }

    impl DomainPort for InMemoryBillStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryBillStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-bill-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl BillStore for InMemoryBillStore {
        async fn insert(&self, bill: &Bill) -> Result<(), PortError> {
            let mut bills = self.bills.write().await;
            if bills
                .values()
                .any(|b| b.owner_id == bill.owner_id && b.month == bill.month)
            {
                return Err(PortError::conflict(format!("bill for {} already exists", bill.month)));
            }
            bills.insert(bill.id, bill.clone());
            Ok(())
        }

        async fn get(&self, id: BillId) -> Result<Option<Bill>, PortError> {
            Ok(self.bills.read().await.get(&id).cloned())
        }

        async fn find_by_owner_month(
            &self,
            owner_id: OwnerId,
            month: BillingMonth,
        ) -> Result<Option<Bill>, PortError> {
            Ok(self
                .bills
                .read()
                .await
                .values()
                .find(|b| b.owner_id == owner_id && b.month == month)
                .cloned())
        }

        async fn latest_for_owner(&self, owner_id: OwnerId) -> Result<Option<Bill>, PortError> {
            Ok(self
                .bills
                .read()
                .await
                .values()
                .filter(|b| b.owner_id == owner_id)
                .max_by_key(|b| b.month)
                .cloned())
        }

        async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Bill>, PortError> {
            let mut bills: Vec<Bill> = self
                .bills
                .read()
                .await
                .values()
                .filter(|b| b.owner_id == owner_id)
                .cloned()
                .collect();
            bills.sort_by(|a, b| b.month.cmp(&a.month));
            Ok(bills)
        }

        async fn find_by_gateway_order(&self, order_id: &str) -> Result<Option<Bill>, PortError> {
            Ok(self
                .bills
                .read()
                .await
                .values()
                .find(|b| b.payment.order_id() == Some(order_id))
                .cloned())
        }

        async fn save(&self, bill: &Bill) -> Result<(), PortError> {
            let mut bills = self.bills.write().await;
            let stored = bills
                .get_mut(&bill.id)
                .ok_or_else(|| PortError::not_found("Bill", bill.id))?;
            overwrite_payment(stored, bill);
            Ok(())
        }

        async fn save_unless_paid(&self, bill: &Bill) -> Result<bool, PortError> {
            let mut bills = self.bills.write().await;
            let stored = bills
                .get_mut(&bill.id)
                .ok_or_else(|| PortError::not_found("Bill", bill.id))?;
            if stored.is_paid() {
                return Ok(false);
            }
            overwrite_payment(stored, bill);
            Ok(true)
        }

        async fn mark_notified(&self, id: BillId, at: DateTime<Utc>) -> Result<(), PortError> {
            let mut bills = self.bills.write().await;
            let bill = bills.get_mut(&id).ok_or_else(|| PortError::not_found("Bill", id))?;
            bill.mark_notified(at);
            Ok(())
        }
    }

    fn overwrite_payment(stored: &mut Bill, update: &Bill) {
        let (sms_sent, sms_sent_at) = (stored.sms_sent, stored.sms_sent_at);
        *stored = update.clone();
        stored.sms_sent = sms_sent;
        stored.sms_sent_at = sms_sent_at;
    }

    /// Photo storage that keeps uploads in memory
    #[derive(Debug, Default)]
    pub struct MockPhotoStorage {
        stored: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockPhotoStorage {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every following `store` call fail
        pub fn fail_next(&self) {
            self.fail.store(true, Ordering::SeqCst);
        }

        /// Number of photos stored
        pub fn stored(&self) -> usize {
            self.stored.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PhotoStorage for MockPhotoStorage {
        async fn store(&self, photo: PhotoUpload) -> Result<String, PortError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("photo storage"));
            }
            let n = self.stored.fetch_add(1, Ordering::SeqCst) + 1;
            let name = photo.file_name.unwrap_or_else(|| "photo.jpg".to_string());
            Ok(format!("memory://photos/{n}-{name}"))
        }
    }

    /// Renderer producing a small plain-text statement
    #[derive(Debug, Default)]
    pub struct MockStatementRenderer {
        fail: AtomicBool,
    }

    impl MockStatementRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next(&self) {
            self.fail.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StatementRenderer for MockStatementRenderer {
        async fn render(&self, view: &BillView) -> Result<Statement, PortError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::unavailable("statement renderer"));
            }
            let bill = &view.bill;
            Ok(Statement {
                file_name: bill.statement_file_name("txt"),
                content_type: "text/plain".to_string(),
                bytes: format!("{} {} {}", bill.statement_number(), bill.month, bill.amount).into_bytes(),
            })
        }
    }

    /// Gateway that signs with local secrets and numbers its orders
    #[derive(Debug)]
    pub struct MockPaymentGateway {
        secrets: GatewaySecrets,
        orders: AtomicUsize,
        requests: Mutex<Vec<OrderRequest>>,
    }

    impl MockPaymentGateway {
        pub fn new(secrets: GatewaySecrets) -> Self {
            Self {
                secrets,
                orders: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn secrets(&self) -> &GatewaySecrets {
            &self.secrets
        }

        /// Order requests received so far
        pub fn requests(&self) -> Vec<OrderRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockPaymentGateway {
        fn key_id(&self) -> &str {
            &self.secrets.key_id
        }

        async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, PortError> {
            let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
            let order = GatewayOrder {
                id: format!("order_mock{n}"),
                amount: request.amount,
                currency: request.currency,
            };
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            Ok(order)
        }

        fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
            self.secrets.verify_payment(order_id, payment_id, signature)
        }

        fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
            self.secrets.verify_webhook(body, signature)
        }
    }

    /// Publisher that records events in order
    #[derive(Debug, Default, Clone)]
    pub struct RecordingPublisher {
        events: Arc<Mutex<Vec<BillEvent>>>,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Events published so far
        pub fn events(&self) -> Vec<BillEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        pub fn clear(&self) {
            if let Ok(mut events) = self.events.lock() {
                events.clear();
            }
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: BillEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }
}
