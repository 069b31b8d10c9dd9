//! Service Test Harness
//!
//! Wires `BillingService` and the party services to in-memory ports so
//! integration tests can drive whole flows and inspect every collaborator.

use std::sync::Arc;

use core_kernel::{HealthCheckable, OwnerId};
use domain_billing::{
    Bill, BillingPorts, BillingService, CreateBill, GatewaySecrets, InMemoryBillStore,
    MockPaymentGateway, MockPhotoStorage, MockStatementRenderer, RecordingPublisher,
};
use domain_party::{
    AccountService, MockOwnerStore, MockTenantStore, Owner, OwnerStore, PlainTextHasher,
    TenancyService, Tenant, TenantStore,
};
use rust_decimal::Decimal;

use crate::builders::CreateBillBuilder;
use crate::fixtures::{GatewayFixtures, PartyFixtures};

/// Billing service over mocks, with handles to each mock
pub struct TestHarness {
    pub owners: MockOwnerStore,
    pub tenants: MockTenantStore,
    pub bills: InMemoryBillStore,
    pub photos: Arc<MockPhotoStorage>,
    pub statements: Arc<MockStatementRenderer>,
    pub gateway: Arc<MockPaymentGateway>,
    pub events: RecordingPublisher,
    pub secrets: GatewaySecrets,
    pub billing: Arc<BillingService>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness with the fixture gateway secrets
    pub fn new() -> Self {
        Self::with_secrets(GatewayFixtures::secrets())
    }

    pub fn with_secrets(secrets: GatewaySecrets) -> Self {
        let owners = MockOwnerStore::new();
        let tenants = MockTenantStore::new();
        let bills = InMemoryBillStore::new();
        let photos = Arc::new(MockPhotoStorage::new());
        let statements = Arc::new(MockStatementRenderer::new());
        let gateway = Arc::new(MockPaymentGateway::new(secrets.clone()));
        let events = RecordingPublisher::new();

        let billing = Arc::new(BillingService::new(BillingPorts {
            bills: Arc::new(bills.clone()),
            owners: Arc::new(owners.clone()),
            tenants: Arc::new(tenants.clone()),
            photos: photos.clone(),
            statements: statements.clone(),
            gateway: gateway.clone(),
            events: Arc::new(events.clone()),
        }));

        Self {
            owners,
            tenants,
            bills,
            photos,
            statements,
            gateway,
            events,
            secrets,
            billing,
        }
    }

    /// Account service over the harness owner store
    pub fn accounts(&self) -> AccountService {
        AccountService::new(Arc::new(self.owners.clone()), Arc::new(PlainTextHasher))
    }

    /// Tenancy service over the harness tenant store
    pub fn tenancy(&self) -> TenancyService {
        TenancyService::new(Arc::new(self.tenants.clone()))
    }

    /// Stores probed by a readiness check
    pub fn health_checks(&self) -> Vec<Arc<dyn HealthCheckable>> {
        vec![
            Arc::new(self.owners.clone()) as Arc<dyn HealthCheckable>,
            Arc::new(self.bills.clone()) as Arc<dyn HealthCheckable>,
        ]
    }

    /// Stores an owner
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the owner
    pub async fn add_owner(&self, owner: &Owner) {
        self.owners.insert(owner).await.expect("owner insert");
    }

    /// Stores the fixture owner with a tenant billed at `unit_rate`
    ///
    /// Call once per harness; the fixture owner's email is fixed.
    pub async fn owner_with_tenant(&self, unit_rate: Decimal) -> (Owner, Tenant) {
        let owner = PartyFixtures::owner();
        self.add_owner(&owner).await;
        let tenant = PartyFixtures::tenant(owner.id, unit_rate);
        self.tenants.insert(&tenant).await.expect("tenant insert");
        (owner, tenant)
    }

    /// Creates a bill for `month` through the service
    ///
    /// # Panics
    ///
    /// Panics if the service rejects the bill
    pub async fn create_bill(&self, owner_id: OwnerId, month: &str, reading: Decimal) -> Bill {
        self.billing
            .create_bill(owner_id, CreateBillBuilder::new().month(month).reading(reading).build())
            .await
            .expect("bill creation")
    }

    /// Creates a bill from a prepared request
    pub async fn submit(&self, owner_id: OwnerId, request: CreateBill) -> Result<Bill, domain_billing::BillingError> {
        self.billing.create_bill(owner_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{assert_amount_exact, assert_gateway_paid, assert_reading_chain};
    use crate::generators::{
        mobile_strategy, month_sequence_strategy, name_strategy, reading_chain_strategy,
        reading_strategy, unit_rate_strategy, upi_id_strategy,
    };
    use domain_billing::{BillEvent, GatewayConfirmation};
    use domain_party::SetupTenant;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_monthly_chain() {
        let harness = TestHarness::new();
        let (owner, _) = harness.owner_with_tenant(dec!(8.5)).await;

        let bills = vec![
            harness.create_bill(owner.id, "2024-01", dec!(120)).await,
            harness.create_bill(owner.id, "2024-02", dec!(245.5)).await,
            harness.create_bill(owner.id, "2024-03", dec!(300)).await,
        ];

        assert_reading_chain(&bills);
        bills.iter().for_each(assert_amount_exact);
        assert_eq!(bills[1].units, dec!(125.5));
        assert_eq!(harness.photos.stored(), 3);
        assert_eq!(harness.bills.len().await, 3);
    }

    #[tokio::test]
    async fn test_gateway_settlement() {
        let harness = TestHarness::new();
        let (owner, _) = harness.owner_with_tenant(dec!(10)).await;
        let bill = harness.create_bill(owner.id, "2024-01", dec!(50)).await;

        let order = harness.billing.create_gateway_order(bill.id).await.unwrap();
        let signature = harness.secrets.sign_payment(&order.order_id, "pay_1");
        let paid = harness
            .billing
            .gateway_verify(GatewayConfirmation {
                order_id: order.order_id.clone(),
                payment_id: "pay_1".to_string(),
                signature,
            })
            .await
            .unwrap();

        assert_gateway_paid(&paid);
        assert!(harness
            .events
            .events()
            .iter()
            .any(|e| matches!(e, BillEvent::PaymentConfirmed { .. })));
    }

    #[tokio::test]
    async fn test_party_services_share_stores() {
        let harness = TestHarness::new();
        let (owner, tenant) = harness.owner_with_tenant(dec!(9)).await;

        let fetched = harness.tenancy().get(owner.id).await.unwrap();
        assert_eq!(fetched.id, tenant.id);
        let logged_in = harness
            .accounts()
            .login(crate::fixtures::StringFixtures::owner_email(), crate::fixtures::StringFixtures::owner_password())
            .await
            .unwrap();
        assert_eq!(logged_in.id, owner.id);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn consecutive_bills_chain_readings(
            (readings, months) in (1usize..8)
                .prop_flat_map(|n| (reading_chain_strategy(n), month_sequence_strategy(n))),
            rate in unit_rate_strategy(),
        ) {
            let bills = runtime().block_on(async {
                let harness = TestHarness::new();
                let (owner, _) = harness.owner_with_tenant(rate).await;
                let mut bills = Vec::new();
                for (month, reading) in months.iter().zip(&readings) {
                    bills.push(harness.create_bill(owner.id, &month.to_string(), *reading).await);
                }
                bills
            });

            prop_assert_eq!(bills.len(), readings.len());
            prop_assert_eq!(bills[0].previous_reading, Decimal::ZERO);
            for (bill, reading) in bills.iter().zip(&readings) {
                prop_assert_eq!(bill.current_reading, *reading);
                prop_assert_eq!(bill.unit_rate, rate);
            }
            assert_reading_chain(&bills);
            bills.iter().for_each(assert_amount_exact);
        }

        #[test]
        fn bill_view_pays_the_owners_upi_id(
            upi in upi_id_strategy(),
            name in name_strategy(),
            mobile in mobile_strategy(),
            reading in reading_strategy().prop_filter("billable", |r| *r > Decimal::ZERO),
            rate in unit_rate_strategy(),
        ) {
            let (bill, view) = runtime().block_on(async {
                let harness = TestHarness::new();
                let owner = crate::fixtures::PartyFixtures::owner_without_upi();
                harness.add_owner(&owner).await;
                harness.accounts().set_upi_id(owner.id, &upi).await.unwrap();
                harness
                    .tenancy()
                    .setup(owner.id, SetupTenant {
                        name: name.clone(),
                        mobile: Some(mobile.clone()),
                        unit_rate: rate,
                        language: None,
                    })
                    .await
                    .unwrap();
                let bill = harness.create_bill(owner.id, "2024-06", reading).await;
                let view = harness.billing.bill_view(bill.id).await.unwrap();
                (bill, view)
            });

            prop_assert_eq!(bill.payment.manual.upi_id.as_deref(), Some(upi.as_str()));
            let link = view.upi_link.unwrap_or_default();
            let expected_prefix = format!("upi://pay?pa={}&", upi.replace('@', "%40"));
            prop_assert!(link.starts_with(&expected_prefix), "link {}", link);
            let tenant = view.tenant.unwrap();
            prop_assert_eq!(tenant.name, name);
            prop_assert_eq!(tenant.mobile, Some(mobile));
        }
    }
}
