//! Sandbox payment gateway
//!
//! Issues order ids locally and checks checkout and webhook signatures
//! with the configured secrets. It speaks the same signature scheme as
//! the hosted gateway, so callbacks signed with the real test keys verify
//! here too.

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

use core_kernel::PortError;
use domain_billing::{GatewayOrder, GatewaySecrets, OrderRequest, PaymentGateway};

/// Gateway adapter that creates orders without a network round trip
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    secrets: GatewaySecrets,
}

impl SandboxGateway {
    pub fn new(secrets: GatewaySecrets) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    fn key_id(&self) -> &str {
        &self.secrets.key_id
    }

    #[instrument(skip(self, request), fields(bill_id = %request.bill_id, amount = request.amount))]
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, PortError> {
        if request.amount <= 0 {
            return Err(PortError::validation_field("order amount must be positive", "amount"));
        }

        let order = GatewayOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount: request.amount,
            currency: request.currency,
        };
        info!(order_id = %order.id, receipt = %request.receipt, "Sandbox order created");
        Ok(order)
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        self.secrets.verify_payment(order_id, payment_id, signature)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        self.secrets.verify_webhook(body, signature)
    }
}
