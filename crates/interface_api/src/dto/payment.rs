//! Payment DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_billing::Bill;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default, alias = "billId")]
    pub bill_id: Option<Uuid>,
}

/// Fields posted back by the checkout widget
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default, alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(default, alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(default, alias = "razorpay_signature")]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub bill: Bill,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
}
