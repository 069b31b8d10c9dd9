//! Gateway payment handlers
//!
//! All public. Checkout verification and webhooks are authenticated by
//! their HMAC signatures instead of a session.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::info;
use uuid::Uuid;

use core_kernel::BillId;
use domain_billing::{CheckoutOrder, GatewayConfirmation, PaymentStatusView};

use crate::dto::payment::*;
use crate::{error::ApiError, AppState};

/// Header carrying the webhook body signature
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Opens a gateway checkout for a bill
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CheckoutOrder>, ApiError> {
    let bill_id = request
        .bill_id
        .ok_or_else(|| ApiError::Validation("Bill ID is required".to_string()))?;
    Ok(Json(state.billing.create_gateway_order(BillId::from_uuid(bill_id)).await?))
}

/// Verifies the checkout callback and settles the bill
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let bill = state
        .billing
        .gateway_verify(GatewayConfirmation {
            order_id: request.order_id,
            payment_id: request.payment_id,
            signature: request.signature,
        })
        .await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: "Payment verified successfully".to_string(),
        bill,
    }))
}

/// Gateway webhook; the signature covers the raw body
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());
    let outcome = state.billing.gateway_webhook(&body, signature).await?;
    info!(outcome = ?outcome, "Webhook processed");
    Ok(Json(WebhookAck { status: "ok" }))
}

/// Payment state of a bill
pub async fn payment_status(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Result<Json<PaymentStatusView>, ApiError> {
    Ok(Json(state.billing.payment_status(BillId::from_uuid(bill_id)).await?))
}
