//! Gateway webhook payloads
//!
//! Only the fields the billing service acts on are decoded. The event
//! names are matched exactly.

use serde::Deserialize;

use crate::error::BillingError;

pub const PAYMENT_CAPTURED: &str = "payment.captured";
pub const PAYMENT_FAILED: &str = "payment.failed";

/// A decoded webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Captured {
        order_id: Option<String>,
        payment_id: String,
        method: Option<String>,
    },
    Failed {
        order_id: Option<String>,
        payment_id: String,
    },
    /// Any other event name; acknowledged and ignored
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Payload,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    payment: Option<Wrapped>,
}

#[derive(Debug, Deserialize)]
struct Wrapped {
    entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
    method: Option<String>,
}

/// Decodes a verified webhook body
pub fn parse(body: &[u8]) -> Result<WebhookEvent, BillingError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| BillingError::invalid(format!("malformed webhook payload: {e}")))?;

    match envelope.event.as_str() {
        PAYMENT_CAPTURED => {
            let payment = entity(&envelope.payload, PAYMENT_CAPTURED)?;
            Ok(WebhookEvent::Captured {
                order_id: payment.order_id.clone(),
                payment_id: payment.id.clone(),
                method: payment.method.clone(),
            })
        }
        PAYMENT_FAILED => {
            let payment = entity(&envelope.payload, PAYMENT_FAILED)?;
            Ok(WebhookEvent::Failed {
                order_id: payment.order_id.clone(),
                payment_id: payment.id.clone(),
            })
        }
        other => Ok(WebhookEvent::Other(other.to_string())),
    }
}

fn entity<'a>(payload: &'a Payload, event: &str) -> Result<&'a PaymentEntity, BillingError> {
    payload
        .payment
        .as_ref()
        .map(|p| &p.entity)
        .ok_or_else(|| BillingError::invalid(format!("{event} without payment entity")))
}
