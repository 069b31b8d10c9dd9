//! Gateway signature verification
//!
//! The gateway signs a completed checkout as
//! `hex(HMAC-SHA256(key_secret, "<order_id>|<payment_id>"))` and each
//! webhook as `hex(HMAC-SHA256(webhook_secret, raw_body))`. The two
//! secrets are distinct. Comparison is constant time.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Gateway credentials, loaded once at start-up
#[derive(Clone, Deserialize)]
pub struct GatewaySecrets {
    /// Public key id, handed to the checkout widget
    pub key_id: String,
    /// Secret for checkout signatures
    pub key_secret: String,
    /// Secret for webhook signatures; without it no webhook verifies
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for GatewaySecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySecrets")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GatewaySecrets {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>, webhook_secret: Option<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
        }
    }

    /// Checks a checkout signature for an order/payment pair
    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        if self.key_secret.is_empty() {
            return false;
        }
        let message = format!("{order_id}|{payment_id}");
        matches(&sign(&self.key_secret, message.as_bytes()), signature)
    }

    /// Checks a webhook signature over the raw request body
    pub fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        match self.webhook_secret.as_deref() {
            Some(secret) => matches(&sign(secret, body), signature),
            None => {
                tracing::warn!("Webhook secret not configured; rejecting webhook");
                false
            }
        }
    }

    /// Produces the checkout signature the gateway would send
    pub fn sign_payment(&self, order_id: &str, payment_id: &str) -> String {
        sign(&self.key_secret, format!("{order_id}|{payment_id}").as_bytes())
    }

    /// Produces the webhook signature the gateway would send
    pub fn sign_webhook(&self, body: &[u8]) -> Option<String> {
        self.webhook_secret.as_deref().map(|secret| sign(secret, body))
    }
}

/// Hex-encoded HMAC-SHA256
pub fn sign(secret: &str, message: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn matches(expected: &str, provided: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(provided.trim().as_bytes()))
}
