//! Email transport and templates

use async_trait::async_trait;
use tracing::{debug, info};

use core_kernel::PortError;

use crate::statement::escape;

/// Email settings derived from the API configuration
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    /// Sender address; email is disabled without one
    pub from: Option<String>,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.from.as_deref().is_some_and(|f| !f.trim().is_empty())
    }
}

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Sends an HTML email
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), PortError>;
}

/// Transport that writes emails to the log
#[derive(Debug, Clone)]
pub struct LogEmailSender {
    config: EmailConfig,
}

impl LogEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), PortError> {
        info!(
            to = %message.to,
            from = self.config.from.as_deref().unwrap_or_default(),
            subject = %message.subject,
            "Email dispatched"
        );
        debug!(html = %message.html, "Email body");
        Ok(())
    }
}

/// Email asking a new owner to confirm their address
pub fn verification_email(to: &str, name: &str, verify_url: &str) -> EmailMessage {
    let html = format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:500px;margin:0 auto\">\
         <h2 style=\"color:#2563eb\">Welcome to MeterProof!</h2>\
         <p>Hi {name},</p>\
         <p>Please verify your email address to complete your registration.</p>\
         <a href=\"{url}\" style=\"display:inline-block;background:#2563eb;color:#fff;padding:12px 24px;\
         text-decoration:none;border-radius:8px\">Verify Email</a>\
         <p style=\"color:#666;font-size:14px\">This link expires in 24 hours.<br>\
         If you didn't create an account, please ignore this email.</p></div>",
        name = escape(name),
        url = escape(verify_url),
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Verify your email - MeterProof".to_string(),
        html,
    }
}

/// Email telling the owner a bill has been paid
pub fn payment_confirmed_email(to: &str, tenant_name: &str, amount: &str, month: &str) -> EmailMessage {
    let row = |label: &str, value: &str| {
        format!(
            "<tr><td style=\"padding:8px;border-bottom:1px solid #eee\"><strong>{label}:</strong></td>\
             <td style=\"padding:8px;border-bottom:1px solid #eee\">{}</td></tr>",
            escape(value)
        )
    };
    let html = format!(
        "<div style=\"font-family:Arial,sans-serif;max-width:500px;margin:0 auto\">\
         <h2 style=\"color:#16a34a\">Payment Confirmed</h2>\
         <p>Payment has been received from your tenant.</p>\
         <table style=\"width:100%;border-collapse:collapse;margin:16px 0\">{}{}{}</table>\
         <p style=\"color:#666;font-size:12px\">MeterProof</p></div>",
        row("Tenant", tenant_name),
        row("Amount", &format!("₹{amount}")),
        row("Month", month),
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Payment Confirmed - MeterProof".to_string(),
        html,
    }
}

#[cfg(any(test, feature = "mock"))]
pub use recording::RecordingEmailSender;

#[cfg(any(test, feature = "mock"))]
mod recording {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Transport that keeps every email for assertions
    #[derive(Debug, Clone, Default)]
    pub struct RecordingEmailSender {
        sent: Arc<Mutex<Vec<EmailMessage>>>,
    }

    impl RecordingEmailSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl EmailSender for RecordingEmailSender {
        async fn send(&self, message: EmailMessage) -> Result<(), PortError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(message);
            }
            Ok(())
        }
    }
}
