//! SMS transport

use async_trait::async_trait;
use tracing::{debug, info};

use core_kernel::PortError;

/// SMS settings derived from the API configuration
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub enabled: bool,
    /// Sender number or id
    pub from: Option<String>,
    /// Prefix for numbers given without a leading `+`
    pub default_country: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from: None,
            default_country: "+91".to_string(),
        }
    }
}

impl SmsConfig {
    /// True when messages can actually be sent
    pub fn is_configured(&self) -> bool {
        self.enabled && self.from.as_deref().is_some_and(|f| !f.trim().is_empty())
    }

    /// Puts a mobile number in international form
    pub fn normalize_number(&self, mobile: &str) -> String {
        let mobile = mobile.trim();
        if mobile.starts_with('+') {
            mobile.to_string()
        } else {
            format!("{}{}", self.default_country, mobile)
        }
    }
}

/// Sends a text message to an international number
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), PortError>;
}

/// Transport that writes messages to the log
#[derive(Debug, Clone)]
pub struct LogSmsSender {
    config: SmsConfig,
}

impl LogSmsSender {
    pub fn new(config: SmsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), PortError> {
        info!(
            to = %to,
            from = self.config.from.as_deref().unwrap_or_default(),
            chars = body.chars().count(),
            "SMS dispatched"
        );
        debug!(body = %body, "SMS body");
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
pub use recording::RecordingSmsSender;

#[cfg(any(test, feature = "mock"))]
mod recording {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Transport that keeps every message for assertions
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSmsSender {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl RecordingSmsSender {
        pub fn new() -> Self {
            Self::default()
        }

        /// `(to, body)` pairs in send order
        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSmsSender {
        async fn send(&self, to: &str, body: &str) -> Result<(), PortError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((to.to_string(), body.to_string()));
            }
            Ok(())
        }
    }
}
