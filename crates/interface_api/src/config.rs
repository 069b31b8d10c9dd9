//! API configuration
//!
//! Loaded once at start-up from `API_*` environment variables. The
//! collaborator settings (gateway, SMS, email, photo storage) are derived
//! from it here and handed to the adapters by value.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use domain_billing::GatewaySecrets;
use infra_db::DatabaseConfig;
use infra_external::{EmailConfig, LocalStorageConfig, NotifierConfig, SmsConfig};

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    /// Seconds a request waits for a pooled connection
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
    /// Log level
    pub log_level: String,
    /// Base URL of the web app, used in SMS and email links
    pub frontend_url: String,
    /// Directory meter photos are written to
    pub photo_dir: String,
    /// Public base URL of this API, used to address stored photos
    pub public_base_url: String,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    /// Webhooks are rejected while this is unset
    pub gateway_webhook_secret: Option<String>,
    pub sms_enabled: bool,
    pub sms_from: Option<String>,
    pub sms_default_country: String,
    /// Email is disabled while this is unset
    pub email_from: Option<String>,
    /// Comma separated allowed origins; empty or `*` allows any
    pub cors_origins: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 360_000,
            database_url: "postgres://localhost/meterproof".to_string(),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
            db_idle_timeout_secs: 600,
            log_level: "info".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            photo_dir: "./uploads".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
            gateway_key_id: "rzp_test_key".to_string(),
            gateway_key_secret: "change-me".to_string(),
            gateway_webhook_secret: None,
            sms_enabled: false,
            sms_from: None,
            sms_default_country: "+91".to_string(),
            email_from: None,
            cors_origins: String::new(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins; empty means any
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "*")
            .map(str::to_string)
            .collect()
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            max_connections: self.db_max_connections,
            min_connections: self.db_min_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
            idle_timeout: Duration::from_secs(self.db_idle_timeout_secs),
            ..DatabaseConfig::new(self.database_url.clone())
        }
    }

    pub fn gateway_secrets(&self) -> GatewaySecrets {
        GatewaySecrets::new(
            self.gateway_key_id.clone(),
            self.gateway_key_secret.clone(),
            self.gateway_webhook_secret.clone(),
        )
    }

    pub fn sms_config(&self) -> SmsConfig {
        SmsConfig {
            enabled: self.sms_enabled,
            from: self.sms_from.clone(),
            default_country: self.sms_default_country.clone(),
        }
    }

    pub fn email_config(&self) -> EmailConfig {
        EmailConfig {
            from: self.email_from.clone(),
        }
    }

    pub fn storage_config(&self) -> LocalStorageConfig {
        LocalStorageConfig {
            root: PathBuf::from(&self.photo_dir),
            public_base_url: self.public_base_url.clone(),
        }
    }

    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            frontend_url: self.frontend_url.clone(),
            sms: self.sms_config(),
            email: self.email_config(),
        }
    }

    /// Link embedded in the verification email
    pub fn verify_email_url(&self, token: &str) -> String {
        format!("{}/verify-email/{}", self.frontend_url.trim_end_matches('/'), token)
    }
}
