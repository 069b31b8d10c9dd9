//! MeterProof - API Server Binary
//!
//! This binary starts the HTTP API server and the notification worker.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin meterproof-api
//!
//! # Run with environment variables
//! API_PORT=5000 API_DATABASE_URL=postgres://... cargo run --bin meterproof-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Bind address (default: 0.0.0.0:5000)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DB_MAX_CONNECTIONS` / `API_DB_MIN_CONNECTIONS` / `API_DB_ACQUIRE_TIMEOUT_SECS` / `API_DB_IDLE_TIMEOUT_SECS` - Pool sizing
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_FRONTEND_URL` - Web app base URL used in SMS and email links
//! * `API_PHOTO_DIR` / `API_PUBLIC_BASE_URL` - Photo storage
//! * `API_GATEWAY_KEY_ID` / `API_GATEWAY_KEY_SECRET` / `API_GATEWAY_WEBHOOK_SECRET` - Payment gateway
//! * `API_SMS_ENABLED` / `API_SMS_FROM` / `API_SMS_DEFAULT_COUNTRY` - SMS
//! * `API_EMAIL_FROM` - Email sender; email is off without it
//! * `API_CORS_ORIGINS` - Comma separated allowed origins

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::HealthCheckable;
use domain_billing::{BillingPorts, BillingService};
use domain_party::{AccountService, TenancyService};
use infra_db::{
    create_pool, run_migrations, PostgresBillStore, PostgresOwnerStore, PostgresTenantStore,
};
use infra_external::{
    ChannelPublisher, HtmlStatementRenderer, LocalPhotoStorage, LogEmailSender, LogSmsSender,
    NotificationWorker, SandboxGateway,
};
use interface_api::{config::ApiConfig, create_router, password::BcryptHasher, AppState};

const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting MeterProof API Server"
    );

    let pool = create_pool(config.database_config())
        .await
        .context("database connection failed")?;
    run_migrations(&pool).await.context("database migrations failed")?;

    tokio::fs::create_dir_all(&config.photo_dir)
        .await
        .with_context(|| format!("cannot create photo directory {}", config.photo_dir))?;

    let owners = Arc::new(PostgresOwnerStore::new(pool.clone()));
    let tenants = Arc::new(PostgresTenantStore::new(pool.clone()));
    let bills = Arc::new(PostgresBillStore::new(pool.clone()));

    let (publisher, events) = ChannelPublisher::channel();
    let billing = Arc::new(BillingService::new(BillingPorts {
        bills: bills.clone(),
        owners: owners.clone(),
        tenants: tenants.clone(),
        photos: Arc::new(LocalPhotoStorage::new(config.storage_config())),
        statements: Arc::new(HtmlStatementRenderer::new()),
        gateway: Arc::new(SandboxGateway::new(config.gateway_secrets())),
        events: Arc::new(publisher),
    }));

    let email = Arc::new(LogEmailSender::new(config.email_config()));
    let worker = NotificationWorker::new(
        billing.clone(),
        owners.clone(),
        tenants.clone(),
        Arc::new(LogSmsSender::new(config.sms_config())),
        email.clone(),
        config.notifier_config(),
    );
    let (stop_worker, worker_stop) = oneshot::channel::<()>();
    let worker_task = tokio::spawn(worker.run(events, async move {
        let _ = worker_stop.await;
    }));

    let state = AppState {
        config: config.clone(),
        accounts: Arc::new(AccountService::new(owners.clone(), Arc::new(BcryptHasher::default()))),
        tenancy: Arc::new(TenancyService::new(tenants.clone())),
        billing,
        email,
        health: vec![
            owners as Arc<dyn HealthCheckable>,
            tenants as Arc<dyn HealthCheckable>,
            bills as Arc<dyn HealthCheckable>,
        ],
    };
    let app = create_router(state);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_worker.send(());
    if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker_task).await.is_err() {
        tracing::warn!("Notification worker still draining at exit");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - The minimum log level to output (trace, debug, info, warn, error)
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
