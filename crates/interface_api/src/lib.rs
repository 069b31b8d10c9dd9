//! HTTP API Layer
//!
//! This crate provides the REST API for MeterProof using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for accounts, tenants, bills and payments
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response bodies that are not domain types
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod password;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use core_kernel::HealthCheckable;
use domain_billing::BillingService;
use domain_party::{AccountService, TenancyService};
use infra_external::EmailSender;

use crate::config::ApiConfig;
use crate::handlers::{auth as auth_handlers, bill, health, payment, tenant};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub accounts: Arc<AccountService>,
    pub tenancy: Arc<TenancyService>,
    pub billing: Arc<BillingService>,
    /// Sends verification emails at registration
    pub email: Arc<dyn EmailSender>,
    /// Stores probed by the readiness check
    pub health: Vec<Arc<dyn HealthCheckable>>,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Services and configuration shared by every handler
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Owner routes
    let owner_routes = Router::new()
        .route("/auth", get(auth_handlers::me))
        .route("/auth/upi", put(auth_handlers::set_upi_id))
        .route(
            "/tenant",
            post(tenant::setup_tenant)
                .get(tenant::get_tenant)
                .put(tenant::update_tenant),
        )
        .route(
            "/bill",
            get(bill::list_bills)
                .post(bill::create_bill)
                .layer(DefaultBodyLimit::max(bill::MAX_PHOTO_BYTES)),
        )
        .route("/bill/last", get(bill::last_bill))
        .route("/bill/:id/status", put(bill::toggle_status))
        .route("/bill/:id/owner-confirm", put(bill::owner_confirm))
        .route_layer(axum_middleware::from_fn(audit_middleware))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Tenant and gateway routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/verify-email/:token", get(auth_handlers::verify_email))
        .route("/bill/:id", get(bill::view_bill))
        .route("/bill/:id/statement", get(bill::download_statement))
        .route("/bill/:id/tenant-confirm", post(bill::tenant_confirm))
        .route("/payment/create-order", post(payment::create_order))
        .route("/payment/verify", post(payment::verify_payment))
        .route("/payment/webhook", post(payment::webhook))
        .route("/payment/status/:bill_id", get(payment::payment_status))
        .route_layer(axum_middleware::from_fn(audit_middleware));

    let cors = cors_layer(&state.config);
    let photos = ServeDir::new(&state.config.photo_dir);

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .nest("/api", owner_routes.merge(public_routes))
        .nest_service("/photos", photos)
        // Layers are applied innermost-first so the nesting matches
        // cors -> set request id -> propagate request id -> trace.
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
