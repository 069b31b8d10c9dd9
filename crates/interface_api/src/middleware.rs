//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::{validate_token, AuthError, AuthOwner};
use crate::error::ApiError;
use crate::AppState;

/// Alternative header carrying a bare token
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Authentication middleware
///
/// Accepts `Authorization: Bearer <jwt>` or `x-auth-token: <jwt>` and
/// places the owner in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        warn!("Missing or invalid Authorization header");
        return ApiError::Auth(AuthError::MissingToken).into_response();
    };

    match validate_token(&token, &state.config.jwt_secret).and_then(|claims| claims.owner_id()) {
        Ok(owner_id) => {
            request.extensions_mut().insert(AuthOwner(owner_id));
            next.run(request).await
        }
        Err(e) => {
            warn!(error = %e, "Token validation failed");
            ApiError::Auth(e).into_response()
        }
    }
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();
    let from_authorization = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    let from_token_header = || headers.get(TOKEN_HEADER).and_then(|h| h.to_str().ok());

    from_authorization
        .or_else(from_token_header)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Audit logging middleware
///
/// Logs every API request with the acting owner, if any
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_id = request
        .extensions()
        .get::<AuthOwner>()
        .map(|owner| owner.0.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        user = %user_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}
