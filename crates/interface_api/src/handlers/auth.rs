//! Owner account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, warn};
use validator::Validate;

use domain_party::{OwnerProfile, RegisterOwner};
use infra_external::notify::verification_email;

use crate::auth::{create_token, AuthOwner};
use crate::dto::auth::*;
use crate::{error::ApiError, AppState};

/// Registers an owner and returns a session token
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterOwner>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let registration = state.accounts.register(request).await?;
    let owner = &registration.owner;

    if state.config.email_config().is_configured() {
        let url = state.config.verify_email_url(&registration.verify_token);
        if let Err(e) = state.email.send(verification_email(&owner.email, &owner.name, &url)).await {
            warn!(owner_id = %owner.id, error = %e, "Verification email failed");
        }
    } else {
        debug!("Email not configured; verification email skipped");
    }

    let token = issue_token(&state, owner.id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Exchanges credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let owner = state.accounts.login(&request.email, &request.password).await?;
    let token = issue_token(&state, owner.id)?;
    Ok(Json(TokenResponse { token }))
}

/// Returns the signed-in owner
pub async fn me(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
) -> Result<Json<OwnerProfile>, ApiError> {
    let owner = state.accounts.get(owner_id).await?;
    Ok(Json(owner.profile()))
}

/// Consumes an email-verification token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<VerifyEmailResponse>, ApiError> {
    let owner = state.accounts.verify_email(&token).await?;
    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
        email_verified: owner.email_verified,
    }))
}

/// Sets the UPI id used by future bills
pub async fn set_upi_id(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
    Json(request): Json<SetUpiRequest>,
) -> Result<Json<OwnerProfile>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let owner = state.accounts.set_upi_id(owner_id, &request.upi_id).await?;
    Ok(Json(owner.profile()))
}

fn issue_token(state: &AppState, owner_id: core_kernel::OwnerId) -> Result<String, ApiError> {
    create_token(owner_id, &state.config.jwt_secret, state.config.jwt_expiration_secs)
        .map_err(|e| ApiError::Internal(e.to_string()))
}
