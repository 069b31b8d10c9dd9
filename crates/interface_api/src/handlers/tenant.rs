//! Tenant handlers

use axum::{extract::State, http::StatusCode, Json};

use domain_party::{SetupTenant, Tenant, UpdateTenant};

use crate::auth::AuthOwner;
use crate::{error::ApiError, AppState};

/// Sets up the owner's tenant
pub async fn setup_tenant(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
    Json(request): Json<SetupTenant>,
) -> Result<(StatusCode, Json<Tenant>), ApiError> {
    let tenant = state.tenancy.setup(owner_id, request).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// Gets the owner's tenant
pub async fn get_tenant(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
) -> Result<Json<Tenant>, ApiError> {
    Ok(Json(state.tenancy.get(owner_id).await?))
}

/// Updates rate, mobile or language
pub async fn update_tenant(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
    Json(request): Json<UpdateTenant>,
) -> Result<Json<Tenant>, ApiError> {
    Ok(Json(state.tenancy.update(owner_id, request).await?))
}
