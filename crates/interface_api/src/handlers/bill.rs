//! Bill handlers
//!
//! Listing, creation and the owner's status changes need a token. The
//! bill view, statement download and tenant confirmation are public and
//! reached through the link sent to the tenant.

use std::str::FromStr;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use core_kernel::BillId;
use domain_billing::{Bill, BillView, CreateBill, PhotoUpload};

use crate::auth::AuthOwner;
use crate::dto::bill::OwnerConfirmRequest;
use crate::{error::ApiError, AppState};

/// Largest accepted meter photo
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Bill history, newest month first
pub async fn list_bills(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
) -> Result<Json<Vec<Bill>>, ApiError> {
    Ok(Json(state.billing.list_bills(owner_id).await?))
}

/// Most recent bill, or `null`
pub async fn last_bill(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
) -> Result<Json<Option<Bill>>, ApiError> {
    Ok(Json(state.billing.last_bill(owner_id).await?))
}

/// Creates a bill from a multipart form
///
/// Fields: `month` (`YYYY-MM`), `currentReading`, the `currentPhoto`
/// file and an optional `revisionOf` bill id.
pub async fn create_bill(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Bill>), ApiError> {
    let request = read_bill_form(multipart).await?;
    let bill = state.billing.create_bill(owner_id, request).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

/// Public bill view with parties and UPI link
pub async fn view_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillView>, ApiError> {
    Ok(Json(state.billing.bill_view(BillId::from_uuid(id)).await?))
}

/// Downloadable statement
pub async fn download_statement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let statement = state.billing.render_statement(BillId::from_uuid(id)).await?;
    let disposition = format!("attachment; filename=\"{}\"", statement.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, statement.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        statement.bytes,
    )
        .into_response())
}

/// Owner flips the bill between PAID and UNPAID
pub async fn toggle_status(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<Bill>, ApiError> {
    Ok(Json(state.billing.owner_toggle_status(BillId::from_uuid(id), owner_id).await?))
}

/// Tenant reports a UPI payment
pub async fn tenant_confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bill>, ApiError> {
    Ok(Json(state.billing.tenant_confirm(BillId::from_uuid(id)).await?))
}

/// Owner confirms receipt, optionally with a reference id
pub async fn owner_confirm(
    State(state): State<AppState>,
    AuthOwner(owner_id): AuthOwner,
    Path(id): Path<Uuid>,
    body: Option<Json<OwnerConfirmRequest>>,
) -> Result<Json<Bill>, ApiError> {
    let reference_id = body
        .and_then(|Json(request)| request.reference_id)
        .filter(|r| !r.trim().is_empty());
    let bill = state
        .billing
        .owner_confirm(BillId::from_uuid(id), owner_id, reference_id)
        .await?;
    Ok(Json(bill))
}

async fn read_bill_form(mut multipart: Multipart) -> Result<CreateBill, ApiError> {
    let mut month = None;
    let mut reading = None;
    let mut photo = None;
    let mut revision_of = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "currentPhoto" | "current_photo" | "photo" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?.to_vec();
                photo = Some(PhotoUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "currentReading" | "current_reading" => reading = Some(field.text().await?),
            "month" => month = Some(field.text().await?),
            "revisionOf" | "revision_of" => revision_of = Some(field.text().await?),
            other => debug!(field = other, "Ignoring form field"),
        }
    }

    let reading = reading
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::Validation("currentReading is required".to_string()))?;
    let current_reading = Decimal::from_str(&reading)
        .map_err(|_| ApiError::Validation("currentReading must be a number".to_string()))?;

    let revision_of = revision_of
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .map(|r| {
            r.parse::<BillId>()
                .map_err(|_| ApiError::Validation("revisionOf must be a bill id".to_string()))
        })
        .transpose()?;

    Ok(CreateBill {
        month: month.unwrap_or_default(),
        current_reading,
        photo,
        revision_of,
    })
}
