//! API error handling
//!
//! Domain errors are converted here; each ends up as a status code and a
//! JSON body with a stable `error` code and a human-readable message.
//! Internal details are logged, never returned.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_billing::{BillingError, ErrorKind};
use domain_party::PartyError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payment verification failed")]
    SignatureInvalid,

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Auth(e) => (StatusCode::UNAUTHORIZED, "unauthorized", e.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::SignatureInvalid => (
                StatusCode::BAD_REQUEST,
                "signature_invalid",
                "Payment verification failed".to_string(),
            ),
            ApiError::ExternalService(msg) => {
                error!(error = %msg, "External service failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "external_service_error",
                    "External service failed".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Server error".to_string())
            }
        };

        let details = match &self {
            ApiError::Validation(msg) if msg.contains("; ") => {
                Some(msg.split("; ").map(str::to_string).collect())
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => ApiError::Validation(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::Unauthorized => ApiError::Unauthorized(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::SignatureInvalid => ApiError::SignatureInvalid,
            ErrorKind::ExternalService => ApiError::ExternalService(message),
            ErrorKind::Internal => ApiError::Internal(message),
        }
    }
}

impl From<PartyError> for ApiError {
    fn from(err: PartyError) -> Self {
        match err {
            PartyError::OwnerNotFound(_) => ApiError::NotFound("User not found".to_string()),
            PartyError::TenantNotFound => ApiError::NotFound(err.to_string()),
            PartyError::TenantExists | PartyError::DuplicateAccount(_) => ApiError::Conflict(err.to_string()),
            PartyError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            PartyError::InvalidVerificationToken => ApiError::Validation(err.to_string()),
            PartyError::InvalidData(msg) => ApiError::Validation(msg),
            PartyError::ValidationFailed(msg) => ApiError::Validation(msg),
            PartyError::Port(e) => e.into(),
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => ApiError::NotFound(format!("{entity_type} not found: {id}")),
            PortError::Validation { message, .. } => ApiError::Validation(message),
            PortError::Conflict { message } => ApiError::Conflict(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
