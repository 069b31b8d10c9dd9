//! Account DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetUpiRequest {
    /// Blank clears the UPI id
    #[serde(default)]
    #[validate(length(max = 100, message = "upi_id is too long"))]
    pub upi_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub email_verified: bool,
}
