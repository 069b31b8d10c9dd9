//! Authentication
//!
//! Owners authenticate with a JWT whose subject is their owner id.
//! Tenants never authenticate; their endpoints are public and keyed by
//! bill id.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::OwnerId;

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (owner ID)
    pub sub: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Owner the token was issued to
    pub fn owner_id(&self) -> Result<OwnerId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token, authorization denied")]
    MissingToken,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token could not be issued")]
    Issue,
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `owner_id` - Owner the token identifies
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(owner_id: OwnerId, secret: &str, expiration_secs: u64) -> Result<String, AuthError> {
    let now = Utc::now();
    let lifetime = i64::try_from(expiration_secs).map_err(|_| AuthError::Issue)?;
    let exp = now + Duration::seconds(lifetime);

    let claims = Claims {
        sub: owner_id.as_uuid().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::Issue)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// The authenticated owner, placed in request extensions by the auth
/// middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOwner(pub OwnerId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthOwner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthOwner>()
            .copied()
            .ok_or(ApiError::Auth(AuthError::MissingToken))
    }
}
