//! bcrypt password hashing
//!
//! Hashing is CPU bound, so it runs on the blocking pool.

use async_trait::async_trait;
use tokio::task;

use core_kernel::PortError;
use domain_party::PasswordHasher;

/// Password hasher backed by bcrypt
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String, PortError> {
        let password = password.to_string();
        let cost = self.cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PortError::internal(format!("hashing task failed: {e}")))?
            .map_err(|e| PortError::internal(format!("bcrypt: {e}")))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, PortError> {
        let password = password.to_string();
        let hash = hash.to_string();
        task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| PortError::internal(format!("hashing task failed: {e}")))?
            .map_err(|e| PortError::internal(format!("bcrypt: {e}")))
    }
}
