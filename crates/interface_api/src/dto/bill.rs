//! Bill DTOs

use serde::Deserialize;

/// Body of an owner confirmation; may be empty
#[derive(Debug, Default, Deserialize)]
pub struct OwnerConfirmRequest {
    #[serde(default, alias = "referenceId")]
    pub reference_id: Option<String>,
}
