//! Request validation
//!
//! Request structs derive `validator::Validate`; this module turns the
//! collected field errors into a single `PartyError::ValidationFailed`
//! with stable, human-readable messages.

use validator::{Validate, ValidationErrors};

use crate::error::PartyError;

/// Validates a request, collecting every failing field
///
/// # Returns
///
/// `Ok(())` when the request is valid, otherwise a `ValidationFailed`
/// error listing each failure as `field: message`, sorted by field name.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), PartyError> {
    request
        .validate()
        .map_err(|errors| PartyError::validation_failed(messages(&errors)))
}

fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: invalid ({})", e.code),
            })
        })
        .collect();
    messages.sort();
    messages
}
