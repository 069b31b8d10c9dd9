//! UPI deep-link builder
//!
//! Produces `upi://pay?pa=..&pn=..&am=..&cu=INR&tn=..`, the link format
//! understood by UPI payment apps. Parameters are form-encoded.

use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use crate::error::BillingError;

const DEFAULT_PAYEE: &str = "MeterProof Payment";
const DEFAULT_NOTE: &str = "Electricity Bill Payment";

/// Inputs for a UPI payment link
#[derive(Debug, Clone, Default)]
pub struct UpiRequest<'a> {
    pub upi_id: Option<&'a str>,
    pub payee_name: Option<&'a str>,
    pub amount: Option<Decimal>,
    pub note: Option<&'a str>,
}

/// Builds a UPI deep link
///
/// # Returns
///
/// The link, or `InvalidInput` when the UPI id is missing or the amount
/// is missing or not positive. The amount is written with exactly two
/// decimals.
pub fn build_upi_link(request: &UpiRequest<'_>) -> Result<String, BillingError> {
    let upi_id = request
        .upi_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BillingError::invalid("UPI ID and amount are required"))?;
    let amount = request
        .amount
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| BillingError::invalid("UPI ID and amount are required"))?;

    let payee = request.payee_name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_PAYEE);
    let note = request.note.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_NOTE);
    let amount = Money::inr(amount).to_fixed();

    let query = serde_urlencoded::to_string([
        ("pa", upi_id),
        ("pn", payee),
        ("am", amount.as_str()),
        ("cu", Currency::INR.code()),
        ("tn", note),
    ])
    .map_err(|e| BillingError::invalid(e.to_string()))?;

    Ok(format!("upi://pay?{query}"))
}
