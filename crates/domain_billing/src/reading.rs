//! Amount calculation
//!
//! Consumption is the difference between two meter readings and the
//! amount is consumption times the unit rate. Nothing is rounded here;
//! the stored amount is the exact product.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Money;
use crate::error::BillingError;

/// Computed consumption for one billing month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    /// current - previous
    pub units: Decimal,
    /// units x rate, unrounded
    pub amount: Decimal,
}

/// Computes units and amount
///
/// # Arguments
///
/// * `previous` - The preceding bill's current reading, or zero
/// * `current` - The reading being recorded
/// * `unit_rate` - Price per unit
///
/// # Returns
///
/// The consumption, or `InvalidReading` when `current < previous`
pub fn calculate(previous: Decimal, current: Decimal, unit_rate: Decimal) -> Result<Consumption, BillingError> {
    if current < previous {
        return Err(BillingError::InvalidReading { previous, current });
    }

    let units = current
        .checked_sub(previous)
        .ok_or_else(|| BillingError::Calculation("reading difference overflowed".to_string()))?;
    let amount = Money::inr(units)
        .checked_mul(unit_rate)
        .map_err(|e| BillingError::Calculation(e.to_string()))?
        .amount();

    Ok(Consumption { units, amount })
}
