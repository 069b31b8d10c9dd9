//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use core_kernel::BillingMonth;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for meter readings with one decimal place (0.0 to 99999.9)
pub fn reading_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|n| Decimal::new(n, 1))
}

/// Strategy for unit rates in rupees with paise (0.01 to 49.99)
pub fn unit_rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..5000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for a monotone chain of readings
///
/// Starts at zero and adds a non-negative increment per step.
pub fn reading_chain_strategy(len: usize) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(0i64..50_000i64, len).prop_map(|increments| {
        increments
            .into_iter()
            .scan(Decimal::ZERO, |total, step| {
                *total += Decimal::new(step, 1);
                Some(*total)
            })
            .collect()
    })
}

/// Strategy for `len` consecutive billing months
pub fn month_sequence_strategy(len: usize) -> impl Strategy<Value = Vec<BillingMonth>> {
    (2020i32..2030i32, 1u32..13u32).prop_map(move |(year, month)| {
        (0..len as u32)
            .filter_map(|offset| {
                let index = month - 1 + offset;
                BillingMonth::new(year + (index / 12) as i32, index % 12 + 1).ok()
            })
            .collect()
    })
}

/// Strategy for UPI ids
pub fn upi_id_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{2,12}", prop_oneof![Just("okbank"), Just("upi"), Just("ybl"), Just("paytm")])
        .prop_map(|(handle, bank)| format!("{handle}@{bank}"))
}

/// Strategy for Indian mobile numbers
pub fn mobile_strategy() -> impl Strategy<Value = String> {
    (6u32..10u32, 0u32..1_000_000_000u32).prop_map(|(lead, rest)| format!("{lead}{rest:09}"))
}

/// Strategy for generating names
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,10}".prop_map(|s| s)
}
