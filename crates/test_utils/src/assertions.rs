//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_billing::{Bill, BillStatus, PaymentStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are equal in currency and exact amount
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ at all
pub fn assert_money_exact(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Money amounts differ: actual={}, expected={}",
        actual.amount(),
        expected.amount()
    );
}

/// Asserts that a bill's amount is exactly `units * unit_rate`
pub fn assert_amount_exact(bill: &Bill) {
    assert_eq!(
        bill.units,
        bill.current_reading - bill.previous_reading,
        "Bill {} units {} do not match readings {} -> {}",
        bill.id,
        bill.units,
        bill.previous_reading,
        bill.current_reading
    );
    assert_eq!(
        bill.amount,
        bill.units * bill.unit_rate,
        "Bill {} amount {} is not {} x {}",
        bill.id,
        bill.amount,
        bill.units,
        bill.unit_rate
    );
}

/// Asserts that each bill starts where the previous one ended
///
/// `bills` must be in creation order.
pub fn assert_reading_chain(bills: &[Bill]) {
    for pair in bills.windows(2) {
        assert_eq!(
            pair[1].previous_reading, pair[0].current_reading,
            "Reading chain broken between {} ({}) and {} ({})",
            pair[0].month, pair[0].current_reading, pair[1].month, pair[1].previous_reading
        );
    }
    if let Some(first) = bills.first() {
        assert!(
            first.previous_reading >= Decimal::ZERO,
            "First bill starts below zero: {}",
            first.previous_reading
        );
    }
}

/// Asserts that a bill is settled on both status axes
pub fn assert_paid(bill: &Bill) {
    assert_eq!(bill.status, BillStatus::Paid, "Bill {} status", bill.id);
    assert_eq!(bill.payment.status, PaymentStatus::Paid, "Bill {} payment status", bill.id);
}

/// Asserts that a bill was settled through the gateway
pub fn assert_gateway_paid(bill: &Bill) {
    assert_paid(bill);
    assert!(bill.payment.paid_at.is_some(), "Bill {} has no paid_at", bill.id);
    assert!(
        bill.payment.gateway.as_ref().and_then(|g| g.payment_id.as_ref()).is_some(),
        "Bill {} has no gateway payment id",
        bill.id
    );
}

/// Asserts that a bill is still open
pub fn assert_unpaid(bill: &Bill) {
    assert_eq!(bill.status, BillStatus::Unpaid, "Bill {} status", bill.id);
    assert_ne!(bill.payment.status, PaymentStatus::Paid, "Bill {} payment status", bill.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::TestBillBuilder;
    use crate::fixtures::MoneyFixtures;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_money_exact() {
        assert_money_exact(&MoneyFixtures::inr_500(), &Money::inr(dec!(500.00)));
    }

    #[test]
    #[should_panic(expected = "Money amounts differ")]
    fn test_assert_money_exact_rejects_rounding() {
        assert_money_exact(&MoneyFixtures::inr_half_paisa(), &Money::inr(dec!(22.01)));
    }

    #[test]
    fn test_reading_chain() {
        let bills = vec![
            TestBillBuilder::new().with_readings(dec!(0), dec!(40)).build(),
            TestBillBuilder::new().with_readings(dec!(40), dec!(95.5)).build(),
        ];
        assert_reading_chain(&bills);
        bills.iter().for_each(assert_amount_exact);
    }

    #[test]
    #[should_panic(expected = "Reading chain broken")]
    fn test_reading_chain_gap() {
        let bills = vec![
            TestBillBuilder::new().with_readings(dec!(0), dec!(40)).build(),
            TestBillBuilder::new().with_readings(dec!(41), dec!(50)).build(),
        ];
        assert_reading_chain(&bills);
    }

    #[test]
    fn test_paid_and_unpaid() {
        assert_unpaid(&TestBillBuilder::new().build());
        assert_paid(&TestBillBuilder::new().paid().build());
    }
}
