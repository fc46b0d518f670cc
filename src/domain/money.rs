//! Monetary types for USD-denominated amounts.

use rust_decimal::{Decimal, RoundingStrategy};

/// USD amount represented as a Decimal for precision.
pub type Usd = Decimal;

/// Round a fee component to whole cents.
#[must_use]
pub fn round_cents(amount: Usd) -> Usd {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
