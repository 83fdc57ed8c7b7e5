//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Always round to the target currency's decimal places
//! - Use banker's rounding (round half to even)
//! - Keep both the original and the converted amount

use approvalflow_shared::types::{Currency, Money};
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use super::error::CurrencyError;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
/// Returns `None` if the product does not fit in a `Decimal`.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Option<Decimal> {
    let converted = amount.checked_mul(rate)?;
    Some(converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven))
}

/// Converts money into `to`, rounded to that currency's minor unit.
///
/// # Errors
/// `CurrencyError::Overflow` if the converted amount is out of range.
pub fn convert_money(money: Money, to: Currency, rate: Decimal) -> Result<Money, CurrencyError> {
    let amount = convert_amount(money.amount, rate, to.decimal_places())
        .ok_or(CurrencyError::Overflow { amount: money, to, rate })?;
    Ok(Money::new(amount, to))
}
