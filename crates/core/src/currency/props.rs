//! Property-based tests for currency operations.
//!
//! - Banker's rounding respects the target currency's minor unit
//! - Rate lookup falls back direct → inverse → triangulated

use approvalflow_shared::types::{Currency, Money};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::conversion::{convert_amount, convert_money};
use super::exchange::{ExchangeRate, RateLookupMethod, RateTable};

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

fn currency() -> impl Strategy<Value = Currency> {
    prop::sample::select(Currency::ALL.to_vec())
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (1u32..=28).prop_map(|d| NaiveDate::from_ymd_opt(2025, 10, d).unwrap_or_default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Converted money never carries more decimals than the target allows.
    #[test]
    fn prop_convert_respects_minor_unit(
        amount in positive_amount(),
        rate in positive_rate(),
        to in currency(),
    ) {
        let converted = convert_money(Money::new(amount, Currency::Usd), to, rate).unwrap();
        let dp = to.decimal_places();
        prop_assert_eq!(converted.currency, to);
        prop_assert_eq!(converted.amount, converted.amount.round_dp(dp));
    }

    /// Rounded conversion is within half a minor unit of the exact product.
    #[test]
    fn prop_rounding_error_bounded(
        amount in positive_amount(),
        rate in positive_rate(),
        dp in 0u32..=4,
    ) {
        let exact = amount * rate;
        let rounded = convert_amount(amount, rate, dp).unwrap();
        let half_unit = Decimal::new(5, dp + 1);
        prop_assert!((exact - rounded).abs() <= half_unit);
    }

    /// A stored direct rate is returned unchanged.
    #[test]
    fn prop_direct_rate_preferred(
        from in currency(),
        to in currency(),
        rate in positive_rate(),
        on in date(),
    ) {
        prop_assume!(from != to);
        let mut table = RateTable::new();
        table.insert(ExchangeRate::new(from, to, rate, on)).unwrap();
        table.insert(ExchangeRate::new(to, from, rate + Decimal::ONE, on)).unwrap();

        let quote = table.lookup(from, to, on).unwrap();
        prop_assert_eq!(quote.method, RateLookupMethod::Direct);
        prop_assert_eq!(quote.rate, rate);
    }

    /// Only the opposite direction stored: the inverted rate is used.
    #[test]
    fn prop_inverse_rate_fallback(
        from in currency(),
        to in currency(),
        rate in positive_rate(),
        on in date(),
    ) {
        prop_assume!(from != to);
        let mut table = RateTable::new();
        table.insert(ExchangeRate::new(to, from, rate, on)).unwrap();

        let quote = table.lookup(from, to, on).unwrap();
        prop_assert_eq!(quote.method, RateLookupMethod::Inverse);
        prop_assert_eq!(quote.rate, Decimal::ONE / rate);
    }

    /// Same currency always resolves to 1, even with an empty table.
    #[test]
    fn prop_same_currency_rate_one(c in currency(), on in date()) {
        let quote = RateTable::new().lookup(c, c, on).unwrap();
        prop_assert_eq!(quote.rate, Decimal::ONE);
    }
}
