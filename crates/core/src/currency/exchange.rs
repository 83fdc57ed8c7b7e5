//! Exchange rate types and lookup.

use approvalflow_shared::types::Currency;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::error::CurrencyError;

/// Currency used as the pivot for triangulated lookups.
pub const PIVOT_CURRENCY: Currency = Currency::Usd;

/// Exchange rate between two currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency.
    pub from_currency: Currency,
    /// Target currency.
    pub to_currency: Currency,
    /// Exchange rate (1 from_currency = rate to_currency).
    pub rate: Decimal,
    /// Date this rate is effective.
    pub effective_date: NaiveDate,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub const fn new(
        from_currency: Currency,
        to_currency: Currency,
        rate: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            from_currency,
            to_currency,
            rate,
            effective_date,
        }
    }

    /// Returns the inverse rate.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            from_currency: self.to_currency,
            to_currency: self.from_currency,
            rate: Decimal::ONE / self.rate,
            effective_date: self.effective_date,
        }
    }
}

/// How a rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLookupMethod {
    /// Same currency, rate 1.
    Identity,
    /// Stored rate in the requested direction.
    Direct,
    /// Stored rate in the opposite direction, inverted.
    Inverse,
    /// Combined through the pivot currency.
    Triangulated,
}

/// A resolved rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    /// 1 source unit = `rate` target units.
    pub rate: Decimal,
    /// How the rate was found.
    pub method: RateLookupMethod,
}

/// In-memory table of dated exchange rates.
///
/// For each currency pair the most recent rate effective on or before the
/// lookup date wins.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(Currency, Currency), BTreeMap<NaiveDate, Decimal>>,
}

impl RateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a rate, replacing any rate for the same pair and date.
    ///
    /// # Errors
    /// `CurrencyError::NonPositiveRate` if the rate is zero or negative.
    pub fn insert(&mut self, rate: ExchangeRate) -> Result<(), CurrencyError> {
        if rate.rate <= Decimal::ZERO {
            return Err(CurrencyError::NonPositiveRate {
                from: rate.from_currency,
                to: rate.to_currency,
                rate: rate.rate,
            });
        }
        self.rates
            .entry((rate.from_currency, rate.to_currency))
            .or_default()
            .insert(rate.effective_date, rate.rate);
        Ok(())
    }

    /// Number of stored rates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no rate is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a rate: identity, then direct, then inverse, then
    /// triangulated through [`PIVOT_CURRENCY`].
    #[must_use]
    pub fn lookup(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<RateQuote> {
        if from == to {
            return Some(RateQuote {
                rate: Decimal::ONE,
                method: RateLookupMethod::Identity,
            });
        }

        if let Some(rate) = self.best(from, to, date) {
            return Some(RateQuote {
                rate,
                method: RateLookupMethod::Direct,
            });
        }

        if let Some(rate) = self.best(to, from, date) {
            return Some(RateQuote {
                rate: Decimal::ONE.checked_div(rate)?,
                method: RateLookupMethod::Inverse,
            });
        }

        if from != PIVOT_CURRENCY && to != PIVOT_CURRENCY {
            let to_pivot = self.one_way(from, PIVOT_CURRENCY, date)?;
            let from_pivot = self.one_way(PIVOT_CURRENCY, to, date)?;
            return Some(RateQuote {
                rate: to_pivot.checked_mul(from_pivot)?,
                method: RateLookupMethod::Triangulated,
            });
        }

        None
    }

    /// Direct or inverse rate, without triangulation.
    fn one_way(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Decimal> {
        self.best(from, to, date)
            .or_else(|| self.best(to, from, date).and_then(|r| Decimal::ONE.checked_div(r)))
    }

    /// Most recent stored rate on or before `date`.
    fn best(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<Decimal> {
        self.rates
            .get(&(from, to))?
            .range(..=date)
            .next_back()
            .map(|(_, rate)| *rate)
    }
}
