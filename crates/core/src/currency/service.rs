//! Exchange-rate service interface and implementations.
//!
//! [`ExchangeRateService`] is the seam the expense store uses to snapshot
//! approved amounts in the company base currency. [`RateTable`] answers
//! from memory; [`CachedRates`] memoizes any other service with moka.

use std::sync::Arc;
use std::time::Duration;

use approvalflow_shared::types::{Currency, Money};
use chrono::NaiveDate;
use moka::sync::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::conversion::convert_money;
use super::error::CurrencyError;
use super::exchange::{RateQuote, RateTable};

/// Default cache capacity (number of currency pairs per day).
const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Default time-to-live for cached rates (1 hour).
const DEFAULT_TTL_SECS: u64 = 3600;

/// Result of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Amount in the target currency.
    pub amount: Money,
    /// Rate applied (1 source unit = rate target units).
    pub rate: Decimal,
}

/// Source of exchange rates.
pub trait ExchangeRateService: Send + Sync {
    /// Rate to convert `from` into `to` as of `on`.
    ///
    /// # Errors
    /// `CurrencyError::RateNotFound` if no rate resolves.
    fn rate(&self, from: Currency, to: Currency, on: NaiveDate) -> Result<RateQuote, CurrencyError>;

    /// Converts `amount` into `to` using the rate effective on `on`.
    ///
    /// Rounds to the target currency's decimal places with banker's rounding.
    ///
    /// # Errors
    /// Whatever [`ExchangeRateService::rate`] returns, or
    /// `CurrencyError::Overflow` if the result is out of range.
    fn convert(&self, amount: Money, to: Currency, on: NaiveDate) -> Result<Conversion, CurrencyError> {
        let quote = self.rate(amount.currency, to, on)?;
        Ok(Conversion {
            amount: convert_money(amount, to, quote.rate)?,
            rate: quote.rate,
        })
    }
}

impl ExchangeRateService for RateTable {
    fn rate(&self, from: Currency, to: Currency, on: NaiveDate) -> Result<RateQuote, CurrencyError> {
        self.lookup(from, to, on)
            .ok_or(CurrencyError::RateNotFound { from, to, date: on })
    }
}

impl<S: ExchangeRateService + ?Sized> ExchangeRateService for Arc<S> {
    fn rate(&self, from: Currency, to: Currency, on: NaiveDate) -> Result<RateQuote, CurrencyError> {
        (**self).rate(from, to, on)
    }
}

/// Caching decorator for an exchange-rate service.
///
/// Only successful lookups are cached, keyed by currency pair and date.
#[derive(Clone)]
pub struct CachedRates<S> {
    inner: S,
    cache: Cache<(Currency, Currency, NaiveDate), RateQuote>,
}

impl<S: ExchangeRateService> CachedRates<S> {
    /// Wraps `inner` with default settings.
    ///
    /// Default: 256 entries max, 1 hour TTL.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Wraps `inner` with a custom capacity and time-to-live.
    #[must_use]
    pub fn with_config(inner: S, max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, cache }
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl<S: ExchangeRateService> ExchangeRateService for CachedRates<S> {
    fn rate(&self, from: Currency, to: Currency, on: NaiveDate) -> Result<RateQuote, CurrencyError> {
        let key = (from, to, on);
        if let Some(quote) = self.cache.get(&key) {
            return Ok(quote);
        }

        let quote = self.inner.rate(from, to, on)?;
        self.cache.insert(key, quote);
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::exchange::{ExchangeRate, RateLookupMethod};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 4).unwrap()
    }

    fn table() -> RateTable {
        let mut table = RateTable::new();
        table
            .insert(ExchangeRate::new(Currency::Usd, Currency::Krw, dec!(1400), day()))
            .unwrap();
        table
            .insert(ExchangeRate::new(Currency::Gbp, Currency::Usd, dec!(1.25), day()))
            .unwrap();
        table
    }

    /// Counts calls to the wrapped table.
    struct Counting {
        table: RateTable,
        calls: AtomicUsize,
    }

    impl ExchangeRateService for Counting {
        fn rate(&self, from: Currency, to: Currency, on: NaiveDate) -> Result<RateQuote, CurrencyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.rate(from, to, on)
        }
    }

    #[test]
    fn test_convert_usd_to_krw() {
        let conversion = table()
            .convert(Money::new(dec!(150), Currency::Usd), Currency::Krw, day())
            .unwrap();
        assert_eq!(conversion.amount, Money::new(dec!(210000), Currency::Krw));
        assert_eq!(conversion.rate, dec!(1400));
    }

    #[test]
    fn test_convert_triangulated() {
        // 75.50 GBP * 1.25 * 1400 = 132,125 KRW
        let conversion = table()
            .convert(Money::new(dec!(75.50), Currency::Gbp), Currency::Krw, day())
            .unwrap();
        assert_eq!(conversion.amount.amount, dec!(132125));
    }

    #[test]
    fn test_convert_missing_rate() {
        let err = table()
            .convert(Money::new(dec!(10), Currency::Chf), Currency::Krw, day())
            .unwrap_err();
        assert!(matches!(err, CurrencyError::RateNotFound { from: Currency::Chf, .. }));
    }

    #[test]
    fn test_cache_hits_skip_inner() {
        let cached = CachedRates::new(Counting {
            table: table(),
            calls: AtomicUsize::new(0),
        });

        let first = cached.rate(Currency::Usd, Currency::Krw, day()).unwrap();
        let second = cached.rate(Currency::Usd, Currency::Krw, day()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.method, RateLookupMethod::Direct);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cached = CachedRates::with_config(
            Counting {
                table: table(),
                calls: AtomicUsize::new(0),
            },
            10,
            60,
        );

        assert!(cached.rate(Currency::Aed, Currency::Krw, day()).is_err());
        assert!(cached.rate(Currency::Aed, Currency::Krw, day()).is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);

        cached.run_pending_tasks();
        assert_eq!(cached.entry_count(), 0);
    }

    #[test]
    fn test_invalidate_all() {
        let cached = CachedRates::new(Counting {
            table: table(),
            calls: AtomicUsize::new(0),
        });
        cached.rate(Currency::Usd, Currency::Krw, day()).unwrap();
        cached.invalidate_all();
        cached.run_pending_tasks();
        cached.rate(Currency::Usd, Currency::Krw, day()).unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}
