//! Multi-currency handling and exchange rates.

pub mod conversion;
pub mod error;
pub mod exchange;
pub mod service;

#[cfg(test)]
mod props;

pub use conversion::{convert_amount, convert_money};
pub use error::CurrencyError;
pub use exchange::{ExchangeRate, PIVOT_CURRENCY, RateLookupMethod, RateQuote, RateTable};
pub use service::{CachedRates, Conversion, ExchangeRateService};
