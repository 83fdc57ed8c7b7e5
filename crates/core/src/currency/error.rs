//! Currency error types.

use approvalflow_shared::AppError;
use approvalflow_shared::types::{Currency, Money};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by exchange-rate lookup and conversion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CurrencyError {
    /// A stored rate must be strictly positive.
    #[error("Exchange rate {from}->{to} must be positive, got {rate}")]
    NonPositiveRate {
        /// Source currency.
        from: Currency,
        /// Target currency.
        to: Currency,
        /// The offending rate.
        rate: Decimal,
    },

    /// No direct, inverse or triangulated rate exists.
    #[error("No exchange rate {from}->{to} effective on {date}")]
    RateNotFound {
        /// Source currency.
        from: Currency,
        /// Target currency.
        to: Currency,
        /// Lookup date.
        date: NaiveDate,
    },

    /// The converted amount does not fit in a `Decimal`.
    #[error("Converting {amount} to {to} at rate {rate} overflows")]
    Overflow {
        /// Amount being converted.
        amount: Money,
        /// Target currency.
        to: Currency,
        /// Rate applied.
        rate: Decimal,
    },

    /// The rate source could not be reached.
    #[error("Exchange rate source unavailable: {0}")]
    SourceUnavailable(String),
}

impl CurrencyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NonPositiveRate { .. } => 400,
            Self::RateNotFound { .. } => 404,
            Self::Overflow { .. } => 422,
            Self::SourceUnavailable(_) => 502,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveRate { .. } => "INVALID_EXCHANGE_RATE",
            Self::RateNotFound { .. } => "EXCHANGE_RATE_NOT_FOUND",
            Self::Overflow { .. } => "CONVERSION_OVERFLOW",
            Self::SourceUnavailable(_) => "EXCHANGE_RATE_UNAVAILABLE",
        }
    }
}

impl From<CurrencyError> for AppError {
    fn from(err: CurrencyError) -> Self {
        let message = err.to_string();
        match err {
            CurrencyError::NonPositiveRate { .. } => Self::Validation(message),
            CurrencyError::RateNotFound { .. } => Self::NotFound(message),
            CurrencyError::Overflow { .. } => Self::BusinessRule(message),
            CurrencyError::SourceUnavailable(_) => Self::ExternalService(message),
        }
    }
}
