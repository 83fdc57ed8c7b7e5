//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g., 150.00).
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "USD", "INR").
    pub currency: Currency,
}

/// ISO 4217 currency codes accepted on expense claims and as company base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
    /// Indian Rupee
    Inr,
    /// UAE Dirham
    Aed,
    /// South Korean Won
    Krw,
    /// Canadian Dollar
    Cad,
    /// Australian Dollar
    Aud,
    /// Japanese Yen
    Jpy,
    /// Swiss Franc
    Chf,
    /// Singapore Dollar
    Sgd,
    /// Indonesian Rupiah
    Idr,
}

impl Currency {
    /// Every supported currency, in display order.
    pub const ALL: [Self; 12] = [
        Self::Usd,
        Self::Eur,
        Self::Gbp,
        Self::Inr,
        Self::Aed,
        Self::Krw,
        Self::Cad,
        Self::Aud,
        Self::Jpy,
        Self::Chf,
        Self::Sgd,
        Self::Idr,
    ];

    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Inr => "INR",
            Self::Aed => "AED",
            Self::Krw => "KRW",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
            Self::Jpy => "JPY",
            Self::Chf => "CHF",
            Self::Sgd => "SGD",
            Self::Idr => "IDR",
        }
    }

    /// Number of minor-unit decimal places used when rounding converted amounts.
    #[must_use]
    pub const fn decimal_places(&self) -> u32 {
        match self {
            Self::Jpy | Self::Krw => 0,
            _ => 2,
        }
    }
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            // Expense forms historically offered "rs" for rupees.
            "INR" | "RS" => Ok(Self::Inr),
            "AED" => Ok(Self::Aed),
            "KRW" => Ok(Self::Krw),
            "CAD" => Ok(Self::Cad),
            "AUD" => Ok(Self::Aud),
            "JPY" => Ok(Self::Jpy),
            "CHF" => Ok(Self::Chf),
            "SGD" => Ok(Self::Sgd),
            "IDR" => Ok(Self::Idr),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
