//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are Chilean pesos (CLP), which have no minor unit. PayPal
//! does not settle in CLP, so checkout converts totals to USD with a
//! configured CLP-per-USD rate.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur during price conversion.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The exchange rate must be strictly positive.
    #[error("exchange rate must be greater than zero (got {0})")]
    InvalidRate(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (pesos, dollars).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a CLP price from a whole number of pesos.
    #[must_use]
    pub fn clp(pesos: i64) -> Self {
        Self::new(Decimal::from(pesos), CurrencyCode::CLP)
    }

    /// Convert to USD using a CLP-per-USD exchange rate.
    ///
    /// The result is rounded half away from zero to two decimals, which is
    /// what PayPal expects for a USD `value`. A price already in USD is
    /// returned unchanged.
    ///
    /// ```
    /// use pasteleria_core::{CurrencyCode, Price};
    /// use rust_decimal::Decimal;
    ///
    /// let usd = Price::clp(45_000).to_usd(Decimal::from(950)).unwrap();
    /// assert_eq!(usd.currency_code, CurrencyCode::USD);
    /// assert_eq!(usd.amount.to_string(), "47.37");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PriceError::InvalidRate` if `clp_per_usd` is zero or negative.
    pub fn to_usd(&self, clp_per_usd: Decimal) -> Result<Self, PriceError> {
        match self.currency_code {
            CurrencyCode::USD => Ok(*self),
            CurrencyCode::CLP => {
                if clp_per_usd <= Decimal::ZERO {
                    return Err(PriceError::InvalidRate(clp_per_usd));
                }
                let amount = (self.amount / clp_per_usd)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                Ok(Self::new(amount, CurrencyCode::USD))
            }
        }
    }

    /// Amount formatted for a payment provider (`"47.37"`, `"12990"`).
    #[must_use]
    pub fn to_provider_value(&self) -> String {
        let dp = self.currency_code.minor_units();
        let rounded = self
            .amount
            .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        #[allow(clippy::cast_possible_truncation)] // minor units are 0 or 2
        let prec = dp as usize;
        format!("{rounded:.prec$}")
    }

    /// Format for display (e.g., "$12.990" for CLP, "$12.99" for USD).
    #[must_use]
    pub fn display(&self) -> String {
        match self.currency_code {
            CurrencyCode::CLP => {
                let pesos = self
                    .amount
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
                let sign = if pesos.is_sign_negative() && !pesos.is_zero() {
                    "-"
                } else {
                    ""
                };
                let digits = pesos.abs().to_string();
                format!("{sign}${}", group_thousands(&digits, '.'))
            }
            CurrencyCode::USD => format!("${:.2}", self.amount),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.display(), self.currency_code.code())
    }
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Chilean peso (catalog currency).
    #[default]
    CLP,
    /// US dollar (PayPal settlement currency).
    USD,
}

impl CurrencyCode {
    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::CLP => "CLP",
            Self::USD => "USD",
        }
    }

    /// Number of decimal places in the currency's minor unit.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::CLP => 0,
            Self::USD => 2,
        }
    }

    /// Parse a case-insensitive ISO code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CLP" => Some(Self::CLP),
            "USD" => Some(Self::USD),
            _ => None,
        }
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}
