//! Exchange rate types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange rate between two currencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency code.
    pub from_currency: String,
    /// Target currency code.
    pub to_currency: String,
    /// Exchange rate (1 from_currency = rate to_currency).
    pub rate: Decimal,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub const fn new(from_currency: String, to_currency: String, rate: Decimal) -> Self {
        Self {
            from_currency,
            to_currency,
            rate,
        }
    }

    /// The identity rate for a same-currency pair.
    #[must_use]
    pub fn identity(currency: &str) -> Self {
        Self::new(currency.to_string(), currency.to_string(), Decimal::ONE)
    }

    /// Returns the inverse rate.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            from_currency: self.to_currency.clone(),
            to_currency: self.from_currency.clone(),
            rate: Decimal::ONE / self.rate,
        }
    }
}
