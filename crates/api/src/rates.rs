//! Exchange rate client for conversion transactions.
//!
//! Rates come from an external HTTP API and are cached per currency pair.
//! Lookups never fail the mutation: any fetch problem falls back to a rate
//! of 1, and the caller records whatever rate was actually used on the
//! transaction row. The lookup happens before the mutation's atomic unit,
//! so a slow provider can delay a conversion but never hold a database
//! transaction open.

use std::collections::HashMap;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::warn;

use tally_core::currency::ExchangeRate;
use tally_shared::config::RatesConfig;

/// Default cache capacity (number of currency pairs).
const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Response shape of the rates provider.
#[derive(Debug, serde::Deserialize)]
struct RatesPayload {
    rates: HashMap<String, Decimal>,
}

/// Cached, fallback-on-failure exchange rate lookups.
#[derive(Clone)]
pub struct RateClient {
    http: reqwest::Client,
    cache: Cache<String, Decimal>,
    api_url: String,
}

impl RateClient {
    /// Creates a rate client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &RatesConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(DEFAULT_CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();

        Ok(Self {
            http,
            cache,
            api_url: config.api_url.clone(),
        })
    }

    /// Returns the rate from one currency to another.
    ///
    /// Same-currency lookups are always the identity rate. On any provider
    /// failure the fallback rate of 1 is returned (and logged); callers
    /// persist the rate they actually used, so a fallback is visible in
    /// the data.
    pub async fn rate(&self, from: &str, to: &str) -> ExchangeRate {
        if from.eq_ignore_ascii_case(to) {
            return ExchangeRate::identity(&from.to_uppercase());
        }

        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let key = format!("{from}->{to}");
        if let Some(rate) = self.cache.get(&key).await {
            return ExchangeRate::new(from, to, rate);
        }

        match self.fetch_rate(&from, &to).await {
            Some(rate) => {
                self.cache.insert(key, rate).await;
                ExchangeRate::new(from, to, rate)
            }
            None => {
                warn!(%from, %to, "Exchange rate lookup failed, falling back to 1");
                ExchangeRate::new(from, to, Decimal::ONE)
            }
        }
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let url = format!("{}/{from}", self.api_url);
        let response = self.http.get(&url).send().await.ok()?;
        let payload: RatesPayload = response.error_for_status().ok()?.json().await.ok()?;

        payload
            .rates
            .get(to)
            .copied()
            .filter(|rate| *rate > Decimal::ZERO)
    }
}

impl std::fmt::Debug for RateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RateClient {
        RateClient::new(&RatesConfig {
            api_url: "http://localhost:9".to_string(),
            timeout_ms: 50,
            cache_ttl_secs: 60,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_same_currency_is_identity() {
        let rates = client();
        let rate = rates.rate("USD", "usd").await;
        assert_eq!(rate.rate, Decimal::ONE);
        assert_eq!(rate.from_currency, rate.to_currency);
    }

    #[tokio::test]
    async fn test_unreachable_provider_falls_back_to_one() {
        let rates = client();
        let rate = rates.rate("USD", "IDR").await;
        assert_eq!(rate.rate, Decimal::ONE);
        assert_eq!(rate.from_currency, "USD");
        assert_eq!(rate.to_currency, "IDR");
    }
}
