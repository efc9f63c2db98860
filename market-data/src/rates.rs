//! Currency conversion rates relative to one base currency.
//!
//! The [`ExchangeRateTable`] is shared by every component that converts prices. Readers take
//! an `Arc<RateSnapshot>` so a concurrent [`ExchangeRateTable::refresh`] is observed either
//! entirely or not at all.

use crate::{error::RateFetchError, model::Currency};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};
use url::Url;

/// Default [`ExchangeRateApi`] base url.
///
/// See docs: <https://www.exchangerate-api.com/docs/free>
pub const BASE_URL_EXCHANGE_RATE_API: &str = "https://open.er-api.com/v6/latest/";

/// Seed rates (units of currency per 1 USD) used until the first successful refresh.
pub const SEED_RATES_USD: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 149.5),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("CHF", 0.88),
    ("CNY", 7.24),
    ("INR", 83.1),
    ("KRW", 1330.0),
    ("BRL", 4.97),
];

/// Upper bound on how long [`ExchangeRateTable::refresh_if_stale`] waits after a failed
/// refresh before trying the source again. Shorter max ages shorten the wait to match.
pub const FAILED_REFRESH_BACKOFF: Duration = Duration::from_secs(60);

/// External source of a complete rate table.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch units-of-currency per one unit of `base` for every supported currency.
    async fn fetch(&self, base: &Currency) -> Result<FnvHashMap<Currency, f64>, RateFetchError>;
}

/// Immutable view of the rate table at one point in time.
#[derive(Clone, PartialEq, Debug)]
pub struct RateSnapshot {
    pub base: Currency,
    rates: FnvHashMap<Currency, f64>,
    /// `None` while still on the seed table.
    pub updated: Option<DateTime<Utc>>,
}

impl RateSnapshot {
    /// Build a validated snapshot. The base rate is pinned to exactly 1.
    pub fn new(
        base: Currency,
        mut rates: FnvHashMap<Currency, f64>,
        updated: Option<DateTime<Utc>>,
    ) -> Result<Self, RateFetchError> {
        if let Some((currency, rate)) = rates
            .iter()
            .find(|(currency, rate)| **currency != base && !(rate.is_finite() && **rate > 0.0))
        {
            return Err(RateFetchError::Invalid {
                currency: currency.to_string(),
                rate: *rate,
            });
        }

        rates.insert(base.clone(), 1.0);
        Ok(Self {
            base,
            rates,
            updated,
        })
    }

    /// Seed snapshot built from [`SEED_RATES_USD`].
    pub fn seed() -> Self {
        Self {
            base: Currency::usd(),
            rates: SEED_RATES_USD
                .iter()
                .map(|(code, rate)| (Currency::new(code), *rate))
                .collect(),
            updated: None,
        }
    }

    /// Rate for `currency`, degrading to the base currency rate (1) when unknown.
    pub fn rate(&self, currency: &Currency) -> f64 {
        self.rates.get(currency).copied().unwrap_or(1.0)
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.rates.contains_key(currency)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Convert `amount` from one currency to another via the base currency.
    pub fn convert(&self, amount: f64, from: &Currency, to: &Currency) -> f64 {
        if from == to {
            return amount;
        }
        amount / self.rate(from) * self.rate(to)
    }

    fn is_stale(&self, max_age: Duration) -> bool {
        match self.updated {
            None => true,
            Some(updated) => {
                let age = Utc::now().signed_duration_since(updated);
                age.to_std().map(|age| age > max_age).unwrap_or(false)
            }
        }
    }
}

/// Process-wide currency conversion table, refreshed on demand from a [`RateSource`].
pub struct ExchangeRateTable {
    snapshot: RwLock<Arc<RateSnapshot>>,
    source: Arc<dyn RateSource>,
    max_age: Duration,
    /// Serialises refreshes and holds the time of the last failed attempt.
    refresh_lock: tokio::sync::Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ExchangeRateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRateTable")
            .field("snapshot", &self.snapshot.read())
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl ExchangeRateTable {
    /// Construct a table holding the seed rates, refreshed from `source`.
    pub fn new(source: Arc<dyn RateSource>, max_age: Duration) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RateSnapshot::seed())),
            source,
            max_age,
            refresh_lock: tokio::sync::Mutex::new(None),
        }
    }

    /// Current consistent view of every rate.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn base(&self) -> Currency {
        self.snapshot().base.clone()
    }

    /// See [`RateSnapshot::rate`].
    pub fn rate(&self, currency: &Currency) -> f64 {
        self.snapshot().rate(currency)
    }

    /// See [`RateSnapshot::convert`].
    pub fn convert(&self, amount: f64, from: &Currency, to: &Currency) -> f64 {
        self.snapshot().convert(amount, from, to)
    }

    /// Fetch a complete table and swap it in. On error the existing table is untouched.
    pub async fn refresh(&self) -> Result<(), RateFetchError> {
        let mut last_failure = self.refresh_lock.lock().await;
        self.refresh_locked(&mut last_failure).await
    }

    /// Refresh only if the current table is older than the configured max age, returning the
    /// snapshot to use. Refresh failures are logged and the stale table is returned; after a
    /// failure the source is not retried until the backoff window has passed.
    pub async fn refresh_if_stale(&self) -> Arc<RateSnapshot> {
        if self.snapshot().is_stale(self.max_age) {
            let mut last_failure = self.refresh_lock.lock().await;

            // Another caller may have refreshed while we waited
            if !self.snapshot().is_stale(self.max_age) {
                return self.snapshot();
            }

            let backoff = self.max_age.min(FAILED_REFRESH_BACKOFF);
            if last_failure.is_some_and(|failed| failed.elapsed() < backoff) {
                debug!(?backoff, "exchange rate refresh recently failed, using stale rates");
            } else if let Err(error) = self.refresh_locked(&mut last_failure).await {
                warn!(%error, "exchange rate refresh failed, continuing with stale rates");
            }
        }
        self.snapshot()
    }

    async fn refresh_locked(
        &self,
        last_failure: &mut Option<Instant>,
    ) -> Result<(), RateFetchError> {
        let base = self.base();
        let fetched = self.source.fetch(&base).await;
        let next = fetched.and_then(|rates| RateSnapshot::new(base, rates, Some(Utc::now())));

        match next {
            Ok(next) => {
                info!(currencies = next.len(), base = %next.base, "exchange rates refreshed");
                *self.snapshot.write() = Arc::new(next);
                *last_failure = None;
                Ok(())
            }
            Err(error) => {
                *last_failure = Some(Instant::now());
                Err(error)
            }
        }
    }
}

/// [`RateSource`] backed by the open ExchangeRate-API `latest/{base}` endpoint.
#[derive(Clone, Debug)]
pub struct ExchangeRateApi {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    result: String,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
    #[serde(default)]
    rates: FnvHashMap<String, f64>,
}

impl ExchangeRateApi {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn parse(payload: &str) -> Result<FnvHashMap<Currency, f64>, RateFetchError> {
        let response = serde_json::from_str::<ExchangeRateResponse>(payload)
            .map_err(|error| RateFetchError::Parse(error.to_string()))?;

        if response.result != "success" {
            return Err(RateFetchError::Rejected(
                response.error_type.unwrap_or(response.result),
            ));
        }

        Ok(response
            .rates
            .into_iter()
            .map(|(code, rate)| (Currency::new(code), rate))
            .collect())
    }
}

#[async_trait]
impl RateSource for ExchangeRateApi {
    async fn fetch(&self, base: &Currency) -> Result<FnvHashMap<Currency, f64>, RateFetchError> {
        let url = self
            .base_url
            .join(base.as_str())
            .map_err(|error| RateFetchError::Request(error.to_string()))?;

        debug!(%url, "fetching exchange rates");
        let payload = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Self::parse(&payload)
    }
}
