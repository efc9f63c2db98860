use crate::{
    model::{AssetId, Currency},
    provider::{
        coincap::BASE_URL_COINCAP, coingecko::BASE_URL_COINGECKO,
        cryptocompare::BASE_URL_CRYPTOCOMPARE, hedera::BASE_URL_HEDERA_MIRROR,
    },
    rates::BASE_URL_EXCHANGE_RATE_API,
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};
use tracing::warn;
use url::Url;

/// Default asset universe used by top-by-market-cap queries and pollers.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "SOL", "BNB", "XRP", "ADA", "DOGE", "AVAX", "DOT", "LINK",
];

/// [`AggregationEngine`](crate::aggregator::AggregationEngine) configuration.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub target_currency: Currency,
    /// Upper bound on any single adapter call.
    pub provider_timeout: Duration,
    /// Reuse window for the exchange rate table before a refresh is attempted.
    pub rates_max_age: Duration,
    pub symbols: Vec<AssetId>,
    pub coingecko_url: Url,
    pub coincap_url: Url,
    pub cryptocompare_url: Url,
    pub hedera_mirror_url: Url,
    pub hedera_account_id: Option<String>,
    pub exchange_rate_url: Url,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            target_currency: Currency::usd(),
            provider_timeout: Duration::from_secs(10),
            rates_max_age: Duration::from_secs(3600),
            symbols: DEFAULT_SYMBOLS.iter().map(AssetId::new).collect(),
            coingecko_url: static_url(BASE_URL_COINGECKO),
            coincap_url: static_url(BASE_URL_COINCAP),
            cryptocompare_url: static_url(BASE_URL_CRYPTOCOMPARE),
            hedera_mirror_url: static_url(BASE_URL_HEDERA_MIRROR),
            hedera_account_id: None,
            exchange_rate_url: static_url(BASE_URL_EXCHANGE_RATE_API),
        }
    }
}

impl AggregatorConfig {
    /// Build a config from environment variables, falling back to [`Default`] per field.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `MARKET_DATA_TARGET_CURRENCY` | `USD` |
    /// | `MARKET_DATA_PROVIDER_TIMEOUT_MS` | `10000` |
    /// | `MARKET_DATA_RATES_MAX_AGE_SECS` | `3600` |
    /// | `MARKET_DATA_SYMBOLS` | [`DEFAULT_SYMBOLS`] |
    /// | `COINGECKO_URL`, `COINCAP_URL`, `CRYPTOCOMPARE_URL` | public endpoints |
    /// | `HEDERA_MIRROR_URL`, `EXCHANGE_RATE_URL` | public endpoints |
    /// | `HEDERA_ACCOUNT_ID` | unset |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            target_currency: lookup("MARKET_DATA_TARGET_CURRENCY")
                .filter(|code| !code.trim().is_empty())
                .map(Currency::new)
                .unwrap_or(default.target_currency),
            provider_timeout: parse_var(&lookup, "MARKET_DATA_PROVIDER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.provider_timeout),
            rates_max_age: parse_var(&lookup, "MARKET_DATA_RATES_MAX_AGE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.rates_max_age),
            symbols: lookup("MARKET_DATA_SYMBOLS")
                .map(|symbols| {
                    symbols
                        .split(',')
                        .map(str::trim)
                        .filter(|symbol| !symbol.is_empty())
                        .map(AssetId::new)
                        .collect::<Vec<_>>()
                })
                .filter(|symbols| !symbols.is_empty())
                .unwrap_or(default.symbols),
            coingecko_url: parse_var(&lookup, "COINGECKO_URL").unwrap_or(default.coingecko_url),
            coincap_url: parse_var(&lookup, "COINCAP_URL").unwrap_or(default.coincap_url),
            cryptocompare_url: parse_var(&lookup, "CRYPTOCOMPARE_URL")
                .unwrap_or(default.cryptocompare_url),
            hedera_mirror_url: parse_var(&lookup, "HEDERA_MIRROR_URL")
                .unwrap_or(default.hedera_mirror_url),
            hedera_account_id: lookup("HEDERA_ACCOUNT_ID")
                .filter(|account| !account.trim().is_empty())
                .or(default.hedera_account_id),
            exchange_rate_url: parse_var(&lookup, "EXCHANGE_RATE_URL")
                .unwrap_or(default.exchange_rate_url),
        }
    }
}

/// Parse an optional variable, logging and ignoring values that fail to parse.
fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, value = %raw, %error, "ignoring invalid configuration value");
            None
        }
    }
}

fn static_url(url: &'static str) -> Url {
    Url::parse(url).expect("static base url is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let actual = AggregatorConfig::from_lookup(lookup(&[]));
        assert_eq!(actual, AggregatorConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let actual = AggregatorConfig::from_lookup(lookup(&[
            ("MARKET_DATA_TARGET_CURRENCY", "eur"),
            ("MARKET_DATA_PROVIDER_TIMEOUT_MS", "2500"),
            ("MARKET_DATA_RATES_MAX_AGE_SECS", "60"),
            ("MARKET_DATA_SYMBOLS", "btc, eth ,,sol"),
            ("COINGECKO_URL", "http://localhost:8080/"),
            ("HEDERA_ACCOUNT_ID", "0.0.1234"),
        ]));

        assert_eq!(actual.target_currency, Currency::new("EUR"));
        assert_eq!(actual.provider_timeout, Duration::from_millis(2500));
        assert_eq!(actual.rates_max_age, Duration::from_secs(60));
        assert_eq!(
            actual.symbols,
            vec![AssetId::new("BTC"), AssetId::new("ETH"), AssetId::new("SOL")]
        );
        assert_eq!(actual.coingecko_url.as_str(), "http://localhost:8080/");
        assert_eq!(actual.hedera_account_id.as_deref(), Some("0.0.1234"));
    }

    #[test]
    fn test_from_lookup_ignores_invalid_values() {
        let actual = AggregatorConfig::from_lookup(lookup(&[
            ("MARKET_DATA_PROVIDER_TIMEOUT_MS", "soon"),
            ("COINCAP_URL", "not a url"),
            ("MARKET_DATA_SYMBOLS", " , "),
        ]));

        let default = AggregatorConfig::default();
        assert_eq!(actual.provider_timeout, default.provider_timeout);
        assert_eq!(actual.coincap_url, default.coincap_url);
        assert_eq!(actual.symbols, default.symbols);
    }
}
