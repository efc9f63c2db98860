//! Concurrent multi-provider aggregation with priority merge and fallback.

use crate::{
    catalog,
    config::AggregatorConfig,
    error::ProviderError,
    fallback::fallback_records,
    model::{AssetId, Currency, MarketRecord, ProviderId, RawRecord},
    provider::{ProviderAdapter, ProviderPriority, SymbolSet, default_adapters},
    rates::{ExchangeRateApi, ExchangeRateTable, RateSnapshot},
};
use fnv::FnvHashMap;
use futures::future::join_all;
use indexmap::IndexMap;
use std::{cmp::Ordering, sync::Arc};
use tracing::{debug, info, warn};

/// Outcome of one adapter call, kept per provider until the merge.
pub type ProviderOutcome = (ProviderId, Result<Vec<RawRecord>, ProviderError>);

/// Fans requests out to every registered [`ProviderAdapter`], merges same-asset records by
/// [`ProviderPriority`] and normalises them into one target currency.
pub struct AggregationEngine {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    priority: ProviderPriority,
    rates: Arc<ExchangeRateTable>,
    config: AggregatorConfig,
}

impl std::fmt::Debug for AggregationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationEngine")
            .field(
                "adapters",
                &self.adapters.iter().map(|adapter| adapter.id()).collect::<Vec<_>>(),
            )
            .field("priority", &self.priority)
            .field("rates", &self.rates)
            .field("config", &self.config)
            .finish()
    }
}

impl AggregationEngine {
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        priority: ProviderPriority,
        rates: Arc<ExchangeRateTable>,
        config: AggregatorConfig,
    ) -> Self {
        let mut seen = Vec::with_capacity(adapters.len());
        for adapter in &adapters {
            let id = adapter.id();
            if !priority.contains(&id) {
                warn!(provider = %id, "provider missing from priority list, ranks lowest");
            }
            if seen.contains(&id) {
                warn!(provider = %id, "provider registered more than once");
            }
            seen.push(id);
        }

        Self {
            adapters,
            priority,
            rates,
            config,
        }
    }

    /// Build an engine with the default adapters, default priority and an
    /// [`ExchangeRateApi`] backed rate table.
    pub fn from_config(config: AggregatorConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()?;

        let rates = Arc::new(ExchangeRateTable::new(
            Arc::new(ExchangeRateApi::new(
                client.clone(),
                config.exchange_rate_url.clone(),
            )),
            config.rates_max_age,
        ));

        Ok(Self::new(
            default_adapters(&config, client),
            ProviderPriority::default(),
            rates,
            config,
        ))
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn rates(&self) -> &Arc<ExchangeRateTable> {
        &self.rates
    }

    pub fn priority(&self) -> &ProviderPriority {
        &self.priority
    }

    /// Normalised, deduplicated records for the requested assets in `target` currency,
    /// ordered by descending market cap.
    ///
    /// Never fails: provider errors are logged and skipped, and if no provider produced any
    /// record the static fallback dataset is returned (see [`MarketRecord::is_fallback`]).
    pub async fn aggregated_market_data<Iter, S>(
        &self,
        symbols: Iter,
        target: &Currency,
    ) -> Vec<MarketRecord>
    where
        Iter: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|symbol| catalog::resolve(symbol.as_ref()))
            .collect::<SymbolSet>();

        if symbols.is_empty() {
            return vec![];
        }

        let rates = self.rates.refresh_if_stale().await;
        let outcomes = self.fetch_all(&symbols).await;

        let mut failed = 0;
        let records = outcomes
            .into_iter()
            .filter_map(|(provider, outcome)| match outcome {
                Ok(records) => {
                    debug!(%provider, records = records.len(), "provider fetch succeeded");
                    Some(records)
                }
                Err(error) => {
                    failed += 1;
                    warn!(%provider, %error, "provider fetch failed");
                    None
                }
            })
            .flatten();

        let merged = merge(records, &self.priority, &rates, target);

        if merged.is_empty() {
            warn!(
                failed,
                providers = self.adapters.len(),
                "no provider returned data, serving fallback dataset"
            );
            return fallback_records(&symbols, &rates, target);
        }

        info!(
            assets = merged.len(),
            requested = symbols.len(),
            failed,
            "aggregated market data"
        );
        merged
    }

    /// Normalised price of one asset in the configured target currency, or `0.0` if no data
    /// is available (the "unknown" sentinel, not a free asset).
    pub async fn coin_price(&self, id: &str) -> f64 {
        let asset = catalog::resolve(id);
        self.aggregated_market_data([asset.as_str()], &self.config.target_currency)
            .await
            .into_iter()
            .find(|record| record.asset == asset)
            .map(|record| record.price)
            .unwrap_or(0.0)
    }

    /// Configured asset universe aggregated, sorted by descending market cap, truncated.
    pub async fn top_coins_by_market_cap(&self, limit: usize) -> Vec<MarketRecord> {
        let mut records = self
            .aggregated_market_data(&self.config.symbols, &self.config.target_currency)
            .await;
        records.sort_by(compare_market_cap_desc);
        records.truncate(limit);
        records
    }

    /// Check every adapter with its minimal request and record success per provider.
    pub async fn test_connections(&self) -> IndexMap<ProviderId, bool> {
        let checks = self.adapters.iter().map(|adapter| {
            let symbols = adapter.check_symbols();
            async move {
                let outcome = self.fetch_one(adapter.as_ref(), &symbols).await;
                (adapter.id(), outcome)
            }
        });

        join_all(checks)
            .await
            .into_iter()
            .map(|(provider, outcome)| {
                if let Err(error) = &outcome {
                    warn!(%provider, %error, "provider connection test failed");
                }
                (provider, outcome.is_ok())
            })
            .collect()
    }

    /// Invoke every adapter concurrently and collect each outcome independently.
    pub async fn fetch_all(&self, symbols: &SymbolSet) -> Vec<ProviderOutcome> {
        join_all(self.adapters.iter().map(|adapter| async move {
            (adapter.id(), self.fetch_one(adapter.as_ref(), symbols).await)
        }))
        .await
    }

    async fn fetch_one(
        &self,
        adapter: &dyn ProviderAdapter,
        symbols: &SymbolSet,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let timeout = self.config.provider_timeout;
        tokio::time::timeout(timeout, adapter.fetch(symbols))
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    provider: adapter.id(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            })
    }
}

/// Convert a [`RawRecord`] into a [`MarketRecord`] denominated in `target`.
pub fn normalise(record: RawRecord, rates: &RateSnapshot, target: &Currency) -> MarketRecord {
    let from = &record.currency;
    MarketRecord {
        price: rates.convert(record.price, from, target),
        volume_24h: rates.convert(record.volume_24h, from, target),
        market_cap: rates.convert(record.market_cap, from, target),
        currency: target.clone(),
        asset: record.asset,
        name: record.name,
        change_24h_pct: record.change_24h_pct,
        time: record.time,
        source: record.source,
    }
}

/// Normalise and merge records, keeping exactly one per asset: the one from the best-ranked
/// provider. Equal ranks keep the record seen first. Invalid prices are dropped.
pub fn merge<Iter>(
    records: Iter,
    priority: &ProviderPriority,
    rates: &RateSnapshot,
    target: &Currency,
) -> Vec<MarketRecord>
where
    Iter: IntoIterator<Item = RawRecord>,
{
    let mut best: FnvHashMap<AssetId, (usize, MarketRecord)> = FnvHashMap::default();

    for record in records {
        if !record.is_valid() {
            debug!(
                provider = %record.source,
                asset = %record.asset,
                price = record.price,
                "dropping record with invalid price"
            );
            continue;
        }

        let rank = priority.rank(&record.source);
        match best.get(&record.asset) {
            Some((current, _)) if *current <= rank => {}
            _ => {
                let record = normalise(record, rates, target);
                best.insert(record.asset.clone(), (rank, record));
            }
        }
    }

    let mut merged = best
        .into_values()
        .map(|(_, record)| record)
        .collect::<Vec<_>>();
    merged.sort_by(compare_market_cap_desc);
    merged
}

fn compare_market_cap_desc(a: &MarketRecord, b: &MarketRecord) -> Ordering {
    b.market_cap
        .total_cmp(&a.market_cap)
        .then_with(|| a.asset.cmp(&b.asset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::RateFetchError,
        fallback::FALLBACK_SOURCE,
        provider::coingecko::CoinGecko,
        rates::RateSource,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::{
        sync::atomic::{AtomicUsize, Ordering as AtomicOrdering},
        time::{Duration, Instant},
    };

    struct MockAdapter {
        id: &'static str,
        outcome: Result<Vec<(&'static str, f64, f64)>, ProviderError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        fn ok(id: &'static str, records: Vec<(&'static str, f64, f64)>) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome: Ok(records),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn err(id: &'static str, error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome: Err(error),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn delayed(
            id: &'static str,
            records: Vec<(&'static str, f64, f64)>,
            delay: Duration,
        ) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome: Ok(records),
                delay,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        fn id(&self) -> ProviderId {
            ProviderId::new(self.id)
        }

        async fn fetch(&self, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let records = self.outcome.clone()?;
            Ok(records
                .into_iter()
                .map(|(asset, price, market_cap)| RawRecord {
                    asset: AssetId::new(asset),
                    name: asset.to_string(),
                    price,
                    currency: Currency::usd(),
                    change_24h_pct: 0.0,
                    volume_24h: price * 10.0,
                    market_cap,
                    source: ProviderId::new(self.id),
                    time: Utc::now(),
                })
                .filter(|record| symbols.contains(&record.asset))
                .collect())
        }
    }

    struct StaticRates;

    #[async_trait]
    impl RateSource for StaticRates {
        async fn fetch(&self, _: &Currency) -> Result<FnvHashMap<Currency, f64>, RateFetchError> {
            Ok([(Currency::new("EUR"), 0.5)].into_iter().collect())
        }
    }

    fn engine(adapters: Vec<Arc<MockAdapter>>) -> AggregationEngine {
        engine_with_timeout(adapters, Duration::from_secs(5))
    }

    fn engine_with_timeout(
        adapters: Vec<Arc<MockAdapter>>,
        provider_timeout: Duration,
    ) -> AggregationEngine {
        let adapters = adapters
            .into_iter()
            .map(|adapter| adapter as Arc<dyn ProviderAdapter>)
            .collect();
        let config = AggregatorConfig {
            provider_timeout,
            symbols: ["BTC", "ETH", "SOL"].iter().map(AssetId::new).collect(),
            ..Default::default()
        };
        let rates = Arc::new(ExchangeRateTable::new(
            Arc::new(StaticRates),
            Duration::from_secs(3600),
        ));
        AggregationEngine::new(adapters, ProviderPriority::default(), rates, config)
    }

    fn find<'a>(records: &'a [MarketRecord], asset: &str) -> Option<&'a MarketRecord> {
        records.iter().find(|record| record.asset == AssetId::new(asset))
    }

    #[test]
    fn test_merge_priority() {
        struct TestCase {
            input: Vec<(&'static str, &'static str, f64)>,
            expected: Vec<(&'static str, &'static str, f64)>,
        }

        let tests = vec![
            TestCase {
                // TC0: higher ranked provider wins regardless of arrival order
                input: vec![
                    ("hedera", "BTC", 1.0),
                    ("cryptocompare", "BTC", 2.0),
                    ("coingecko", "BTC", 3.0),
                    ("coincap", "BTC", 4.0),
                ],
                expected: vec![("coingecko", "BTC", 3.0)],
            },
            TestCase {
                // TC1: unranked provider loses to any ranked provider
                input: vec![("unranked", "ETH", 1.0), ("hedera", "ETH", 2.0)],
                expected: vec![("hedera", "ETH", 2.0)],
            },
            TestCase {
                // TC2: equal rank keeps the first record seen
                input: vec![("unranked-a", "SOL", 1.0), ("unranked-b", "SOL", 2.0)],
                expected: vec![("unranked-a", "SOL", 1.0)],
            },
            TestCase {
                // TC3: asset ids are case-insensitive
                input: vec![("coincap", "btc", 1.0), ("coingecko", "BTC", 2.0)],
                expected: vec![("coingecko", "BTC", 2.0)],
            },
            TestCase {
                // TC4: invalid prices never win
                input: vec![("coingecko", "BTC", f64::NAN), ("coincap", "BTC", 5.0)],
                expected: vec![("coincap", "BTC", 5.0)],
            },
            TestCase {
                // TC5: a missing price (decoded as zero) never outranks a real price
                input: vec![("coingecko", "BTC", 0.0), ("coincap", "BTC", 43_000.0)],
                expected: vec![("coincap", "BTC", 43_000.0)],
            },
        ];

        let priority = ProviderPriority::default();
        let rates = RateSnapshot::seed();

        for (index, test) in tests.into_iter().enumerate() {
            let records = test.input.into_iter().map(|(source, asset, price)| RawRecord {
                asset: AssetId::new(asset),
                name: asset.to_string(),
                price,
                currency: Currency::usd(),
                change_24h_pct: 0.0,
                volume_24h: 0.0,
                market_cap: 0.0,
                source: ProviderId::new(source),
                time: Utc::now(),
            });

            let actual = merge(records, &priority, &rates, &Currency::usd())
                .into_iter()
                .map(|record| (record.source, record.asset, record.price))
                .collect::<Vec<_>>();

            let expected = test
                .expected
                .into_iter()
                .map(|(source, asset, price)| (ProviderId::new(source), AssetId::new(asset), price))
                .collect::<Vec<_>>();

            assert_eq!(actual, expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_merge_skips_null_priced_provider_record() {
        let symbols: SymbolSet = [AssetId::new("BTC")].into();
        let coingecko = CoinGecko::parse(
            r#"
                [
                    {
                        "id": "bitcoin",
                        "symbol": "btc",
                        "name": "Bitcoin",
                        "current_price": null,
                        "market_cap": 846000000000,
                        "total_volume": null,
                        "price_change_percentage_24h": null,
                        "last_updated": null
                    }
                ]
            "#,
            &symbols,
        )
        .unwrap();
        let coincap = RawRecord {
            asset: AssetId::new("BTC"),
            name: "Bitcoin".to_string(),
            price: 43_000.0,
            currency: Currency::usd(),
            change_24h_pct: 0.0,
            volume_24h: 0.0,
            market_cap: 840_000_000_000.0,
            source: ProviderId::new("coincap"),
            time: Utc::now(),
        };

        let actual = merge(
            coingecko.into_iter().chain([coincap]),
            &ProviderPriority::default(),
            &RateSnapshot::seed(),
            &Currency::usd(),
        )
        .into_iter()
        .map(|record| (record.source, record.price))
        .collect::<Vec<_>>();

        assert_eq!(actual, vec![(ProviderId::new("coincap"), 43_000.0)]);
    }

    #[test]
    fn test_merge_orders_by_market_cap() {
        let records = [("BTC", 800.0), ("SOL", 40.0), ("ETH", 300.0)]
            .into_iter()
            .map(|(asset, market_cap)| RawRecord {
                asset: AssetId::new(asset),
                name: asset.to_string(),
                price: 1.0,
                currency: Currency::usd(),
                change_24h_pct: 0.0,
                volume_24h: 0.0,
                market_cap,
                source: ProviderId::new("coingecko"),
                time: Utc::now(),
            });

        let actual = merge(
            records,
            &ProviderPriority::default(),
            &RateSnapshot::seed(),
            &Currency::usd(),
        );

        let actual = actual.iter().map(|r| r.asset.as_str()).collect::<Vec<_>>();
        assert_eq!(actual, vec!["BTC", "ETH", "SOL"]);
    }

    #[tokio::test]
    async fn test_aggregated_market_data_merges_by_priority() {
        let engine = engine(vec![
            MockAdapter::ok("hedera", vec![("BTC", 1.0, 10.0)]),
            MockAdapter::ok("coincap", vec![("BTC", 2.0, 10.0), ("ETH", 20.0, 5.0)]),
            MockAdapter::ok("coingecko", vec![("BTC", 3.0, 10.0)]),
        ]);

        let actual = engine
            .aggregated_market_data(["btc", "eth"], &Currency::usd())
            .await;

        assert_eq!(actual.len(), 2);
        let btc = find(&actual, "BTC").unwrap();
        assert_eq!(btc.source, ProviderId::new("coingecko"));
        assert_eq!(btc.price, 3.0);
        let eth = find(&actual, "ETH").unwrap();
        assert_eq!(eth.source, ProviderId::new("coincap"));
    }

    #[tokio::test]
    async fn test_aggregated_market_data_normalises_currency() {
        let engine = engine(vec![MockAdapter::ok(
            "coingecko",
            vec![("BTC", 40_000.0, 800.0)],
        )]);

        let actual = engine
            .aggregated_market_data(["BTC"], &Currency::new("eur"))
            .await;

        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].currency, Currency::new("EUR"));
        assert_eq!(actual[0].price, 20_000.0);
        assert_eq!(actual[0].volume_24h, 200_000.0);
        assert_eq!(actual[0].market_cap, 400.0);
    }

    #[tokio::test]
    async fn test_aggregated_market_data_tolerates_partial_failure() {
        let engine = engine(vec![
            MockAdapter::err("coingecko", ProviderError::Request("down".to_string())),
            MockAdapter::ok("coincap", vec![("BTC", 2.0, 10.0), ("ETH", 1.0, 5.0)]),
        ]);

        let actual = engine
            .aggregated_market_data(["BTC", "ETH"], &Currency::usd())
            .await;

        assert_eq!(actual.len(), 2);
        assert!(actual.iter().all(|record| record.source == ProviderId::new("coincap")));
    }

    #[tokio::test]
    async fn test_aggregated_market_data_falls_back_when_all_fail() {
        let engine = engine(vec![
            MockAdapter::err("coingecko", ProviderError::Request("down".to_string())),
            MockAdapter::err(
                "coincap",
                ProviderError::Status {
                    provider: ProviderId::new("coincap"),
                    status: 503,
                },
            ),
            MockAdapter::err("cryptocompare", ProviderError::Parse("bad".to_string())),
            MockAdapter::err("hedera", ProviderError::Empty(ProviderId::new("hedera"))),
        ]);

        let actual = engine
            .aggregated_market_data(["BTC", "ETH"], &Currency::usd())
            .await;

        assert!(!actual.is_empty());
        assert!(
            actual
                .iter()
                .all(|record| record.source.as_str() == FALLBACK_SOURCE)
        );
    }

    #[tokio::test]
    async fn test_aggregated_market_data_falls_back_when_all_empty() {
        let engine = engine(vec![
            MockAdapter::ok("coingecko", vec![]),
            MockAdapter::ok("coincap", vec![]),
        ]);

        let actual = engine
            .aggregated_market_data(["BTC"], &Currency::usd())
            .await;

        assert_eq!(actual.len(), 1);
        assert!(actual[0].is_fallback());
    }

    #[tokio::test]
    async fn test_aggregated_market_data_unknown_asset_is_absent() {
        let engine = engine(vec![
            MockAdapter::ok("coingecko", vec![("BTC", 3.0, 10.0)]),
            MockAdapter::ok("coincap", vec![("BTC", 2.0, 10.0)]),
        ]);

        let actual = engine
            .aggregated_market_data(["BTC", "doesnotexist"], &Currency::usd())
            .await;

        assert_eq!(actual.len(), 1);
        assert!(find(&actual, "doesnotexist").is_none());
        assert!(!actual[0].is_fallback());
    }

    #[tokio::test]
    async fn test_aggregated_market_data_empty_request() {
        let adapter = MockAdapter::ok("coingecko", vec![("BTC", 3.0, 10.0)]);
        let engine = engine(vec![adapter.clone()]);

        let actual = engine
            .aggregated_market_data(Vec::<String>::new(), &Currency::usd())
            .await;

        assert!(actual.is_empty());
        assert_eq!(adapter.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_all_is_concurrent() {
        let delay = Duration::from_millis(200);
        let engine = engine(vec![
            MockAdapter::delayed("coingecko", vec![("BTC", 1.0, 1.0)], delay),
            MockAdapter::delayed("coincap", vec![("BTC", 1.0, 1.0)], delay),
            MockAdapter::delayed("cryptocompare", vec![("BTC", 1.0, 1.0)], delay),
            MockAdapter::delayed("hedera", vec![("BTC", 1.0, 1.0)], delay),
        ]);
        let symbols: SymbolSet = [AssetId::new("BTC")].into();

        let started = Instant::now();
        let outcomes = engine.fetch_all(&symbols).await;
        let elapsed = started.elapsed();

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|(_, outcome)| outcome.is_ok()));
        assert!(elapsed < delay * 3, "adapters ran sequentially: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_slow_adapter_times_out_without_blocking_others() {
        let engine = engine_with_timeout(
            vec![
                MockAdapter::delayed("coingecko", vec![("BTC", 1.0, 1.0)], Duration::from_secs(30)),
                MockAdapter::ok("coincap", vec![("BTC", 2.0, 1.0)]),
            ],
            Duration::from_millis(50),
        );

        let actual = engine
            .aggregated_market_data(["BTC"], &Currency::usd())
            .await;

        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].source, ProviderId::new("coincap"));

        let symbols: SymbolSet = [AssetId::new("BTC")].into();
        let outcomes = engine.fetch_all(&symbols).await;
        assert_eq!(
            outcomes[0].1,
            Err(ProviderError::Timeout {
                provider: ProviderId::new("coingecko"),
                timeout_ms: 50,
            })
        );
    }

    #[tokio::test]
    async fn test_coin_price() {
        let engine = engine(vec![MockAdapter::ok(
            "coingecko",
            vec![("BTC", 43_000.0, 10.0), ("ETH", 2_000.0, 5.0)],
        )]);

        assert_eq!(engine.coin_price("bitcoin").await, 43_000.0);
        assert_eq!(engine.coin_price("ETH").await, 2_000.0);
    }

    #[tokio::test]
    async fn test_coin_price_unknown_is_zero() {
        let engine = engine(vec![MockAdapter::ok("coingecko", vec![("BTC", 1.0, 1.0)])]);

        // Fallback dataset does not cover this asset either
        assert_eq!(engine.coin_price("doesnotexist").await, 0.0);
    }

    #[tokio::test]
    async fn test_top_coins_by_market_cap() {
        let engine = engine(vec![MockAdapter::ok(
            "coingecko",
            vec![("SOL", 1.0, 40.0), ("BTC", 1.0, 800.0), ("ETH", 1.0, 300.0)],
        )]);

        let actual = engine.top_coins_by_market_cap(2).await;

        let actual = actual.iter().map(|r| r.asset.as_str()).collect::<Vec<_>>();
        assert_eq!(actual, vec!["BTC", "ETH"]);
    }

    #[tokio::test]
    async fn test_test_connections() {
        let engine = engine_with_timeout(
            vec![
                MockAdapter::ok("coingecko", vec![("BTC", 1.0, 1.0)]),
                MockAdapter::err("coincap", ProviderError::Request("down".to_string())),
                MockAdapter::delayed("cryptocompare", vec![], Duration::from_secs(30)),
            ],
            Duration::from_millis(50),
        );

        let actual = engine.test_connections().await;

        let expected = IndexMap::from([
            (ProviderId::new("coingecko"), true),
            (ProviderId::new("coincap"), false),
            (ProviderId::new("cryptocompare"), false),
        ]);
        assert_eq!(actual, expected);
    }
}
