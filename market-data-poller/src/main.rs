use indexmap::IndexMap;
use itertools::Itertools;
use market_data::{
    AggregationEngine, AggregatorConfig,
    correlation::{CorrelationMatrix, build_matrix, describe, pct_returns},
    model::{AssetId, MarketRecord},
};
use std::{collections::VecDeque, str::FromStr, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

const TOP_COINS_LOGGED: usize = 5;
const PAIRS_LOGGED: usize = 5;

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting market-data poller");

    // Configurable via POLL_INTERVAL_SECS env var (default: 60s)
    let poll_interval = Duration::from_secs(env_or("POLL_INTERVAL_SECS", 60_u64).max(1));

    // Configurable via SERIES_CAPACITY env var (default: 120 samples per asset)
    let series_capacity = env_or("SERIES_CAPACITY", 120_usize).max(2);

    let config = AggregatorConfig::from_env();
    info!(
        target_currency = %config.target_currency,
        symbols = %config.symbols.iter().join(","),
        ?poll_interval,
        series_capacity,
        "poller configured"
    );

    let engine = match AggregationEngine::from_config(config) {
        Ok(engine) => engine,
        Err(error) => {
            error!(%error, "failed to build http client");
            return;
        }
    };

    for (provider, reachable) in engine.test_connections().await {
        if reachable {
            info!(%provider, "provider reachable");
        } else {
            warn!(%provider, "provider unreachable");
        }
    }

    let mut series = PriceSeries::new(series_capacity);
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => poll(&engine, &mut series).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down market-data poller");
                break;
            }
        }
    }
}

async fn poll(engine: &AggregationEngine, series: &mut PriceSeries) {
    let config = engine.config();
    let records = engine
        .aggregated_market_data(&config.symbols, &config.target_currency)
        .await;

    if records.iter().any(MarketRecord::is_fallback) {
        warn!(
            records = records.len(),
            "all providers failed, fallback dataset not added to price series"
        );
        return;
    }

    for record in records.iter().take(TOP_COINS_LOGGED) {
        info!(
            asset = %record.asset,
            price = record.price,
            market_cap = record.market_cap,
            change_24h_pct = record.change_24h_pct,
            currency = %record.currency,
            source = %record.source,
            "top coin"
        );
    }

    series.record(&records);

    let matrix = series.correlation_matrix();
    let pairs = matrix.strongest_pairs(PAIRS_LOGGED);

    if pairs.is_empty() {
        debug!(samples = series.samples(), "not enough samples for correlation");
        return;
    }

    for pair in pairs {
        info!(
            asset_a = %pair.asset_a,
            asset_b = %pair.asset_b,
            coefficient = pair.coefficient,
            strength = %describe(pair.coefficient),
            "correlation"
        );
    }
}

/// Bounded rolling price history, one bucket per poll for every tracked asset.
/// An asset absent from a poll gets a `NAN` bucket so all histories stay aligned
/// by poll tick; correlation skips those buckets pairwise.
#[derive(Debug)]
struct PriceSeries {
    capacity: usize,
    prices: IndexMap<AssetId, VecDeque<f64>>,
}

impl PriceSeries {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            prices: IndexMap::new(),
        }
    }

    fn record(&mut self, records: &[MarketRecord]) {
        let capacity = self.capacity;
        let ticks = self.samples();

        let latest = records
            .iter()
            .map(|record| (&record.asset, record.price))
            .collect::<IndexMap<_, _>>();

        for asset in latest.keys() {
            if !self.prices.contains_key(*asset) {
                self.prices
                    .insert((*asset).clone(), VecDeque::from(vec![f64::NAN; ticks]));
            }
        }

        for (asset, prices) in self.prices.iter_mut() {
            prices.push_back(latest.get(asset).copied().unwrap_or(f64::NAN));
            while prices.len() > capacity {
                prices.pop_front();
            }
        }

        // Assets unseen for the whole window no longer carry any information
        self.prices
            .retain(|_, prices| prices.iter().any(|price| price.is_finite()));
    }

    fn iter(&self) -> impl Iterator<Item = (&AssetId, &VecDeque<f64>)> {
        self.prices.iter()
    }

    /// Number of poll ticks currently held, identical for every asset.
    fn samples(&self) -> usize {
        self.prices.values().map(VecDeque::len).max().unwrap_or_default()
    }

    fn correlation_matrix(&self) -> CorrelationMatrix {
        build_matrix(self.prices.iter().map(|(asset, prices)| {
            let prices = prices.iter().copied().collect::<Vec<_>>();
            (asset, pct_returns(&prices))
        }))
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
