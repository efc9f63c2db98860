//! # Market-Data
//! Concurrent multi-provider crypto market data aggregation for a paper-trading backend.
//!
//! * **Resilient**: every [`ProviderAdapter`](provider::ProviderAdapter) is queried concurrently
//!   under its own timeout. Partial failure degrades coverage, never the call; total failure
//!   degrades to a clearly marked static fallback dataset.
//! * **Normalised**: prices, volumes and market caps are converted into a single target
//!   [`Currency`](model::Currency) via an atomically refreshed
//!   [`ExchangeRateTable`](rates::ExchangeRateTable).
//! * **Deterministic**: duplicate assets are resolved by a fixed
//!   [`ProviderPriority`](provider::ProviderPriority), not by arrival order.
//! * **Analytics**: pairwise Pearson [`CorrelationMatrix`](correlation::CorrelationMatrix)
//!   with rankings and human readable strength labels.
//!
//! ## Example
//! ```rust,no_run
//! use market_data::{AggregationEngine, AggregatorConfig, model::Currency};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AggregationEngine::from_config(AggregatorConfig::from_env())
//!         .expect("failed to build http client");
//!
//!     let records = engine
//!         .aggregated_market_data(["btc", "ethereum", "SOL"], &Currency::new("EUR"))
//!         .await;
//!
//!     for record in records {
//!         println!("{} {} {} ({})", record.asset, record.price, record.currency, record.source);
//!     }
//! }
//! ```

/// [`AggregationEngine`] fan-out/fan-in over every registered provider, priority merge,
/// currency normalisation and fallback.
pub mod aggregator;

/// Static asset catalog mapping canonical tickers to provider specific identifiers.
pub mod catalog;

/// Environment driven [`AggregatorConfig`].
pub mod config;

/// Pearson correlation, [`CorrelationMatrix`](correlation::CorrelationMatrix) and rankings.
pub mod correlation;

/// Custom `serde` deserializers for loosely typed provider payloads.
pub mod de;

/// All [`Error`](std::error::Error)s generated in Market-Data.
pub mod error;

/// Static fallback dataset served when every provider yields nothing.
pub mod fallback;

/// Core data model: identifiers, [`RawRecord`](model::RawRecord) and
/// [`MarketRecord`](model::MarketRecord).
pub mod model;

/// [`ProviderAdapter`](provider::ProviderAdapter) trait, priority order and concrete adapters.
pub mod provider;

/// Exchange rate snapshot, atomically refreshed table and rate sources.
pub mod rates;

pub use aggregator::AggregationEngine;
pub use config::AggregatorConfig;
pub use correlation::{CorrelationMatrix, build_matrix, correlation, describe};
pub use error::{ProviderError, RateFetchError};
pub use model::{AssetId, Currency, MarketRecord, ProviderId, RawRecord};
pub use provider::{ProviderAdapter, ProviderPriority, SymbolSet};
pub use rates::{ExchangeRateTable, RateSnapshot, RateSource};
