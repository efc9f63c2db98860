//! Static degraded-mode dataset returned when every live provider fails.

use crate::{
    model::{AssetId, Currency, MarketRecord, ProviderId},
    provider::SymbolSet,
    rates::RateSnapshot,
};
use chrono::Utc;

/// Source marker carried by every fallback [`MarketRecord`].
pub const FALLBACK_SOURCE: &str = "fallback";

/// Placeholder market values, denominated in USD.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FallbackListing {
    pub ticker: &'static str,
    pub name: &'static str,
    pub price: f64,
    pub change_24h_pct: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
}

#[rustfmt::skip]
pub const FALLBACK_DATASET: &[FallbackListing] = &[
    FallbackListing { ticker: "BTC", name: "Bitcoin", price: 43_000.0, change_24h_pct: 2.5, volume_24h: 25_000_000_000.0, market_cap: 840_000_000_000.0 },
    FallbackListing { ticker: "ETH", name: "Ethereum", price: 2_600.0, change_24h_pct: 1.8, volume_24h: 12_000_000_000.0, market_cap: 310_000_000_000.0 },
    FallbackListing { ticker: "USDT", name: "Tether", price: 1.0, change_24h_pct: 0.0, volume_24h: 40_000_000_000.0, market_cap: 95_000_000_000.0 },
    FallbackListing { ticker: "BNB", name: "BNB", price: 310.0, change_24h_pct: 0.9, volume_24h: 900_000_000.0, market_cap: 47_000_000_000.0 },
    FallbackListing { ticker: "SOL", name: "Solana", price: 98.0, change_24h_pct: 3.2, volume_24h: 2_500_000_000.0, market_cap: 42_000_000_000.0 },
    FallbackListing { ticker: "XRP", name: "XRP", price: 0.62, change_24h_pct: -0.4, volume_24h: 1_200_000_000.0, market_cap: 33_000_000_000.0 },
    FallbackListing { ticker: "ADA", name: "Cardano", price: 0.52, change_24h_pct: 1.1, volume_24h: 450_000_000.0, market_cap: 18_000_000_000.0 },
    FallbackListing { ticker: "DOGE", name: "Dogecoin", price: 0.085, change_24h_pct: -1.2, volume_24h: 600_000_000.0, market_cap: 12_000_000_000.0 },
];

/// Fallback records for the requested assets, converted into `target`.
///
/// Never empty: if none of the requested assets is covered the full dataset is returned.
pub fn fallback_records(
    symbols: &SymbolSet,
    rates: &RateSnapshot,
    target: &Currency,
) -> Vec<MarketRecord> {
    let requested = FALLBACK_DATASET
        .iter()
        .filter(|listing| symbols.contains(&AssetId::new(listing.ticker)))
        .collect::<Vec<_>>();

    let listings = if requested.is_empty() {
        FALLBACK_DATASET.iter().collect()
    } else {
        requested
    };

    let usd = Currency::usd();
    let time = Utc::now();
    listings
        .into_iter()
        .map(|listing| MarketRecord {
            asset: AssetId::new(listing.ticker),
            name: listing.name.to_string(),
            price: rates.convert(listing.price, &usd, target),
            currency: target.clone(),
            change_24h_pct: listing.change_24h_pct,
            volume_24h: rates.convert(listing.volume_24h, &usd, target),
            market_cap: rates.convert(listing.market_cap, &usd, target),
            time,
            source: ProviderId::new(FALLBACK_SOURCE),
        })
        .collect()
}
