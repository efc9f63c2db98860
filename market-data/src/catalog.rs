//! Static symbol-id mapping between canonical tickers and provider-specific keys.
//!
//! Providers keyed by slug (CoinGecko, CoinCap) and by ticker (CryptoCompare) are translated
//! here so the [`AggregationEngine`](crate::aggregator::AggregationEngine) only ever sees
//! [`AssetId`] tickers.

use crate::model::AssetId;
use smol_str::{SmolStr, StrExt};

/// Known asset and its per-provider identifiers.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct AssetListing {
    pub ticker: &'static str,
    pub name: &'static str,
    pub coingecko: &'static str,
    pub coincap: &'static str,
}

#[rustfmt::skip]
pub const LISTINGS: &[AssetListing] = &[
    AssetListing { ticker: "BTC", name: "Bitcoin", coingecko: "bitcoin", coincap: "bitcoin" },
    AssetListing { ticker: "ETH", name: "Ethereum", coingecko: "ethereum", coincap: "ethereum" },
    AssetListing { ticker: "USDT", name: "Tether", coingecko: "tether", coincap: "tether" },
    AssetListing { ticker: "BNB", name: "BNB", coingecko: "binancecoin", coincap: "binance-coin" },
    AssetListing { ticker: "SOL", name: "Solana", coingecko: "solana", coincap: "solana" },
    AssetListing { ticker: "XRP", name: "XRP", coingecko: "ripple", coincap: "xrp" },
    AssetListing { ticker: "USDC", name: "USD Coin", coingecko: "usd-coin", coincap: "usd-coin" },
    AssetListing { ticker: "ADA", name: "Cardano", coingecko: "cardano", coincap: "cardano" },
    AssetListing { ticker: "DOGE", name: "Dogecoin", coingecko: "dogecoin", coincap: "dogecoin" },
    AssetListing { ticker: "AVAX", name: "Avalanche", coingecko: "avalanche-2", coincap: "avalanche" },
    AssetListing { ticker: "DOT", name: "Polkadot", coingecko: "polkadot", coincap: "polkadot" },
    AssetListing { ticker: "LINK", name: "Chainlink", coingecko: "chainlink", coincap: "chainlink" },
    AssetListing { ticker: "MATIC", name: "Polygon", coingecko: "matic-network", coincap: "polygon" },
    AssetListing { ticker: "LTC", name: "Litecoin", coingecko: "litecoin", coincap: "litecoin" },
    AssetListing { ticker: "HBAR", name: "Hedera", coingecko: "hedera-hashgraph", coincap: "hedera-hashgraph" },
];

/// Find the [`AssetListing`] for a canonical ticker.
pub fn listing(asset: &AssetId) -> Option<&'static AssetListing> {
    LISTINGS.iter().find(|listing| listing.ticker == asset.as_str())
}

/// Resolve caller input (ticker, CoinGecko slug, CoinCap slug or display name, any case) to
/// a canonical [`AssetId`]. Unknown input is upper-cased and used as-is.
pub fn resolve(input: &str) -> AssetId {
    let needle = input.trim();
    LISTINGS
        .iter()
        .find(|listing| {
            listing.ticker.eq_ignore_ascii_case(needle)
                || listing.coingecko.eq_ignore_ascii_case(needle)
                || listing.coincap.eq_ignore_ascii_case(needle)
                || listing.name.eq_ignore_ascii_case(needle)
        })
        .map(|listing| AssetId::new(listing.ticker))
        .unwrap_or_else(|| AssetId::new(needle))
}

/// CoinGecko id for an asset, falling back to the lower-cased ticker.
pub fn coingecko_id(asset: &AssetId) -> SmolStr {
    listing(asset)
        .map(|listing| SmolStr::new_static(listing.coingecko))
        .unwrap_or_else(|| asset.as_str().to_lowercase_smolstr())
}

/// CoinCap id for an asset, falling back to the lower-cased ticker.
pub fn coincap_id(asset: &AssetId) -> SmolStr {
    listing(asset)
        .map(|listing| SmolStr::new_static(listing.coincap))
        .unwrap_or_else(|| asset.as_str().to_lowercase_smolstr())
}
