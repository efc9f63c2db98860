use super::{ProviderAdapter, SymbolSet, collect_batches, get_text, parse_json};
use crate::{
    catalog,
    de::de_opt_f64_or_zero,
    error::ProviderError,
    model::{Currency, ProviderId, RawRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use url::Url;

pub const PROVIDER_ID: &str = "coingecko";

/// [`CoinGecko`] default server base url.
///
/// See docs: <https://docs.coingecko.com/reference/coins-markets>
pub const BASE_URL_COINGECKO: &str = "https://api.coingecko.com/";

/// Maximum ids per `coins/markets` page.
pub const MAX_IDS_PER_REQUEST: usize = 250;

/// CoinGecko market-data adapter. Requests are keyed by slug (eg/ "bitcoin").
#[derive(Clone, Debug)]
pub struct CoinGecko {
    client: reqwest::Client,
    base_url: Url,
}

/// ### Raw Payload Examples
/// See docs: <https://docs.coingecko.com/reference/coins-markets>
///```json
/// {
///     "id": "bitcoin",
///     "symbol": "btc",
///     "name": "Bitcoin",
///     "current_price": 43250.12,
///     "market_cap": 846000000000,
///     "total_volume": 21000000000,
///     "price_change_percentage_24h": -1.25,
///     "last_updated": "2024-01-10T12:00:00.000Z"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct CoinGeckoMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(deserialize_with = "de_opt_f64_or_zero", default)]
    pub current_price: f64,
    #[serde(deserialize_with = "de_opt_f64_or_zero", default)]
    pub market_cap: f64,
    #[serde(deserialize_with = "de_opt_f64_or_zero", default)]
    pub total_volume: f64,
    #[serde(deserialize_with = "de_opt_f64_or_zero", default)]
    pub price_change_percentage_24h: f64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CoinGecko {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn url(&self, ids: &str) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join("api/v3/coins/markets")
            .map_err(|error| ProviderError::Request(format!("{PROVIDER_ID}: {error}")))?;

        url.query_pairs_mut()
            .append_pair("vs_currency", "usd")
            .append_pair("ids", ids)
            .append_pair("per_page", &MAX_IDS_PER_REQUEST.to_string())
            .append_pair("page", "1")
            .append_pair("price_change_percentage", "24h");

        Ok(url)
    }

    /// Parse a `coins/markets` response, keeping only the requested assets.
    pub fn parse(payload: &str, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        let provider = ProviderId::new(PROVIDER_ID);
        let markets = parse_json::<Vec<CoinGeckoMarket>>(&provider, payload)?;

        Ok(markets
            .into_iter()
            .filter_map(|market| {
                let asset = catalog::resolve(&market.symbol);
                symbols.contains(&asset).then(|| RawRecord {
                    asset,
                    name: market.name,
                    price: market.current_price,
                    currency: Currency::usd(),
                    change_24h_pct: market.price_change_percentage_24h,
                    volume_24h: market.total_volume,
                    market_cap: market.market_cap,
                    source: provider.clone(),
                    time: market.last_updated.unwrap_or_else(Utc::now),
                })
            })
            .collect())
    }

    async fn fetch_batch(
        &self,
        ids: String,
        symbols: &SymbolSet,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let provider = self.id();
        let payload = get_text(&self.client, &provider, self.url(&ids)?).await?;
        Self::parse(&payload, symbols)
    }
}

#[async_trait]
impl ProviderAdapter for CoinGecko {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER_ID)
    }

    async fn fetch(&self, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        let batches = symbols
            .iter()
            .map(catalog::coingecko_id)
            .chunks(MAX_IDS_PER_REQUEST)
            .into_iter()
            .map(|mut chunk| chunk.join(","))
            .collect::<Vec<_>>();

        let results = join_all(
            batches
                .into_iter()
                .map(|ids| self.fetch_batch(ids, symbols)),
        )
        .await;

        collect_batches(&self.id(), results)
    }
}
