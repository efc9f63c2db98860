use super::{ProviderAdapter, SymbolSet, collect_batches, get_text, parse_json};
use crate::{
    catalog,
    de::de_opt_str_f64_or_zero,
    error::ProviderError,
    model::{Currency, ProviderId, RawRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use url::Url;

pub const PROVIDER_ID: &str = "coincap";

/// [`CoinCap`] default server base url.
///
/// See docs: <https://docs.coincap.io/#89deffa0-ab03-4e0a-8d92-637a857d2c91>
pub const BASE_URL_COINCAP: &str = "https://api.coincap.io/";

pub const MAX_IDS_PER_REQUEST: usize = 100;

/// CoinCap market-data adapter. Requests are keyed by slug, numbers arrive as strings.
#[derive(Clone, Debug)]
pub struct CoinCap {
    client: reqwest::Client,
    base_url: Url,
}

/// [`CoinCap`] `assets` response envelope.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct CoinCapResponse {
    pub data: Vec<CoinCapAsset>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// ### Raw Payload Examples
/// See docs: <https://docs.coincap.io/#89deffa0-ab03-4e0a-8d92-637a857d2c91>
///```json
/// {
///     "id": "bitcoin",
///     "rank": "1",
///     "symbol": "BTC",
///     "name": "Bitcoin",
///     "marketCapUsd": "846012345678.123",
///     "volumeUsd24Hr": "21000000000.5",
///     "priceUsd": "43210.987",
///     "changePercent24Hr": "-1.1"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinCapAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(deserialize_with = "de_opt_str_f64_or_zero", default)]
    pub price_usd: f64,
    #[serde(deserialize_with = "de_opt_str_f64_or_zero", default)]
    pub market_cap_usd: f64,
    #[serde(
        rename = "volumeUsd24Hr",
        deserialize_with = "de_opt_str_f64_or_zero",
        default
    )]
    pub volume_usd_24h: f64,
    #[serde(
        rename = "changePercent24Hr",
        deserialize_with = "de_opt_str_f64_or_zero",
        default
    )]
    pub change_percent_24h: f64,
}

impl CoinCap {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn url(&self, ids: &str) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join("v2/assets")
            .map_err(|error| ProviderError::Request(format!("{PROVIDER_ID}: {error}")))?;

        url.query_pairs_mut().append_pair("ids", ids);
        Ok(url)
    }

    /// Parse an `assets` response, keeping only the requested assets.
    pub fn parse(payload: &str, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        let provider = ProviderId::new(PROVIDER_ID);
        let response = parse_json::<CoinCapResponse>(&provider, payload)?;
        let time = response
            .timestamp
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Ok(response
            .data
            .into_iter()
            .filter_map(|asset| {
                let id = catalog::resolve(&asset.symbol);
                symbols.contains(&id).then(|| RawRecord {
                    asset: id,
                    name: asset.name,
                    price: asset.price_usd,
                    currency: Currency::usd(),
                    change_24h_pct: asset.change_percent_24h,
                    volume_24h: asset.volume_usd_24h,
                    market_cap: asset.market_cap_usd,
                    source: provider.clone(),
                    time,
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
impl ProviderAdapter for CoinCap {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER_ID)
    }

    async fn fetch(&self, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        let batches = symbols
            .iter()
            .map(catalog::coincap_id)
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
