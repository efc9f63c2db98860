use super::{ProviderAdapter, SymbolSet, collect_batches, get_text, parse_json};
use crate::{
    catalog,
    de::de_opt_f64_or_zero,
    error::ProviderError,
    model::{AssetId, Currency, ProviderId, RawRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

pub const PROVIDER_ID: &str = "cryptocompare";

/// [`CryptoCompare`] default server base url.
///
/// See docs: <https://developers.cryptocompare.com/documentation/legacy/Price/multipleSymbolsFullPriceEndpoint>
pub const BASE_URL_CRYPTOCOMPARE: &str = "https://min-api.cryptocompare.com/";

/// `fsyms` is limited to 300 characters, which 60 tickers safely fit in.
pub const MAX_TICKERS_PER_REQUEST: usize = 60;

const QUOTE: &str = "USD";

/// CryptoCompare aggregator adapter. Requests are keyed by ticker (eg/ "BTC").
#[derive(Clone, Debug)]
pub struct CryptoCompare {
    client: reqwest::Client,
    base_url: Url,
}

/// [`CryptoCompare`] `pricemultifull` response, either `RAW[ticker][quote]` data or an error
/// envelope.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CryptoCompareResponse {
    Data {
        #[serde(rename = "RAW")]
        raw: HashMap<String, HashMap<String, CryptoCompareTicker>>,
    },
    Error {
        #[serde(rename = "Response")]
        response: String,
        #[serde(rename = "Message", default)]
        message: String,
    },
}

/// ### Raw Payload Examples
///```json
/// {
///     "FROMSYMBOL": "BTC",
///     "TOSYMBOL": "USD",
///     "PRICE": 43180.5,
///     "LASTUPDATE": 1704888000,
///     "VOLUME24HOURTO": 1520000000.0,
///     "CHANGEPCT24HOUR": -0.95,
///     "MKTCAP": 845000000000.0
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CryptoCompareTicker {
    #[serde(rename = "FROMSYMBOL")]
    pub from_symbol: String,
    #[serde(deserialize_with = "de_opt_f64_or_zero", default)]
    pub price: f64,
    #[serde(rename = "LASTUPDATE", default)]
    pub last_update: Option<i64>,
    #[serde(rename = "VOLUME24HOURTO", deserialize_with = "de_opt_f64_or_zero", default)]
    pub volume_24h_quote: f64,
    #[serde(rename = "CHANGEPCT24HOUR", deserialize_with = "de_opt_f64_or_zero", default)]
    pub change_pct_24h: f64,
    #[serde(rename = "MKTCAP", deserialize_with = "de_opt_f64_or_zero", default)]
    pub market_cap: f64,
}

impl CryptoCompare {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn url(&self, tickers: &str) -> Result<Url, ProviderError> {
        let mut url = self
            .base_url
            .join("data/pricemultifull")
            .map_err(|error| ProviderError::Request(format!("{PROVIDER_ID}: {error}")))?;

        url.query_pairs_mut()
            .append_pair("fsyms", tickers)
            .append_pair("tsyms", QUOTE);
        Ok(url)
    }

    /// Parse a `pricemultifull` response, keeping only the requested assets.
    pub fn parse(payload: &str, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        let provider = ProviderId::new(PROVIDER_ID);

        let raw = match parse_json::<CryptoCompareResponse>(&provider, payload)? {
            CryptoCompareResponse::Data { raw } => raw,
            CryptoCompareResponse::Error { response, message } => {
                return Err(ProviderError::Parse(format!(
                    "{provider}: {response} - {message}"
                )));
            }
        };

        Ok(raw
            .into_iter()
            .filter_map(|(ticker, mut quotes)| {
                let asset = AssetId::new(&ticker);
                let quote = quotes.remove(QUOTE)?;
                symbols.contains(&asset).then(|| RawRecord {
                    name: catalog::listing(&asset)
                        .map(|listing| listing.name.to_string())
                        .unwrap_or_else(|| quote.from_symbol.clone()),
                    asset,
                    price: quote.price,
                    currency: Currency::new(QUOTE),
                    change_24h_pct: quote.change_pct_24h,
                    volume_24h: quote.volume_24h_quote,
                    market_cap: quote.market_cap,
                    source: provider.clone(),
                    time: quote
                        .last_update
                        .and_then(|secs| DateTime::from_timestamp(secs, 0))
                        .unwrap_or_else(Utc::now),
                })
            })
            .sorted_by(|a, b| a.asset.cmp(&b.asset))
            .collect())
    }

    async fn fetch_batch(
        &self,
        tickers: String,
        symbols: &SymbolSet,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let provider = self.id();
        let payload = get_text(&self.client, &provider, self.url(&tickers)?).await?;
        Self::parse(&payload, symbols)
    }
}

#[async_trait]
impl ProviderAdapter for CryptoCompare {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER_ID)
    }

    async fn fetch(&self, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        let batches = symbols
            .iter()
            .map(AssetId::as_str)
            .chunks(MAX_TICKERS_PER_REQUEST)
            .into_iter()
            .map(|mut chunk| chunk.join(","))
            .collect::<Vec<_>>();

        let results = join_all(
            batches
                .into_iter()
                .map(|tickers| self.fetch_batch(tickers, symbols)),
        )
        .await;

        collect_batches(&self.id(), results)
    }
}
