use self::{
    coincap::CoinCap, coingecko::CoinGecko, cryptocompare::CryptoCompare, hedera::HederaMirror,
};
use crate::{
    config::AggregatorConfig,
    error::ProviderError,
    model::{AssetId, ProviderId, RawRecord},
};
use async_trait::async_trait;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, warn};
use url::Url;

/// CoinGecko `coins/markets` adapter (primary market-data API, keyed by slug).
pub mod coingecko;

/// CoinCap `assets` adapter (secondary market-data API, keyed by slug, stringly numbers).
pub mod coincap;

/// CryptoCompare `pricemultifull` adapter (aggregator API, keyed by ticker).
pub mod cryptocompare;

/// Hedera mirror node network reader (native asset only).
pub mod hedera;

/// Requested set of canonical asset identifiers. Ordered so request urls are deterministic.
pub type SymbolSet = BTreeSet<AssetId>;

/// Capability shared by every external price-data source.
///
/// Implementations own request construction, symbol-id mapping and response parsing, and
/// must report routine failures (HTTP status, malformed payload, empty result) as a
/// [`ProviderError`] rather than panicking.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch whatever subset of `symbols` this provider can supply.
    async fn fetch(&self, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError>;

    /// Minimal request used by connection diagnostics.
    fn check_symbols(&self) -> SymbolSet {
        SymbolSet::from([AssetId::new("BTC")])
    }
}

/// Explicit, ordered provider preference used to resolve same-asset conflicts.
///
/// Index 0 is the most preferred provider. Unlisted providers rank below every listed one.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ProviderPriority(Vec<ProviderId>);

impl ProviderPriority {
    pub fn new<Iter>(order: Iter) -> Self
    where
        Iter: IntoIterator<Item = ProviderId>,
    {
        let mut ids: Vec<ProviderId> = Vec::new();
        for id in order {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self(ids)
    }

    /// Rank of a provider, lower is better. Unlisted providers rank `usize::MAX`.
    pub fn rank(&self, id: &ProviderId) -> usize {
        self.0
            .iter()
            .position(|ranked| ranked == id)
            .unwrap_or(usize::MAX)
    }

    pub fn contains(&self, id: &ProviderId) -> bool {
        self.0.contains(id)
    }

    pub fn ids(&self) -> &[ProviderId] {
        &self.0
    }
}

impl Default for ProviderPriority {
    fn default() -> Self {
        Self::new([
            ProviderId::new(coingecko::PROVIDER_ID),
            ProviderId::new(coincap::PROVIDER_ID),
            ProviderId::new(cryptocompare::PROVIDER_ID),
            ProviderId::new(hedera::PROVIDER_ID),
        ])
    }
}

/// Construct the default adapter set, in [`ProviderPriority::default`] order.
pub fn default_adapters(
    config: &AggregatorConfig,
    client: reqwest::Client,
) -> Vec<Arc<dyn ProviderAdapter>> {
    vec![
        Arc::new(CoinGecko::new(client.clone(), config.coingecko_url.clone())),
        Arc::new(CoinCap::new(client.clone(), config.coincap_url.clone())),
        Arc::new(CryptoCompare::new(
            client.clone(),
            config.cryptocompare_url.clone(),
        )),
        Arc::new(HederaMirror::new(
            client,
            config.hedera_mirror_url.clone(),
            config.hedera_account_id.clone(),
        )),
    ]
}

/// GET `url` and return the body, mapping transport and status failures.
pub(crate) async fn get_text(
    client: &reqwest::Client,
    provider: &ProviderId,
    url: Url,
) -> Result<String, ProviderError> {
    debug!(%provider, %url, "requesting provider data");
    client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|error| ProviderError::from_reqwest(provider, error))?
        .text()
        .await
        .map_err(|error| ProviderError::from_reqwest(provider, error))
}

/// Deserialise a provider payload, mapping failures to [`ProviderError::Parse`].
pub(crate) fn parse_json<T>(provider: &ProviderId, payload: &str) -> Result<T, ProviderError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(payload).map_err(|error| {
        ProviderError::Parse(format!(
            "{provider}: {error} - {}",
            payload.chars().take(100).collect::<String>()
        ))
    })
}

/// Combine per-batch outcomes: keep every successful batch, and only fail if nothing usable
/// was produced.
pub(crate) fn collect_batches<Iter>(
    provider: &ProviderId,
    batches: Iter,
) -> Result<Vec<RawRecord>, ProviderError>
where
    Iter: IntoIterator<Item = Result<Vec<RawRecord>, ProviderError>>,
{
    let mut records = Vec::new();
    let mut first_error = None;

    for batch in batches {
        match batch {
            Ok(batch) => records.extend(batch),
            Err(error) => {
                warn!(%provider, %error, "provider batch failed");
                first_error.get_or_insert(error);
            }
        }
    }

    match (records.is_empty(), first_error) {
        (false, _) => Ok(records),
        (true, Some(error)) => Err(error),
        (true, None) => Err(ProviderError::Empty(provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Currency;
    use chrono::Utc;

    fn record(asset: &str) -> RawRecord {
        RawRecord {
            asset: AssetId::new(asset),
            name: asset.to_string(),
            price: 1.0,
            currency: Currency::usd(),
            change_24h_pct: 0.0,
            volume_24h: 0.0,
            market_cap: 0.0,
            source: ProviderId::new("mock"),
            time: Utc::now(),
        }
    }

    #[test]
    fn test_provider_priority_rank() {
        let priority = ProviderPriority::default();

        assert_eq!(priority.rank(&ProviderId::new("coingecko")), 0);
        assert_eq!(priority.rank(&ProviderId::new("coincap")), 1);
        assert_eq!(priority.rank(&ProviderId::new("cryptocompare")), 2);
        assert_eq!(priority.rank(&ProviderId::new("hedera")), 3);
        assert_eq!(priority.rank(&ProviderId::new("unknown")), usize::MAX);
    }

    #[test]
    fn test_provider_priority_dedups() {
        let priority = ProviderPriority::new([
            ProviderId::new("a"),
            ProviderId::new("b"),
            ProviderId::new("a"),
        ]);
        assert_eq!(priority.ids(), &[ProviderId::new("a"), ProviderId::new("b")]);
    }

    #[test]
    fn test_collect_batches() {
        struct TestCase {
            input: Vec<Result<Vec<RawRecord>, ProviderError>>,
            expected: Result<usize, ProviderError>,
        }

        let provider = ProviderId::new("mock");

        let tests = vec![
            TestCase {
                // TC0: partial batch failure keeps successful records
                input: vec![
                    Ok(vec![record("BTC"), record("ETH")]),
                    Err(ProviderError::Request("reset".to_string())),
                ],
                expected: Ok(2),
            },
            TestCase {
                // TC1: every batch failed returns the first error
                input: vec![
                    Err(ProviderError::Request("first".to_string())),
                    Err(ProviderError::Request("second".to_string())),
                ],
                expected: Err(ProviderError::Request("first".to_string())),
            },
            TestCase {
                // TC2: no records and no errors is Empty
                input: vec![Ok(vec![])],
                expected: Err(ProviderError::Empty(provider.clone())),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = collect_batches(&provider, test.input).map(|records| records.len());
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
