use super::{ProviderAdapter, SymbolSet, get_text, parse_json};
use crate::{
    de::de_str,
    error::ProviderError,
    model::{AssetId, Currency, ProviderId, RawRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

pub const PROVIDER_ID: &str = "hedera";

/// Native asset of the network.
pub const NATIVE_ASSET: &str = "HBAR";

/// [`HederaMirror`] default mainnet mirror node base url.
///
/// See docs: <https://docs.hedera.com/hedera/sdks-and-apis/rest-api>
pub const BASE_URL_HEDERA_MIRROR: &str = "https://mainnet-public.mirrornode.hedera.com/";

const TINYBARS_PER_HBAR: f64 = 100_000_000.0;

/// Blockchain-network reader backed by a Hedera mirror node.
///
/// The network only prices its native asset, so this adapter supplies at most one record.
/// When an account is configured its holdings are queried and logged, but token balances carry
/// no price on this API and are never emitted.
#[derive(Clone, Debug)]
pub struct HederaMirror {
    client: reqwest::Client,
    base_url: Url,
    account: Option<String>,
}

/// `network/exchangerate` response.
///
/// See docs: <https://mainnet-public.mirrornode.hedera.com/api/v1/docs/#/network/getNetworkExchangeRate>
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct HederaExchangeRate {
    pub current_rate: HederaRate,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct HederaRate {
    pub cent_equivalent: u64,
    pub hbar_equivalent: u64,
    pub expiration_time: i64,
}

impl HederaRate {
    /// USD price of one HBAR.
    pub fn usd_price(&self) -> Option<f64> {
        (self.hbar_equivalent > 0)
            .then(|| self.cent_equivalent as f64 / self.hbar_equivalent as f64 / 100.0)
    }
}

/// `network/supply` response, values in tinybars.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct HederaSupply {
    #[serde(deserialize_with = "de_str")]
    pub released_supply: u128,
    #[serde(deserialize_with = "de_str")]
    pub total_supply: u128,
}

/// `accounts/{id}` response, reduced to what is logged.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct HederaAccount {
    pub account: String,
    pub balance: HederaBalance,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct HederaBalance {
    pub balance: u64,
    #[serde(default)]
    pub tokens: Vec<HederaTokenBalance>,
}

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct HederaTokenBalance {
    pub token_id: String,
    pub balance: u64,
}

impl HederaMirror {
    pub fn new(client: reqwest::Client, base_url: Url, account: Option<String>) -> Self {
        Self {
            client,
            base_url,
            account,
        }
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|error| ProviderError::Request(format!("{PROVIDER_ID}: {error}")))
    }

    async fn get<T>(&self, path: &str) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
    {
        let provider = self.id();
        let payload = get_text(&self.client, &provider, self.url(path)?).await?;
        parse_json(&provider, &payload)
    }

    /// Build the native asset record from the network rate and (optional) supply.
    pub fn native_record(
        rate: &HederaExchangeRate,
        supply: Option<&HederaSupply>,
    ) -> Result<RawRecord, ProviderError> {
        let price = rate.current_rate.usd_price().ok_or_else(|| {
            ProviderError::Parse(format!("{PROVIDER_ID}: exchange rate with zero hbar_equivalent"))
        })?;

        let market_cap = supply
            .map(|supply| supply.released_supply as f64 / TINYBARS_PER_HBAR * price)
            .unwrap_or(0.0);

        Ok(RawRecord {
            asset: AssetId::new(NATIVE_ASSET),
            name: "Hedera".to_string(),
            price,
            currency: Currency::usd(),
            change_24h_pct: 0.0,
            volume_24h: 0.0,
            market_cap,
            source: ProviderId::new(PROVIDER_ID),
            time: rate
                .timestamp
                .as_deref()
                .and_then(parse_consensus_timestamp)
                .unwrap_or_else(Utc::now),
        })
    }
}

/// Parse a mirror node `seconds.nanoseconds` consensus timestamp.
pub fn parse_consensus_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    let (secs, nanos) = timestamp.split_once('.').unwrap_or((timestamp, "0"));
    DateTime::from_timestamp(secs.parse().ok()?, nanos.parse().ok()?)
}

#[async_trait]
impl ProviderAdapter for HederaMirror {
    fn id(&self) -> ProviderId {
        ProviderId::new(PROVIDER_ID)
    }

    /// Only ever prices the network's native asset. A request without it is not a failure:
    /// nothing is fetched and the result is empty rather than [`ProviderError::Empty`].
    async fn fetch(&self, symbols: &SymbolSet) -> Result<Vec<RawRecord>, ProviderError> {
        if !symbols.contains(&AssetId::new(NATIVE_ASSET)) {
            return Ok(vec![]);
        }

        let (rate, supply, account) = futures::join!(
            self.get::<HederaExchangeRate>("api/v1/network/exchangerate"),
            self.get::<HederaSupply>("api/v1/network/supply"),
            async {
                match &self.account {
                    Some(account) => Some(
                        self.get::<HederaAccount>(&format!("api/v1/accounts/{account}"))
                            .await,
                    ),
                    None => None,
                }
            }
        );

        let supply = supply
            .inspect_err(|error| {
                warn!(provider = PROVIDER_ID, %error, "network supply unavailable")
            })
            .ok();

        match account {
            Some(Ok(account)) => debug!(
                provider = PROVIDER_ID,
                account = %account.account,
                tokens = account.balance.tokens.len(),
                "account holdings discovered, token balances are unpriced"
            ),
            Some(Err(error)) => warn!(provider = PROVIDER_ID, %error, "account query failed"),
            None => {}
        }

        Ok(vec![Self::native_record(&rate?, supply.as_ref())?])
    }

    fn check_symbols(&self) -> SymbolSet {
        SymbolSet::from([AssetId::new(NATIVE_ASSET)])
    }
}
