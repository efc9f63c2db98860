use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};

/// Canonical, case-insensitive asset identifier (eg/ "BTC").
///
/// Always stored upper-cased so records from providers keyed by slug or by ticker merge on
/// the same key.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize)]
pub struct AssetId(SmolStr);

impl AssetId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(id.as_ref().trim().to_uppercase_smolstr())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Stable identifier of a [`ProviderAdapter`](crate::provider::ProviderAdapter), used for
/// priority lookup and diagnostics.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize)]
pub struct ProviderId(SmolStr);

impl ProviderId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// ISO-4217 style currency code (eg/ "USD", "EUR"), upper-cased on construction.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize)]
pub struct Currency(SmolStr);

impl Currency {
    pub fn new<S: AsRef<str>>(code: S) -> Self {
        Self(code.as_ref().trim().to_uppercase_smolstr())
    }

    pub fn usd() -> Self {
        Self(SmolStr::new_static("USD"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// One provider's unmerged, unconverted view of one asset at fetch time.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct RawRecord {
    pub asset: AssetId,
    pub name: String,
    /// Price denominated in [`Self::currency`].
    pub price: f64,
    pub currency: Currency,
    pub change_24h_pct: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub source: ProviderId,
    pub time: DateTime<Utc>,
}

impl RawRecord {
    /// False for prices that are not usable market data: missing (decoded as zero), negative,
    /// NaN or infinite.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Merged, currency-normalised record for one asset.
///
/// `price`, `volume_24h` and `market_cap` are expressed in [`Self::currency`], the target
/// currency requested from the [`AggregationEngine`](crate::aggregator::AggregationEngine).
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct MarketRecord {
    pub asset: AssetId,
    pub name: String,
    pub price: f64,
    pub currency: Currency,
    pub change_24h_pct: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub time: DateTime<Utc>,
    /// Provider whose [`RawRecord`] won the merge.
    pub source: ProviderId,
}

impl MarketRecord {
    /// Returns true if this record came from the static degraded-mode dataset.
    pub fn is_fallback(&self) -> bool {
        self.source.as_str() == crate::fallback::FALLBACK_SOURCE
    }
}
