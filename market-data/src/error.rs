use crate::model::ProviderId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single [`ProviderAdapter`](crate::provider::ProviderAdapter) fetch.
///
/// Returned, never raised: the [`AggregationEngine`](crate::aggregator::AggregationEngine)
/// records these per provider and carries on with the remaining results.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("{provider} responded with HTTP status {status}")]
    Status { provider: ProviderId, status: u16 },

    #[error("failed to parse payload: {0}")]
    Parse(String),

    #[error("{0} returned no usable records")]
    Empty(ProviderId),

    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: ProviderId, timeout_ms: u64 },
}

impl ProviderError {
    /// Determine if retrying the same request later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request(_) | ProviderError::Timeout { .. } => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Map a [`reqwest::Error`] raised while talking to `provider`.
    pub fn from_reqwest(provider: &ProviderId, error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            ProviderError::Status {
                provider: provider.clone(),
                status: status.as_u16(),
            }
        } else if error.is_decode() {
            ProviderError::Parse(format!("{provider}: {error}"))
        } else {
            ProviderError::Request(format!("{provider}: {error}"))
        }
    }
}

/// Failure to refresh the [`ExchangeRateTable`](crate::rates::ExchangeRateTable).
///
/// The table keeps its last-known-good rates when this is returned.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum RateFetchError {
    #[error("rate request failed: {0}")]
    Request(String),

    #[error("rate source responded with HTTP status {0}")]
    Status(u16),

    #[error("failed to parse rate payload: {0}")]
    Parse(String),

    #[error("rate source rejected the request: {0}")]
    Rejected(String),

    #[error("invalid rate for {currency}: {rate}")]
    Invalid { currency: String, rate: f64 },
}

impl From<reqwest::Error> for RateFetchError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => RateFetchError::Status(status.as_u16()),
            None if error.is_decode() => RateFetchError::Parse(error.to_string()),
            None => RateFetchError::Request(error.to_string()),
        }
    }
}
