//! Pairwise Pearson correlation between price series, with rankings and strength labels.
//!
//! Series are index-aligned: element `i` of every series refers to the same time bucket.

use crate::model::AssetId;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Pearson correlation coefficient over the overlapping prefix of two series.
///
/// Buckets where either value is missing (non-finite, eg/ `f64::NAN`) are skipped pairwise.
/// Returns `None` for insufficient data: fewer than 2 comparable points, or a constant series.
pub fn try_correlation(series_a: &[f64], series_b: &[f64]) -> Option<f64> {
    let (series_a, series_b): (Vec<f64>, Vec<f64>) = series_a
        .iter()
        .zip(series_b)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip();

    if series_a.len() < 2 || series_a.iter().all_equal() || series_b.iter().all_equal() {
        return None;
    }

    let n = series_a.len() as f64;
    let mean_a: f64 = series_a.iter().sum::<f64>() / n;
    let mean_b: f64 = series_b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for (a, b) in series_a.iter().zip(&series_b) {
        let diff_a = a - mean_a;
        let diff_b = b - mean_b;
        cov += diff_a * diff_b;
        var_a += diff_a * diff_a;
        var_b += diff_b * diff_b;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }

    let coefficient = cov / (var_a.sqrt() * var_b.sqrt());
    coefficient.is_finite().then(|| coefficient.clamp(-1.0, 1.0))
}

/// Pearson correlation coefficient, with `0.0` as the insufficient-data sentinel.
///
/// Callers that must distinguish "no correlation" from "not enough data" should use
/// [`try_correlation`].
pub fn correlation(series_a: &[f64], series_b: &[f64]) -> f64 {
    try_correlation(series_a, series_b).unwrap_or(0.0)
}

/// Bar-to-bar percentage returns. A non-positive prior price yields a `0.0` return, and a
/// missing (non-finite) price on either side yields a missing (`NaN`) return.
pub fn pct_returns(series: &[f64]) -> Vec<f64> {
    series
        .iter()
        .tuple_windows()
        .map(|(prev, next)| {
            if !prev.is_finite() || !next.is_finite() {
                f64::NAN
            } else if *prev > 0.0 {
                (next - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Human readable correlation strength band, by absolute coefficient.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Strength {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
    None,
}

impl Strength {
    pub fn label(&self) -> &'static str {
        match self {
            Strength::VeryStrong => "Very Strong",
            Strength::Strong => "Strong",
            Strength::Moderate => "Moderate",
            Strength::Weak => "Weak",
            Strength::None => "No Correlation",
        }
    }

    /// Band boundaries are exclusive lower bounds: >0.8, >0.6, >0.4, >0.2.
    pub fn from_coefficient(coefficient: f64) -> Self {
        let abs = coefficient.abs();
        if abs > 0.8 {
            Strength::VeryStrong
        } else if abs > 0.6 {
            Strength::Strong
        } else if abs > 0.4 {
            Strength::Moderate
        } else if abs > 0.2 {
            Strength::Weak
        } else {
            Strength::None
        }
    }
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Label a coefficient, eg/ "Positive Very Strong", "Negative Weak" or "No Correlation".
pub fn describe(coefficient: f64) -> String {
    match Strength::from_coefficient(coefficient) {
        Strength::None => Strength::None.label().to_string(),
        strength if coefficient > 0.0 => format!("Positive {}", strength.label()),
        strength => format!("Negative {}", strength.label()),
    }
}

/// Correlation of one asset against another.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct RankedCorrelation {
    pub asset: AssetId,
    pub coefficient: f64,
}

/// Correlation between an unordered pair of assets.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct RankedPair {
    pub asset_a: AssetId,
    pub asset_b: AssetId,
    pub coefficient: f64,
}

/// Symmetric table of pairwise coefficients.
///
/// An absent entry means "no comparable data", never zero. Asset insertion order is preserved
/// and is the tie-break order for every ranking.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct CorrelationMatrix(IndexMap<AssetId, IndexMap<AssetId, f64>>);

impl CorrelationMatrix {
    /// Compute every unordered pair once and write it symmetrically. The diagonal is 1 for
    /// every asset with a non-empty series.
    pub fn build<'a, Iter, S>(series_by_asset: Iter) -> Self
    where
        Iter: IntoIterator<Item = (&'a AssetId, S)>,
        S: AsRef<[f64]>,
    {
        let series = series_by_asset.into_iter().collect::<Vec<_>>();

        let mut matrix = series
            .iter()
            .map(|(asset, values)| {
                let mut row = IndexMap::new();
                if !values.as_ref().is_empty() {
                    row.insert((*asset).clone(), 1.0);
                }
                ((*asset).clone(), row)
            })
            .collect::<IndexMap<_, _>>();

        for (i, j) in (0..series.len()).tuple_combinations() {
            let (asset_a, values_a) = &series[i];
            let (asset_b, values_b) = &series[j];

            let Some(coefficient) = try_correlation(values_a.as_ref(), values_b.as_ref()) else {
                continue;
            };

            if let Some(row) = matrix.get_mut(*asset_a) {
                row.insert((*asset_b).clone(), coefficient);
            }
            if let Some(row) = matrix.get_mut(*asset_b) {
                row.insert((*asset_a).clone(), coefficient);
            }
        }

        Self(matrix)
    }

    pub fn get(&self, asset_a: &AssetId, asset_b: &AssetId) -> Option<f64> {
        self.0.get(asset_a)?.get(asset_b).copied()
    }

    pub fn row(&self, asset: &AssetId) -> Option<&IndexMap<AssetId, f64>> {
        self.0.get(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Correlations of `asset` with every other asset, by descending absolute value.
    pub fn strongest_correlations(&self, asset: &AssetId, limit: usize) -> Vec<RankedCorrelation> {
        let mut ranked = self.others(asset);
        ranked.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        ranked.truncate(limit);
        ranked
    }

    /// Correlations of `asset` with every other asset, by ascending absolute value.
    pub fn weakest_correlations(&self, asset: &AssetId, limit: usize) -> Vec<RankedCorrelation> {
        let mut ranked = self.others(asset);
        ranked.sort_by(|a, b| a.coefficient.abs().total_cmp(&b.coefficient.abs()));
        ranked.truncate(limit);
        ranked
    }

    /// Positively correlated assets, most positive first.
    pub fn most_positive(&self, asset: &AssetId, limit: usize) -> Vec<RankedCorrelation> {
        let mut ranked = self.strongest_correlations(asset, usize::MAX);
        ranked.retain(|entry| entry.coefficient > 0.0);
        ranked.sort_by(|a, b| b.coefficient.total_cmp(&a.coefficient));
        ranked.truncate(limit);
        ranked
    }

    /// Negatively correlated assets, most negative first.
    pub fn most_negative(&self, asset: &AssetId, limit: usize) -> Vec<RankedCorrelation> {
        let mut ranked = self.strongest_correlations(asset, usize::MAX);
        ranked.retain(|entry| entry.coefficient < 0.0);
        ranked.sort_by(|a, b| a.coefficient.total_cmp(&b.coefficient));
        ranked.truncate(limit);
        ranked
    }

    /// Every unordered pair (each examined once), by descending absolute value.
    pub fn strongest_pairs(&self, limit: usize) -> Vec<RankedPair> {
        let mut pairs = self
            .0
            .keys()
            .tuple_combinations()
            .filter_map(|(asset_a, asset_b)| {
                self.get(asset_a, asset_b).map(|coefficient| RankedPair {
                    asset_a: asset_a.clone(),
                    asset_b: asset_b.clone(),
                    coefficient,
                })
            })
            .collect::<Vec<_>>();

        pairs.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        pairs.truncate(limit);
        pairs
    }

    fn others(&self, asset: &AssetId) -> Vec<RankedCorrelation> {
        self.0
            .get(asset)
            .map(|row| {
                row.iter()
                    .filter(|(other, _)| *other != asset)
                    .map(|(other, coefficient)| RankedCorrelation {
                        asset: other.clone(),
                        coefficient: *coefficient,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// See [`CorrelationMatrix::build`].
pub fn build_matrix<'a, Iter, S>(series_by_asset: Iter) -> CorrelationMatrix
where
    Iter: IntoIterator<Item = (&'a AssetId, S)>,
    S: AsRef<[f64]>,
{
    CorrelationMatrix::build(series_by_asset)
}
