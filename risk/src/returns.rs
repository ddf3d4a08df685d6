//! Return series data model
//!
//! A [`ReturnMatrix`] maps asset identifiers to chronologically ordered
//! log-return series. Iteration follows insertion order, which fixes the
//! row/column order of every matrix derived from it.

use crate::error::{Result, RiskError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-date log returns for a single asset, oldest first
pub type ReturnSeries = Vec<f64>;

/// Portfolio weights, one per asset in [`ReturnMatrix`] order
///
/// Weights are applied linearly as given; they are not normalized.
pub type Weights = Vec<f64>;

/// Date-aligned return series for a set of assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<String, ReturnSeries>", into = "IndexMap<String, ReturnSeries>")]
pub struct ReturnMatrix {
    series: IndexMap<String, ReturnSeries>,
    observations: usize,
}

impl ReturnMatrix {
    /// Build a matrix from aligned series
    ///
    /// Fails with [`RiskError::MisalignedSeries`] when the series lengths
    /// differ and with [`RiskError::InvalidParameter`] on a NaN or infinite
    /// return. An empty map is accepted here; analyses reject it later.
    pub fn new(series: IndexMap<String, ReturnSeries>) -> Result<Self> {
        let observations = series.values().next().map(Vec::len).unwrap_or(0);

        for (asset, data) in &series {
            if data.len() != observations {
                return Err(RiskError::MisalignedSeries {
                    asset: asset.clone(),
                    expected: observations,
                    actual: data.len(),
                });
            }
            if let Some(index) = data.iter().position(|r| !r.is_finite()) {
                return Err(RiskError::InvalidParameter(format!(
                    "Return {} of {} is not finite: {}",
                    index, asset, data[index]
                )));
            }
        }

        Ok(Self {
            series,
            observations,
        })
    }

    /// Build a matrix from `(asset, series)` pairs, keeping their order
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ReturnSeries)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a return matrix from aligned price paths
    pub fn from_prices(prices: &IndexMap<String, Vec<f64>>) -> Result<Self> {
        let series = prices
            .iter()
            .map(|(asset, path)| Ok((asset.clone(), log_returns(path)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Self::new(series)
    }

    pub fn num_assets(&self) -> usize {
        self.series.len()
    }

    /// Number of observations per asset
    pub fn num_observations(&self) -> usize {
        self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn assets(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    pub fn get(&self, asset: &str) -> Option<&[f64]> {
        self.series.get(asset).map(Vec::as_slice)
    }

    /// Series by position in insertion order
    pub fn series_at(&self, index: usize) -> Option<&[f64]> {
        self.series.get_index(index).map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Fail unless there is at least one asset and `minimum` observations per asset
    pub fn require_observations(&self, minimum: usize) -> Result<()> {
        if self.series.is_empty() {
            return Err(RiskError::InsufficientData("No assets provided".to_string()));
        }
        if self.observations < minimum {
            return Err(RiskError::InsufficientData(format!(
                "Need at least {} aligned observations, got {}",
                minimum, self.observations
            )));
        }
        Ok(())
    }

    /// Weighted portfolio return for every date
    ///
    /// `weights[i]` applies to the i-th asset in insertion order.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Result<Vec<f64>> {
        if weights.len() != self.series.len() {
            return Err(RiskError::WeightCountMismatch {
                expected: self.series.len(),
                actual: weights.len(),
            });
        }

        let mut portfolio = vec![0.0; self.observations];
        for (series, weight) in self.series.values().zip(weights) {
            for (acc, r) in portfolio.iter_mut().zip(series) {
                *acc += weight * r;
            }
        }
        Ok(portfolio)
    }
}

impl TryFrom<IndexMap<String, ReturnSeries>> for ReturnMatrix {
    type Error = RiskError;

    fn try_from(series: IndexMap<String, ReturnSeries>) -> Result<Self> {
        Self::new(series)
    }
}

impl From<ReturnMatrix> for IndexMap<String, ReturnSeries> {
    fn from(matrix: ReturnMatrix) -> Self {
        matrix.series
    }
}

/// Convert a price path into log returns `ln(p[t] / p[t-1])`
///
/// A single price yields an empty series. Prices must be strictly positive.
pub fn log_returns(prices: &[f64]) -> Result<ReturnSeries> {
    if prices.is_empty() {
        return Err(RiskError::InsufficientData(
            "Need at least one price".to_string(),
        ));
    }
    if let Some(bad) = prices.iter().find(|p| p.is_nan() || **p <= 0.0) {
        return Err(RiskError::InvalidParameter(format!(
            "Prices must be positive, got {}",
            bad
        )));
    }

    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}
