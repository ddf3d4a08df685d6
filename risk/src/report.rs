//! Risk report returned by the engine
//!
//! The report is a plain serde value: presentation and persistence layers
//! pick their own format.

use crate::cholesky::CholeskyPolicy;
use crate::copula::CopulaModel;
use crate::correlation::CorrelationMatrix;
use crate::diagnostics::ModelDiagnostics;
use crate::error::{Result, RiskError};
use crate::metrics::RiskMetrics;
use crate::simulation::MarginalTransform;
use crate::stress::StressTestReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete output of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Model the simulation ran under
    pub copula: CopulaModel,

    /// Confidence level (percent)
    pub confidence: f64,

    pub time_horizon_days: u32,
    pub n_sims: usize,

    /// Metrics of the weighted historical portfolio
    pub historical: RiskMetrics,

    /// Metrics of the simulated portfolio returns
    pub simulated: RiskMetrics,

    /// Estimated correlation of the historical returns
    pub correlation: CorrelationMatrix,

    pub cholesky_policy: CholeskyPolicy,
    pub marginal_transform: MarginalTransform,

    /// Leading simulated returns, in trial order
    pub simulated_preview: Vec<f64>,

    /// Distribution of all simulated returns
    pub histogram: ReturnHistogram,

    pub diagnostics: ModelDiagnostics,
    pub stress: StressTestReport,

    /// Degraded-but-defined conditions met during the analysis
    pub warnings: Vec<RiskWarning>,

    pub generated_at: DateTime<Utc>,
}

impl RiskReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RiskError::CalculationError(format!("Failed to serialize report: {}", e)))
    }
}

/// Condition that changed how the analysis ran without stopping it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RiskWarning {
    /// Correlation matrix was not positive semi-definite; these pivots were
    /// clamped to zero
    ClampedCholesky { pivots: Vec<usize> },

    /// Archimedean model applied to a universe that is not bivariate; only
    /// the first asset pair carries the copula dependence
    ArchimedeanDimension { model: String, assets: usize },

    /// Asset with constant returns; its correlations are reported as 0
    ZeroVarianceAsset { asset: String },

    /// Weights do not sum to 1 and were applied as given
    WeightsNotNormalized { sum: f64 },
}

impl fmt::Display for RiskWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskWarning::ClampedCholesky { pivots } => {
                write!(f, "Correlation matrix not PSD, clamped pivots {:?}", pivots)
            }
            RiskWarning::ArchimedeanDimension { model, assets } => write!(
                f,
                "{} copula is bivariate; applied to the first pair of {} assets",
                model, assets
            ),
            RiskWarning::ZeroVarianceAsset { asset } => {
                write!(f, "Asset {} has zero variance", asset)
            }
            RiskWarning::WeightsNotNormalized { sum } => {
                write!(f, "Weights sum to {:.6}, applied without normalization", sum)
            }
        }
    }
}

/// Equal-width histogram bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge
    pub lower: f64,
    pub upper: f64,
    pub count: usize,

    /// `count / total`
    pub probability: f64,
}

/// Equal-width histogram over `[min, max]` of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnHistogram {
    pub bins: Vec<HistogramBin>,
}

impl ReturnHistogram {
    /// Bucket `returns` into `bins` equal-width bins
    ///
    /// The maximum lands in the last bin. A constant sample puts everything
    /// in one zero-width bin.
    pub fn from_returns(returns: &[f64], bins: usize) -> Result<Self> {
        if returns.is_empty() {
            return Err(RiskError::InsufficientData("No returns to bin".to_string()));
        }
        if bins == 0 {
            return Err(RiskError::InvalidParameter(
                "Histogram needs at least one bin".to_string(),
            ));
        }

        let min = returns.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = returns.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let total = returns.len() as f64;

        if max == min {
            return Ok(Self {
                bins: vec![HistogramBin {
                    lower: min,
                    upper: max,
                    count: returns.len(),
                    probability: 1.0,
                }],
            });
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for r in returns {
            let index = (((r - min) / width).floor() as usize).min(bins - 1);
            counts[index] += 1;
        }

        Ok(Self {
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| HistogramBin {
                    lower: min + i as f64 * width,
                    upper: min + (i + 1) as f64 * width,
                    count,
                    probability: count as f64 / total,
                })
                .collect(),
        })
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}
