//! # copula-risk: Copula-based Portfolio Risk Engine
//!
//! Estimates the joint dependence of a set of assets from their historical
//! returns, simulates correlated portfolio returns through a selectable
//! copula, and reports tail risk and model diagnostics.
//!
//! ## Core Components
//!
//! - **RiskEngine**: single request/response entry point
//! - **CopulaSampler**: Gaussian, Student-t, Clayton and Gumbel dependence
//! - **MonteCarloEngine**: batched, seedable, cancellable trial runner
//! - **Metrics / Diagnostics**: VaR, CVaR, drawdown, Sharpe, tail dependence,
//!   Kendall's tau, KS goodness of fit, AIC/BIC
//!
//! ## Example Usage
//!
//! ```rust
//! use copula_risk::{CopulaModel, RiskEngine, RiskRequest, SyntheticMarket};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let data = SyntheticMarket::demo()
//!     .unwrap()
//!     .generate(&mut StdRng::seed_from_u64(7))
//!     .unwrap();
//!
//! let engine = RiskEngine::from_yaml("simulation:\n  seed: 42\n").unwrap();
//! let request = RiskRequest {
//!     n_sims: 2_000,
//!     ..RiskRequest::new(data.returns, vec![0.4, 0.3, 0.2, 0.1], CopulaModel::student_t())
//! };
//!
//! let report = engine.analyze(&request).unwrap();
//! assert!(report.simulated.cvar >= report.simulated.var);
//! ```

mod cholesky;
mod config;
mod copula;
mod correlation;
mod diagnostics;
mod engine;
mod error;
mod metrics;
mod report;
mod returns;
mod simulation;
mod stats;
mod stress;
mod synthetic;

pub use cholesky::{CholeskyFactor, CholeskyPolicy};
pub use config::{EngineConfig, MarginalVolatility, SimulationSettings};
pub use copula::{
    clayton_pair, gumbel_pair, student_t_quantile, CopulaDraw, CopulaModel, CopulaSampler,
    VariateScale,
};
pub use correlation::{zero_variance_assets, CorrelationMatrix, CorrelationTable};
pub use diagnostics::{
    aic, bic, goodness_of_fit, kendalls_tau, lower_tail_dependence, pseudo_observations,
    upper_tail_dependence, ModelDiagnostics, DEFAULT_LOWER_THRESHOLD, DEFAULT_UPPER_THRESHOLD,
};
pub use engine::RiskEngine;
pub use error::{Result, RiskError};
pub use metrics::{
    conditional_value_at_risk, max_drawdown, sharpe_ratio, validate_confidence, value_at_risk,
    volatility, RiskMetrics, TRADING_DAYS_PER_YEAR,
};
pub use report::{HistogramBin, ReturnHistogram, RiskReport, RiskWarning};
pub use returns::{log_returns, ReturnMatrix, ReturnSeries, Weights};
pub use simulation::{
    CancellationToken, MarginalTransform, MonteCarloEngine, SimulatedReturns, SimulationParams,
    DEFAULT_BATCH_SIZE,
};
pub use stats::{
    erf, inverse_standard_normal_cdf, is_constant, mean, multiply_matrix_vector, normal_variate,
    pearson_correlation, population_std_dev, population_variance, standard_normal_cdf,
};
pub use stress::{StressScenario, StressTestEngine, StressTestReport, StressTestResult};
pub use synthetic::{SyntheticData, SyntheticMarket};

use serde::{Deserialize, Serialize};

/// Confidence level used by [`RiskRequest::new`] (percent)
pub const DEFAULT_CONFIDENCE: f64 = 95.0;

/// Trial count used by [`RiskRequest::new`]
pub const DEFAULT_SIMULATIONS: usize = 10_000;

/// Input of one risk analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    /// Aligned historical log returns per asset
    pub returns: ReturnMatrix,

    /// One weight per asset in `returns` order, applied as given
    pub weights: Weights,

    pub copula: CopulaModel,

    /// Confidence level in percent, strictly between 0 and 100
    pub confidence: f64,

    /// Horizon in days (>= 1)
    pub time_horizon_days: u32,

    /// Monte Carlo trials (>= 1)
    pub n_sims: usize,

    /// Log-likelihood of the fitted model, if the caller has one.
    /// Enables AIC/BIC in the diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_likelihood: Option<f64>,
}

impl RiskRequest {
    /// Request at 95% confidence over one day with 10 000 trials
    pub fn new(returns: ReturnMatrix, weights: Weights, copula: CopulaModel) -> Self {
        Self {
            returns,
            weights,
            copula,
            confidence: DEFAULT_CONFIDENCE,
            time_horizon_days: 1,
            n_sims: DEFAULT_SIMULATIONS,
            log_likelihood: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_request_defaults() {
        let returns = ReturnMatrix::from_pairs(vec![("A", vec![0.01, -0.01])]).unwrap();
        let request = RiskRequest::new(returns, vec![1.0], CopulaModel::Gaussian);

        assert_eq!(request.confidence, 95.0);
        assert_eq!(request.time_horizon_days, 1);
        assert_eq!(request.n_sims, 10_000);
        assert!(request.log_likelihood.is_none());
    }

    #[test]
    fn test_risk_request_from_json() {
        let json = r#"{
  "returns": { "A": [0.01, -0.02, 0.005], "B": [0.02, -0.01, 0.0] },
  "weights": [0.6, 0.4],
  "copula": { "type": "Clayton", "theta": 3.0 },
  "confidence": 99.0,
  "time_horizon_days": 10,
  "n_sims": 5000
}"#;
        let request: RiskRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.returns.assets(), vec!["A", "B"]);
        assert_eq!(request.copula, CopulaModel::Clayton { theta: 3.0 });
        assert_eq!(request.time_horizon_days, 10);
        assert!(request.log_likelihood.is_none());
    }

    #[test]
    fn test_misaligned_request_rejected_on_parse() {
        let json = r#"{
  "returns": { "A": [0.01, -0.02, 0.005], "B": [0.02] },
  "weights": [0.6, 0.4],
  "copula": { "type": "Gaussian" },
  "confidence": 95.0,
  "time_horizon_days": 1,
  "n_sims": 100
}"#;
        assert!(serde_json::from_str::<RiskRequest>(json).is_err());
    }
}
