//! Engine configuration
//!
//! Everything a [`RiskEngine`](crate::RiskEngine) needs besides the request
//! itself. Every field has a default, so a partial YAML/JSON document (or an
//! empty one) is a valid configuration.

use crate::cholesky::CholeskyPolicy;
use crate::copula::CopulaModel;
use crate::error::{Result, RiskError};
use crate::simulation::{MarginalTransform, DEFAULT_BATCH_SIZE};
use serde::{Deserialize, Serialize};

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Behaviour on a non positive semi-definite correlation matrix
    pub cholesky_policy: CholeskyPolicy,

    /// How each trial turns copula draws into per-asset shocks
    pub marginal_transform: MarginalTransform,

    /// Daily marginal volatility per copula family
    pub volatility: MarginalVolatility,

    pub simulation: SimulationSettings,

    /// Annual risk-free rate for the Sharpe ratio
    pub risk_free_rate: f64,

    /// Number of simulated returns echoed in the report
    pub preview_len: usize,

    /// Number of bins in the simulated-return histogram
    pub histogram_bins: usize,
}

/// Daily marginal volatility used by the simulator, keyed by copula family
///
/// These are model assumptions rather than estimates; heavier-tailed
/// families default to a larger value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginalVolatility {
    pub gaussian: f64,
    pub student_t: f64,
    pub clayton: f64,
    pub gumbel: f64,
}

impl Default for MarginalVolatility {
    fn default() -> Self {
        Self {
            gaussian: 0.015,
            student_t: 0.025,
            clayton: 0.020,
            gumbel: 0.020,
        }
    }
}

impl MarginalVolatility {
    pub fn for_model(&self, model: &CopulaModel) -> f64 {
        match model {
            CopulaModel::Gaussian => self.gaussian,
            CopulaModel::StudentT { .. } => self.student_t,
            CopulaModel::Clayton { .. } => self.clayton,
            CopulaModel::Gumbel { .. } => self.gumbel,
        }
    }
}

/// Monte Carlo execution settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Trials per batch
    pub batch_size: usize,

    /// Base seed; batch `b` uses `seed + b`. None draws from entropy per run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cholesky_policy: CholeskyPolicy::default(),
            marginal_transform: MarginalTransform::default(),
            volatility: MarginalVolatility::default(),
            simulation: SimulationSettings::default(),
            risk_free_rate: 0.02,
            preview_len: 1_000,
            histogram_bins: 50,
        }
    }
}

impl EngineConfig {
    /// Parse from YAML
    ///
    /// # Example
    ///
    /// ```
    /// use copula_risk::{CholeskyPolicy, EngineConfig};
    ///
    /// let yaml = r#"
    /// cholesky_policy: strict
    /// simulation:
    ///   seed: 42
    /// "#;
    ///
    /// let config = EngineConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.cholesky_policy, CholeskyPolicy::Strict);
    /// assert_eq!(config.simulation.batch_size, 1000);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| RiskError::Config(format!("Failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| RiskError::Config(format!("Failed to parse JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.simulation.batch_size == 0 {
            return Err(RiskError::Config("simulation.batch_size must be positive".to_string()));
        }
        if self.histogram_bins == 0 {
            return Err(RiskError::Config("histogram_bins must be positive".to_string()));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(RiskError::Config("risk_free_rate must be finite".to_string()));
        }

        let vols = &self.volatility;
        for (name, value) in [
            ("gaussian", vols.gaussian),
            ("student_t", vols.student_t),
            ("clayton", vols.clayton),
            ("gumbel", vols.gumbel),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RiskError::Config(format!(
                    "volatility.{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
