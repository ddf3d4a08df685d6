//! Risk analysis engine
//!
//! Runs one [`RiskRequest`] end to end: correlation estimate, copula sampler,
//! Monte Carlo simulation, metrics, diagnostics and stress scenarios. The
//! engine holds only its configuration and can be shared across threads.

use crate::config::EngineConfig;
use crate::copula::CopulaSampler;
use crate::correlation::{zero_variance_assets, CorrelationMatrix};
use crate::diagnostics::ModelDiagnostics;
use crate::error::{Result, RiskError};
use crate::metrics::{validate_confidence, RiskMetrics};
use crate::report::{ReturnHistogram, RiskReport, RiskWarning};
use crate::simulation::{CancellationToken, MonteCarloEngine, SimulationParams};
use crate::stress::StressTestEngine;
use crate::RiskRequest;
use chrono::Utc;
use tracing::{info, warn};

/// Weights further than this from summing to 1 raise a warning
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Copula risk engine
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: EngineConfig,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Load configuration from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use copula_risk::RiskEngine;
    ///
    /// let yaml = r#"
    /// cholesky_policy: strict
    /// volatility:
    ///   gaussian: 0.01
    /// "#;
    ///
    /// let engine = RiskEngine::from_yaml(yaml).unwrap();
    /// assert_eq!(engine.config().volatility.gaussian, 0.01);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_yaml(yaml)?))
    }

    /// Load configuration from a JSON string
    ///
    /// # Example
    ///
    /// ```
    /// use copula_risk::RiskEngine;
    ///
    /// let json = r#"{ "simulation": { "seed": 42 } }"#;
    ///
    /// let engine = RiskEngine::from_json(json).unwrap();
    /// assert_eq!(engine.config().simulation.seed, Some(42));
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_json(json)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a full analysis
    pub fn analyze(&self, request: &RiskRequest) -> Result<RiskReport> {
        self.analyze_with_cancel(request, &CancellationToken::new())
    }

    /// Run a full analysis, giving up between simulation batches once
    /// `cancel` is set
    pub fn analyze_with_cancel(
        &self,
        request: &RiskRequest,
        cancel: &CancellationToken,
    ) -> Result<RiskReport> {
        self.validate_request(request)?;

        let returns = &request.returns;
        let model = request.copula;
        info!(
            copula = model.name(),
            assets = returns.num_assets(),
            observations = returns.num_observations(),
            n_sims = request.n_sims,
            confidence = request.confidence,
            horizon = request.time_horizon_days,
            "Starting risk analysis"
        );

        let mut warnings = Vec::new();

        let weight_sum: f64 = request.weights.iter().sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warnings.push(RiskWarning::WeightsNotNormalized { sum: weight_sum });
        }

        for asset in zero_variance_assets(returns) {
            warnings.push(RiskWarning::ZeroVarianceAsset { asset });
        }

        if !model.is_exact_for(returns.num_assets()) {
            warnings.push(RiskWarning::ArchimedeanDimension {
                model: model.name().to_string(),
                assets: returns.num_assets(),
            });
        }

        let correlation = CorrelationMatrix::estimate(returns)?;
        let sampler = CopulaSampler::new(model, &correlation, self.config.cholesky_policy)?;

        if let Some(factor) = sampler.factor().filter(|f| f.is_degraded()) {
            warnings.push(RiskWarning::ClampedCholesky {
                pivots: factor.clamped_pivots().to_vec(),
            });
        }

        for warning in &warnings {
            warn!(%warning, "Degraded analysis path");
        }

        let historical_returns = returns.portfolio_returns(&request.weights)?;
        let historical = RiskMetrics::from_returns(
            &historical_returns,
            request.confidence,
            self.config.risk_free_rate,
        )?;

        let simulator = MonteCarloEngine::new(
            self.config.simulation.batch_size,
            self.config.simulation.seed,
            self.config.marginal_transform,
        )?;
        let params = SimulationParams {
            n_sims: request.n_sims,
            time_horizon_days: request.time_horizon_days,
            volatility: self.config.volatility.for_model(&model),
        };
        let simulated_returns = simulator.simulate(&sampler, &request.weights, &params, cancel)?;

        let simulated = RiskMetrics::from_returns(
            simulated_returns.as_slice(),
            request.confidence,
            self.config.risk_free_rate,
        )?;

        let diagnostics = ModelDiagnostics::evaluate(
            &historical_returns,
            simulated_returns.as_slice(),
            returns,
            &model,
            request.log_likelihood,
        )?;
        let stress = StressTestEngine::for_copula(&model).run(simulated.var)?;
        let histogram =
            ReturnHistogram::from_returns(simulated_returns.as_slice(), self.config.histogram_bins)?;

        info!(
            copula = model.name(),
            historical_var = historical.var,
            simulated_var = simulated.var,
            simulated_cvar = simulated.cvar,
            goodness_of_fit = diagnostics.goodness_of_fit,
            warnings = warnings.len(),
            "Risk analysis complete"
        );

        Ok(RiskReport {
            copula: model,
            confidence: request.confidence,
            time_horizon_days: request.time_horizon_days,
            n_sims: request.n_sims,
            historical,
            simulated,
            correlation,
            cholesky_policy: self.config.cholesky_policy,
            marginal_transform: self.config.marginal_transform,
            simulated_preview: simulated_returns.preview(self.config.preview_len).to_vec(),
            histogram,
            diagnostics,
            stress,
            warnings,
            generated_at: Utc::now(),
        })
    }

    /// Run [`analyze_with_cancel`](Self::analyze_with_cancel) on tokio's
    /// blocking pool
    #[cfg(feature = "async")]
    pub async fn analyze_async(
        &self,
        request: RiskRequest,
        cancel: CancellationToken,
    ) -> Result<RiskReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.analyze_with_cancel(&request, &cancel))
            .await
            .map_err(|e| RiskError::TaskFailed(e.to_string()))?
    }

    fn validate_request(&self, request: &RiskRequest) -> Result<()> {
        validate_confidence(request.confidence)?;

        if request.time_horizon_days == 0 {
            return Err(RiskError::InvalidTimeHorizon(request.time_horizon_days));
        }
        if request.n_sims == 0 {
            return Err(RiskError::InvalidParameter(
                "Number of simulations must be positive".to_string(),
            ));
        }

        request.copula.validate()?;
        request.returns.require_observations(2)?;

        if request.weights.len() != request.returns.num_assets() {
            return Err(RiskError::WeightCountMismatch {
                expected: request.returns.num_assets(),
                actual: request.weights.len(),
            });
        }
        if let Some(bad) = request.weights.iter().find(|w| !w.is_finite()) {
            return Err(RiskError::InvalidParameter(format!(
                "Weights must be finite, got {}",
                bad
            )));
        }
        Ok(())
    }
}
