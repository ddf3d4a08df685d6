//! Stress testing on simulated VaR
//!
//! Each scenario scales the simulated VaR by a multiplier that depends on the
//! copula in use: heavy-tailed and tail-dependent models stress harder in the
//! regime their dependence concentrates on.
//!
//! | Model     | Market crash | High correlation | Liquidity crisis |
//! |-----------|--------------|------------------|------------------|
//! | Gaussian  | 2.1          | 1.8              | 1.5              |
//! | Student-t | 2.8          | 2.2              | 1.9              |
//! | Clayton   | 2.4          | 2.5              | 2.1              |
//! | Gumbel    | 3.2          | 2.0              | 1.7              |

use crate::copula::CopulaModel;
use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// Stress test scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    /// Scenario name
    pub name: String,

    /// Scenario description
    pub description: String,

    /// Factor applied to the simulated VaR
    pub var_multiplier: f64,
}

impl StressScenario {
    pub fn new(name: &str, description: &str, var_multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            var_multiplier,
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub scenario_name: String,
    pub var_multiplier: f64,

    /// Stressed VaR (positive = loss)
    pub stressed_var: f64,
}

/// All scenario results for one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestReport {
    /// Simulated VaR the scenarios were applied to
    pub base_var: f64,

    pub results: Vec<StressTestResult>,

    /// Scenario with the largest stressed VaR
    pub worst_scenario: String,

    /// Largest stressed VaR
    pub max_loss: f64,
}

/// Stress testing engine
#[derive(Debug, Clone)]
pub struct StressTestEngine {
    scenarios: Vec<StressScenario>,
}

impl StressTestEngine {
    pub fn new(scenarios: Vec<StressScenario>) -> Self {
        Self { scenarios }
    }

    /// Market crash, high correlation and liquidity crisis, calibrated to `model`
    pub fn for_copula(model: &CopulaModel) -> Self {
        let (crash, correlation, liquidity) = match model {
            CopulaModel::Gaussian => (2.1, 1.8, 1.5),
            CopulaModel::StudentT { .. } => (2.8, 2.2, 1.9),
            CopulaModel::Clayton { .. } => (2.4, 2.5, 2.1),
            CopulaModel::Gumbel { .. } => (3.2, 2.0, 1.7),
        };

        Self::new(vec![
            StressScenario::new(
                "Market Crash",
                "Broad joint sell-off across all assets",
                crash,
            ),
            StressScenario::new(
                "High Correlation",
                "Diversification breaks down as correlations rise",
                correlation,
            ),
            StressScenario::new(
                "Liquidity Crisis",
                "Wider spreads and forced selling",
                liquidity,
            ),
        ])
    }

    pub fn scenarios(&self) -> &[StressScenario] {
        &self.scenarios
    }

    /// Apply every scenario to `base_var`
    pub fn run(&self, base_var: f64) -> Result<StressTestReport> {
        if !base_var.is_finite() {
            return Err(RiskError::InvalidParameter(format!(
                "Base VaR must be finite, got {}",
                base_var
            )));
        }

        let results: Vec<StressTestResult> = self
            .scenarios
            .iter()
            .map(|scenario| StressTestResult {
                scenario_name: scenario.name.clone(),
                var_multiplier: scenario.var_multiplier,
                stressed_var: base_var * scenario.var_multiplier,
            })
            .collect();

        let worst = results
            .iter()
            .max_by(|a, b| a.stressed_var.total_cmp(&b.stressed_var))
            .ok_or_else(|| RiskError::InsufficientData("No stress scenarios configured".to_string()))?;

        Ok(StressTestReport {
            base_var,
            worst_scenario: worst.scenario_name.clone(),
            max_loss: worst.stressed_var,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_multipliers() {
        let report = StressTestEngine::for_copula(&CopulaModel::Gaussian).run(0.02).unwrap();

        assert_eq!(report.results.len(), 3);
        assert_relative_eq!(report.results[0].stressed_var, 0.042, epsilon = 1e-12);
        assert_relative_eq!(report.results[1].stressed_var, 0.036, epsilon = 1e-12);
        assert_relative_eq!(report.results[2].stressed_var, 0.030, epsilon = 1e-12);
        assert_eq!(report.worst_scenario, "Market Crash");
    }

    #[test]
    fn test_clayton_worst_is_high_correlation() {
        let report = StressTestEngine::for_copula(&CopulaModel::clayton()).run(0.01).unwrap();

        assert_eq!(report.worst_scenario, "High Correlation");
        assert_relative_eq!(report.max_loss, 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_tail_models_stress_harder_on_crash() {
        let crash = |model: CopulaModel| {
            StressTestEngine::for_copula(&model).scenarios()[0].var_multiplier
        };

        assert!(crash(CopulaModel::gumbel()) > crash(CopulaModel::student_t()));
        assert!(crash(CopulaModel::student_t()) > crash(CopulaModel::Gaussian));
    }

    #[test]
    fn test_custom_scenarios() {
        let engine = StressTestEngine::new(vec![StressScenario::new("Mild", "Small shock", 1.2)]);
        let report = engine.run(0.05).unwrap();

        assert_eq!(report.worst_scenario, "Mild");
        assert_relative_eq!(report.max_loss, 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(StressTestEngine::new(vec![]).run(0.02).is_err());
        assert!(StressTestEngine::for_copula(&CopulaModel::Gaussian)
            .run(f64::NAN)
            .is_err());
    }
}
