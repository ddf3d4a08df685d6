//! Risk metrics over a return series
//!
//! Pure functions usable on historical or simulated returns:
//! - Value at Risk: empirical lower-tail quantile, reported as a positive loss
//! - Conditional VaR (Expected Shortfall): mean of the tail up to the VaR cutoff
//! - Volatility: population standard deviation (not annualized)
//! - Maximum Drawdown: largest peak-to-trough decline of compounded value
//! - Sharpe Ratio: annualized over 252 trading periods
//!
//! Confidence levels are percentages, e.g. 95.0. Every function rejects an
//! empty series with [`RiskError::InsufficientData`].

use crate::error::{Result, RiskError};
use crate::stats::{is_constant, mean, population_std_dev};
use serde::{Deserialize, Serialize};

/// Trading periods per year used for annualization
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// The five headline metrics of a return series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Value at Risk (positive = loss)
    pub var: f64,

    /// Conditional Value at Risk (positive = loss), always >= `var`
    pub cvar: f64,

    /// Population standard deviation of the series
    pub volatility: f64,

    /// Maximum drawdown as a fraction of the running peak
    pub max_drawdown: f64,

    /// Annualized Sharpe ratio
    pub sharpe_ratio: f64,
}

impl RiskMetrics {
    /// Compute all metrics, sorting the series once
    pub fn from_returns(returns: &[f64], confidence: f64, risk_free_rate: f64) -> Result<Self> {
        require_non_empty(returns)?;
        validate_confidence(confidence)?;

        let sorted = sorted_ascending(returns);
        let index = tail_index(sorted.len(), confidence);

        Ok(Self {
            var: -sorted[index],
            cvar: -mean(&sorted[..=index]),
            volatility: population_std_dev(returns),
            max_drawdown: max_drawdown(returns)?,
            sharpe_ratio: sharpe_ratio(returns, risk_free_rate)?,
        })
    }
}

/// Value at Risk at `confidence` percent
///
/// Sorts ascending, takes index `floor((100 - c) / 100 * len)` clamped to the
/// series, and negates the value found there.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    require_non_empty(returns)?;
    validate_confidence(confidence)?;

    let sorted = sorted_ascending(returns);
    Ok(-sorted[tail_index(sorted.len(), confidence)])
}

/// Conditional Value at Risk (Expected Shortfall) at `confidence` percent
///
/// Average of every sorted value at or below the VaR index, negated.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    require_non_empty(returns)?;
    validate_confidence(confidence)?;

    let sorted = sorted_ascending(returns);
    let index = tail_index(sorted.len(), confidence);
    Ok(-mean(&sorted[..=index]))
}

/// Population standard deviation
pub fn volatility(returns: &[f64]) -> Result<f64> {
    require_non_empty(returns)?;
    Ok(population_std_dev(returns))
}

/// Maximum drawdown of the compounded value path
///
/// Value starts at 1.0 and compounds by `(1 + r)`; the result is the largest
/// `1 - value / peak` seen, 0.0 for a path that never falls.
pub fn max_drawdown(returns: &[f64]) -> Result<f64> {
    require_non_empty(returns)?;

    let mut value = 1.0;
    let mut peak = 1.0;
    let mut max_dd: f64 = 0.0;

    for r in returns {
        value *= 1.0 + r;
        if value > peak {
            peak = value;
        }
        max_dd = max_dd.max(1.0 - value / peak);
    }

    Ok(max_dd)
}

/// Annualized Sharpe ratio: `(mean·252 − rf) / (σ·√252)`
///
/// `risk_free_rate` is annual. Returns 0.0 when the series is constant
/// (see [`is_constant`]).
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> Result<f64> {
    require_non_empty(returns)?;

    if is_constant(returns) {
        return Ok(0.0);
    }
    let std_dev = population_std_dev(returns);

    let excess = mean(returns) * TRADING_DAYS_PER_YEAR - risk_free_rate;
    Ok(excess / (std_dev * TRADING_DAYS_PER_YEAR.sqrt()))
}

/// Confidence must be a percentage strictly inside (0, 100)
pub fn validate_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 100.0 {
        Ok(())
    } else {
        Err(RiskError::InvalidConfidenceLevel(confidence))
    }
}

/// Index of the VaR cutoff in an ascending series of length `len > 0`
fn tail_index(len: usize, confidence: f64) -> usize {
    // Stay in percent space: (100 - 80) * 5 / 100 is exactly 1.0 whereas
    // (1 - 0.8) * 5 is not. The epsilon absorbs fractional percentages.
    let raw = (100.0 - confidence) * len as f64 / 100.0;
    let index = (raw + 1e-9).floor() as usize;
    index.min(len - 1)
}

fn sorted_ascending(returns: &[f64]) -> Vec<f64> {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn require_non_empty(returns: &[f64]) -> Result<()> {
    if returns.is_empty() {
        return Err(RiskError::InsufficientData("No returns data".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn create_test_returns() -> Vec<f64> {
        vec![
            0.01, 0.02, -0.01, 0.015, -0.005,
            0.03, -0.02, 0.01, 0.005, -0.01,
            0.02, 0.01, -0.015, 0.025, 0.01,
            -0.005, 0.015, 0.02, -0.01, 0.005,
        ]
    }

    #[test]
    fn test_var_worked_example() {
        let returns = vec![-0.05, -0.02, 0.01, 0.03, 0.04];

        // floor(0.2 * 5) = 1 -> sorted[1] = -0.02
        assert_eq!(value_at_risk(&returns, 80.0).unwrap(), 0.02);
    }

    #[test]
    fn test_cvar_worked_example() {
        let returns = vec![0.04, -0.02, 0.03, -0.05, 0.01];
        let cvar = conditional_value_at_risk(&returns, 80.0).unwrap();

        assert_relative_eq!(cvar, 0.035, epsilon = 1e-12);
    }

    #[test]
    fn test_var_index_clamped() {
        // Very low confidence would index past the end
        let returns = vec![-0.01, 0.02];
        assert_eq!(value_at_risk(&returns, 0.001).unwrap(), -0.02);

        // Single observation
        assert_eq!(value_at_risk(&[-0.03], 99.0).unwrap(), 0.03);
        assert_eq!(conditional_value_at_risk(&[-0.03], 99.0).unwrap(), 0.03);
    }

    #[test]
    fn test_fractional_confidence_index() {
        // (100 - 99.9) * 1000 / 100 should land on index 1
        let returns: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        assert_eq!(value_at_risk(&returns, 99.9).unwrap(), -1.0);
    }

    #[test]
    fn test_invalid_confidence_level() {
        let returns = create_test_returns();
        for c in [0.0, 100.0, -5.0, 150.0, f64::NAN] {
            assert!(matches!(
                value_at_risk(&returns, c),
                Err(RiskError::InvalidConfidenceLevel(_))
            ));
        }
    }

    #[test]
    fn test_insufficient_data() {
        assert!(value_at_risk(&[], 95.0).is_err());
        assert!(conditional_value_at_risk(&[], 95.0).is_err());
        assert!(volatility(&[]).is_err());
        assert!(max_drawdown(&[]).is_err());
        assert!(sharpe_ratio(&[], 0.02).is_err());
        assert!(RiskMetrics::from_returns(&[], 95.0, 0.02).is_err());
    }

    #[test]
    fn test_volatility_is_population() {
        let returns = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(volatility(&returns).unwrap(), 2.0);
    }

    #[test]
    fn test_max_drawdown_increasing_path() {
        let returns = vec![0.01, 0.02, 0.005, 0.03];
        assert_eq!(max_drawdown(&returns).unwrap(), 0.0);
    }

    #[test]
    fn test_max_drawdown_single_loss() {
        assert_relative_eq!(max_drawdown(&[-0.1]).unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(max_drawdown(&[-0.35]).unwrap(), 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown_compounds() {
        let returns = vec![0.10, 0.05, -0.20, -0.10, 0.15, 0.05];
        let max_dd = max_drawdown(&returns).unwrap();

        // Peak after +10%, +5%; trough after -20%, -10%: 1 - 0.8 * 0.9
        assert_relative_eq!(max_dd, 0.28, epsilon = 1e-12);
    }

    #[test]
    fn test_sharpe_ratio() {
        let sharpe = sharpe_ratio(&create_test_returns(), 0.02).unwrap();
        assert!(sharpe > 0.0);

        let returns = create_test_returns();
        let expected = (mean(&returns) * 252.0 - 0.02) / (population_std_dev(&returns) * 252f64.sqrt());
        assert_relative_eq!(sharpe, expected);
    }

    #[test]
    fn test_zero_volatility_sharpe_fallback() {
        let returns = vec![0.01; 20];
        assert_eq!(sharpe_ratio(&returns, 0.02).unwrap(), 0.0);
        assert_eq!(sharpe_ratio(&[0.0; 5], 0.02).unwrap(), 0.0);
    }

    #[test]
    fn test_flat_series_metrics_stay_bounded() {
        let returns = vec![0.003; 250];
        let metrics = RiskMetrics::from_returns(&returns, 95.0, 0.02).unwrap();

        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert!(metrics.volatility < 1e-15);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn test_from_returns_matches_individual_functions() {
        let returns = create_test_returns();
        let metrics = RiskMetrics::from_returns(&returns, 95.0, 0.02).unwrap();

        assert_eq!(metrics.var, value_at_risk(&returns, 95.0).unwrap());
        assert_eq!(metrics.cvar, conditional_value_at_risk(&returns, 95.0).unwrap());
        assert_eq!(metrics.volatility, volatility(&returns).unwrap());
        assert_eq!(metrics.max_drawdown, max_drawdown(&returns).unwrap());
        assert_eq!(metrics.sharpe_ratio, sharpe_ratio(&returns, 0.02).unwrap());
    }

    proptest! {
        #[test]
        fn prop_cvar_at_least_var(
            returns in prop::collection::vec(-0.2f64..0.2, 1..200),
            confidence in 50.0f64..99.9,
        ) {
            let var = value_at_risk(&returns, confidence).unwrap();
            let cvar = conditional_value_at_risk(&returns, confidence).unwrap();
            prop_assert!(cvar >= var - 1e-12);
        }

        #[test]
        fn prop_var_monotonic_in_confidence(
            returns in prop::collection::vec(-0.2f64..0.2, 1..200),
            low in 50.0f64..90.0,
            delta in 0.0f64..9.9,
        ) {
            let high = low + delta;
            prop_assert!(value_at_risk(&returns, high).unwrap() >= value_at_risk(&returns, low).unwrap());
            prop_assert!(
                conditional_value_at_risk(&returns, high).unwrap()
                    >= conditional_value_at_risk(&returns, low).unwrap() - 1e-12
            );
        }

        #[test]
        fn prop_drawdown_in_unit_interval(returns in prop::collection::vec(-0.5f64..0.5, 1..100)) {
            let dd = max_drawdown(&returns).unwrap();
            prop_assert!((0.0..1.0).contains(&dd));
        }
    }
}
