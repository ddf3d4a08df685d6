//! Dependence and model diagnostics
//!
//! - Goodness of fit: two-sample Kolmogorov–Smirnov statistic
//! - Upper / lower tail dependence: empirical conditional exceedance ratios
//! - Kendall's tau: concordant minus discordant pairs over all pairs
//! - AIC / BIC from a caller-supplied log-likelihood
//!
//! Tail-dependence thresholds are on the uniform scale, so raw returns should
//! go through [`pseudo_observations`] first.

use crate::copula::CopulaModel;
use crate::error::{Result, RiskError};
use crate::returns::ReturnMatrix;
use serde::{Deserialize, Serialize};

/// Default threshold for [`upper_tail_dependence`]
pub const DEFAULT_UPPER_THRESHOLD: f64 = 0.95;

/// Default threshold for [`lower_tail_dependence`]
pub const DEFAULT_LOWER_THRESHOLD: f64 = 0.05;

/// Diagnostics attached to a risk report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    /// KS distance between historical and simulated portfolio returns
    pub goodness_of_fit: f64,

    /// Upper tail dependence of the first asset pair (None with one asset)
    pub upper_tail_dependence: Option<f64>,

    /// Lower tail dependence of the first asset pair (None with one asset)
    pub lower_tail_dependence: Option<f64>,

    /// Kendall's tau of the first asset pair (None with one asset)
    pub kendalls_tau: Option<f64>,

    /// Free parameters of the copula model
    pub parameter_count: usize,

    /// Present only when the caller supplied a log-likelihood
    pub aic: Option<f64>,
    pub bic: Option<f64>,
}

impl ModelDiagnostics {
    pub fn evaluate(
        historical_portfolio: &[f64],
        simulated: &[f64],
        returns: &ReturnMatrix,
        model: &CopulaModel,
        log_likelihood: Option<f64>,
    ) -> Result<Self> {
        let goodness_of_fit = goodness_of_fit(historical_portfolio, simulated)?;

        let (upper, lower, tau) = match (returns.series_at(0), returns.series_at(1)) {
            (Some(x), Some(y)) => {
                let ux = pseudo_observations(x);
                let uy = pseudo_observations(y);
                (
                    Some(upper_tail_dependence(&ux, &uy, DEFAULT_UPPER_THRESHOLD)?),
                    Some(lower_tail_dependence(&ux, &uy, DEFAULT_LOWER_THRESHOLD)?),
                    Some(kendalls_tau(x, y)?),
                )
            }
            _ => (None, None, None),
        };

        let parameter_count = model.parameter_count(returns.num_assets());
        let (aic, bic) = match log_likelihood {
            Some(ll) => (
                Some(aic(ll, parameter_count)),
                Some(bic(ll, parameter_count, returns.num_observations())?),
            ),
            None => (None, None),
        };

        Ok(Self {
            goodness_of_fit,
            upper_tail_dependence: upper,
            lower_tail_dependence: lower,
            kendalls_tau: tau,
            parameter_count,
            aic,
            bic,
        })
    }
}

/// Two-sample Kolmogorov–Smirnov statistic
///
/// Maximum absolute difference between the empirical CDFs of `a` and `b`,
/// evaluated at every distinct value of their union.
pub fn goodness_of_fit(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(RiskError::InsufficientData(
            "Goodness of fit needs two non-empty samples".to_string(),
        ));
    }

    let mut a_sorted = a.to_vec();
    a_sorted.sort_by(|x, y| x.total_cmp(y));
    let mut b_sorted = b.to_vec();
    b_sorted.sort_by(|x, y| x.total_cmp(y));

    let mut points: Vec<f64> = a_sorted.iter().chain(&b_sorted).copied().collect();
    points.sort_by(|x, y| x.total_cmp(y));
    points.dedup();

    let na = a_sorted.len() as f64;
    let nb = b_sorted.len() as f64;

    let statistic = points
        .iter()
        .map(|&x| {
            let fa = a_sorted.partition_point(|v| *v <= x) as f64 / na;
            let fb = b_sorted.partition_point(|v| *v <= x) as f64 / nb;
            (fa - fb).abs()
        })
        .fold(0.0, f64::max);

    Ok(statistic)
}

/// Empirical upper tail dependence: `count(x > u ∧ y > u) / (n(1 − u))`
pub fn upper_tail_dependence(x: &[f64], y: &[f64], threshold: f64) -> Result<f64> {
    let n = check_pair(x, y)?;
    check_threshold(threshold)?;

    let joint = x
        .iter()
        .zip(y)
        .filter(|(a, b)| **a > threshold && **b > threshold)
        .count();
    Ok(joint as f64 / (n as f64 * (1.0 - threshold)))
}

/// Empirical lower tail dependence: `count(x < u ∧ y < u) / (n·u)`
pub fn lower_tail_dependence(x: &[f64], y: &[f64], threshold: f64) -> Result<f64> {
    let n = check_pair(x, y)?;
    check_threshold(threshold)?;

    let joint = x
        .iter()
        .zip(y)
        .filter(|(a, b)| **a < threshold && **b < threshold)
        .count();
    Ok(joint as f64 / (n as f64 * threshold))
}

/// Kendall's tau-a over all unordered index pairs
///
/// Pairs tied in either coordinate count as neither concordant nor discordant.
pub fn kendalls_tau(x: &[f64], y: &[f64]) -> Result<f64> {
    let n = check_pair(x, y)?;
    if n < 2 {
        return Err(RiskError::InsufficientData(
            "Kendall's tau needs at least 2 observations".to_string(),
        ));
    }

    let mut concordant = 0i64;
    let mut discordant = 0i64;
    for i in 0..n {
        for j in (i + 1)..n {
            let s = (x[i] - x[j]) * (y[i] - y[j]);
            if s > 0.0 {
                concordant += 1;
            } else if s < 0.0 {
                discordant += 1;
            }
        }
    }

    let pairs = (n * (n - 1) / 2) as f64;
    Ok((concordant - discordant) as f64 / pairs)
}

/// Akaike information criterion: `2k − 2·ll`
pub fn aic(log_likelihood: f64, parameters: usize) -> f64 {
    2.0 * parameters as f64 - 2.0 * log_likelihood
}

/// Bayesian information criterion: `ln(n)·k − 2·ll`
pub fn bic(log_likelihood: f64, parameters: usize, observations: usize) -> Result<f64> {
    if observations == 0 {
        return Err(RiskError::InsufficientData(
            "BIC needs at least one observation".to_string(),
        ));
    }
    Ok((observations as f64).ln() * parameters as f64 - 2.0 * log_likelihood)
}

/// Map a sample onto (0, 1) by `rank / (n + 1)`, averaging tied ranks
pub fn pseudo_observations(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| x[i].total_cmp(&x[j]));

    let scale = n as f64 + 1.0;
    let mut pseudo = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && x[order[end]] == x[order[start]] {
            end += 1;
        }
        // ranks start+1 ..= end share their mean
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            pseudo[idx] = rank / scale;
        }
        start = end;
    }
    pseudo
}

fn check_pair(x: &[f64], y: &[f64]) -> Result<usize> {
    if x.len() != y.len() {
        return Err(RiskError::InvalidParameter(format!(
            "Series lengths differ: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(RiskError::InsufficientData("Empty series".to_string()));
    }
    Ok(x.len())
}

fn check_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold < 1.0 {
        Ok(())
    } else {
        Err(RiskError::InvalidParameter(format!(
            "Tail threshold must be in (0, 1), got {}",
            threshold
        )))
    }
}
