//! Copula models and sampling
//!
//! Turns a vector of independent uniform(0,1) draws into dependent variates:
//! - Gaussian: inverse normal CDF, then Cholesky correlation injection
//! - Student-t: Cornish–Fisher t quantile, then Cholesky correlation injection
//! - Clayton: bivariate Archimedean, lower-tail dependence
//! - Gumbel: bivariate Archimedean, upper-tail dependence
//!
//! Archimedean models on more than two coordinates transform the first pair
//! and pass the remaining coordinates through unchanged. The result is then
//! an approximation; [`CopulaModel::is_exact_for`] tells callers when to flag it.

use crate::cholesky::{CholeskyFactor, CholeskyPolicy};
use crate::correlation::CorrelationMatrix;
use crate::error::{Result, RiskError};
use crate::stats::inverse_standard_normal_cdf;
use rand::distributions::Open01;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Dependence model used by the Monte Carlo engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CopulaModel {
    Gaussian,

    /// Student-t dependence with heavier joint tails than Gaussian
    StudentT {
        /// Degrees of freedom (> 0); lower means heavier tails
        degrees_of_freedom: f64,
    },

    /// Clayton copula, θ > 0
    Clayton { theta: f64 },

    /// Gumbel copula, θ ≥ 1 (θ = 1 is independence)
    Gumbel { theta: f64 },
}

impl CopulaModel {
    /// Student-t with 5 degrees of freedom
    pub fn student_t() -> Self {
        CopulaModel::StudentT {
            degrees_of_freedom: 5.0,
        }
    }

    /// Clayton with θ = 2
    pub fn clayton() -> Self {
        CopulaModel::Clayton { theta: 2.0 }
    }

    /// Gumbel with θ = 1.5
    pub fn gumbel() -> Self {
        CopulaModel::Gumbel { theta: 1.5 }
    }

    /// Short identifier used in reports and logs
    pub fn name(&self) -> &'static str {
        match self {
            CopulaModel::Gaussian => "gaussian",
            CopulaModel::StudentT { .. } => "student-t",
            CopulaModel::Clayton { .. } => "clayton",
            CopulaModel::Gumbel { .. } => "gumbel",
        }
    }

    /// Check the model parameters are inside their domain
    pub fn validate(&self) -> Result<()> {
        match *self {
            CopulaModel::Gaussian => Ok(()),
            CopulaModel::StudentT { degrees_of_freedom } => {
                if degrees_of_freedom.is_finite() && degrees_of_freedom > 0.0 {
                    Ok(())
                } else {
                    Err(RiskError::InvalidParameter(format!(
                        "Student-t degrees of freedom must be positive, got {}",
                        degrees_of_freedom
                    )))
                }
            }
            CopulaModel::Clayton { theta } => {
                if theta.is_finite() && theta > 0.0 {
                    Ok(())
                } else {
                    Err(RiskError::InvalidParameter(format!(
                        "Clayton theta must be positive, got {}",
                        theta
                    )))
                }
            }
            CopulaModel::Gumbel { theta } => {
                if theta.is_finite() && theta >= 1.0 {
                    Ok(())
                } else {
                    Err(RiskError::InvalidParameter(format!(
                        "Gumbel theta must be at least 1, got {}",
                        theta
                    )))
                }
            }
        }
    }

    /// Whether the model is bivariate-only
    pub fn is_archimedean(&self) -> bool {
        matches!(self, CopulaModel::Clayton { .. } | CopulaModel::Gumbel { .. })
    }

    /// Whether sampling `n_assets` coordinates is exact rather than the
    /// first-pair approximation
    pub fn is_exact_for(&self, n_assets: usize) -> bool {
        !self.is_archimedean() || n_assets == 2
    }

    /// Number of free parameters, for information criteria
    ///
    /// Elliptical models count one parameter per correlation pair (plus the
    /// degrees of freedom for Student-t); Archimedean models count two.
    pub fn parameter_count(&self, n_assets: usize) -> usize {
        let pairs = n_assets * n_assets.saturating_sub(1) / 2;
        match self {
            CopulaModel::Gaussian => pairs,
            CopulaModel::StudentT { .. } => pairs + 1,
            CopulaModel::Clayton { .. } | CopulaModel::Gumbel { .. } => 2,
        }
    }
}

impl std::fmt::Display for CopulaModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopulaModel::Gaussian => write!(f, "gaussian"),
            CopulaModel::StudentT { degrees_of_freedom } => {
                write!(f, "student-t(df={})", degrees_of_freedom)
            }
            CopulaModel::Clayton { theta } => write!(f, "clayton(theta={})", theta),
            CopulaModel::Gumbel { theta } => write!(f, "gumbel(theta={})", theta),
        }
    }
}

/// Uniforms are pinned this far inside (0, 1) before the inverse normal CDF
const UNIFORM_EDGE: f64 = 1e-12;

/// Scale on which a [`CopulaDraw`] is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariateScale {
    /// Correlated standard-normal (or t-like) values
    Normal,

    /// Values in (0, 1)
    Uniform,
}

/// One dependent draw from a copula
#[derive(Debug, Clone, PartialEq)]
pub struct CopulaDraw {
    pub values: Vec<f64>,
    pub scale: VariateScale,
}

impl CopulaDraw {
    /// Values mapped onto the standard-normal scale
    pub fn to_normal(&self) -> Vec<f64> {
        match self.scale {
            VariateScale::Normal => self.values.clone(),
            VariateScale::Uniform => self
                .values
                .iter()
                .map(|&u| inverse_standard_normal_cdf(u.clamp(UNIFORM_EDGE, 1.0 - UNIFORM_EDGE)))
                .collect(),
        }
    }
}

/// Sampler bound to one model and one correlation matrix
///
/// The Cholesky factor is computed once at construction and shared by every
/// draw; the sampler holds no mutable state and can be used from many threads.
#[derive(Debug, Clone)]
pub struct CopulaSampler {
    model: CopulaModel,
    dim: usize,
    factor: Option<CholeskyFactor>,
}

impl CopulaSampler {
    pub fn new(
        model: CopulaModel,
        correlation: &CorrelationMatrix,
        policy: CholeskyPolicy,
    ) -> Result<Self> {
        model.validate()?;

        let factor = match model {
            CopulaModel::Gaussian | CopulaModel::StudentT { .. } => {
                Some(CholeskyFactor::of_correlation(correlation, policy)?)
            }
            CopulaModel::Clayton { .. } | CopulaModel::Gumbel { .. } => None,
        };

        Ok(Self {
            model,
            dim: correlation.dim(),
            factor,
        })
    }

    pub fn model(&self) -> CopulaModel {
        self.model
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Cholesky factor, present for elliptical models only
    pub fn factor(&self) -> Option<&CholeskyFactor> {
        self.factor.as_ref()
    }

    /// Transform independent uniforms into dependent variates
    pub fn sample(&self, uniforms: &[f64]) -> Result<CopulaDraw> {
        if uniforms.len() != self.dim {
            return Err(RiskError::InvalidParameter(format!(
                "Expected {} uniforms, got {}",
                self.dim,
                uniforms.len()
            )));
        }

        match (self.model, &self.factor) {
            (CopulaModel::Gaussian, Some(factor)) => {
                let z: Vec<f64> = uniforms.iter().map(|&u| inverse_standard_normal_cdf(u)).collect();
                Ok(CopulaDraw {
                    values: factor.correlate(&z)?,
                    scale: VariateScale::Normal,
                })
            }
            (CopulaModel::StudentT { degrees_of_freedom }, Some(factor)) => {
                let t: Vec<f64> = uniforms
                    .iter()
                    .map(|&u| student_t_quantile(u, degrees_of_freedom))
                    .collect();
                Ok(CopulaDraw {
                    values: factor.correlate(&t)?,
                    scale: VariateScale::Normal,
                })
            }
            (CopulaModel::Clayton { theta }, _) => Ok(CopulaDraw {
                values: transform_first_pair(uniforms, |u1, u2| clayton_pair(u1, u2, theta)),
                scale: VariateScale::Uniform,
            }),
            (CopulaModel::Gumbel { theta }, _) => Ok(CopulaDraw {
                values: transform_first_pair(uniforms, |u1, u2| gumbel_pair(u1, u2, theta)),
                scale: VariateScale::Uniform,
            }),
            (model, None) => Err(RiskError::CalculationError(format!(
                "Sampler for {} was built without a Cholesky factor",
                model.name()
            ))),
        }
    }

    /// Draw fresh open-interval uniforms from `rng` and transform them
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CopulaDraw> {
        let uniforms: Vec<f64> = (0..self.dim).map(|_| rng.sample(Open01)).collect();
        self.sample(&uniforms)
    }
}

/// Approximate Student-t quantile via a Cornish–Fisher expansion around the
/// normal quantile: `z + (z³+z)/(4ν) + (5z⁵+16z³+3z)/(96ν²)`
pub fn student_t_quantile(p: f64, degrees_of_freedom: f64) -> f64 {
    let z = inverse_standard_normal_cdf(p);
    if z.is_infinite() {
        return z;
    }

    let z3 = z.powi(3);
    let z5 = z.powi(5);
    let nu = degrees_of_freedom;
    z + (z3 + z) / (4.0 * nu) + (5.0 * z5 + 16.0 * z3 + 3.0 * z) / (96.0 * nu * nu)
}

/// Clayton bivariate transform, shared by both coordinates:
/// `(1 + max(0, u1^-θ + u2^-θ - 2))^(-1/θ)`
pub fn clayton_pair(u1: f64, u2: f64, theta: f64) -> f64 {
    let t = (u1.powf(-theta) + u2.powf(-theta) - 2.0).max(0.0);
    (1.0 + t).powf(-1.0 / theta)
}

/// Gumbel bivariate transform, shared by both coordinates:
/// `exp(-((-ln u1)^θ + (-ln u2)^θ)^(1/θ))`
pub fn gumbel_pair(u1: f64, u2: f64, theta: f64) -> f64 {
    let t = (-u1.ln()).powf(theta) + (-u2.ln()).powf(theta);
    (-t.powf(1.0 / theta)).exp()
}

fn transform_first_pair<F>(uniforms: &[f64], pair: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let mut values = uniforms.to_vec();
    if values.len() >= 2 {
        let joint = pair(values[0], values[1]);
        values[0] = joint;
        values[1] = joint;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::pearson_correlation;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assets(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("asset{}", i)).collect()
    }

    fn pair_correlation(rho: f64) -> CorrelationMatrix {
        CorrelationMatrix::from_rows(assets(2), vec![vec![1.0, rho], vec![rho, 1.0]]).unwrap()
    }

    #[test]
    fn test_gaussian_identity_is_independent_normals() {
        let corr = CorrelationMatrix::identity(assets(3));
        let sampler = CopulaSampler::new(CopulaModel::Gaussian, &corr, CholeskyPolicy::Strict).unwrap();

        let uniforms = [0.1, 0.5, 0.975];
        let draw = sampler.sample(&uniforms).unwrap();

        assert_eq!(draw.scale, VariateScale::Normal);
        for (value, u) in draw.values.iter().zip(uniforms) {
            assert_relative_eq!(*value, inverse_standard_normal_cdf(u), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_gaussian_identity_draws_uncorrelated() {
        let corr = CorrelationMatrix::identity(assets(2));
        let sampler = CopulaSampler::new(CopulaModel::Gaussian, &corr, CholeskyPolicy::Strict).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let (xs, ys): (Vec<f64>, Vec<f64>) = (0..20_000)
            .map(|_| {
                let d = sampler.sample_with(&mut rng).unwrap();
                (d.values[0], d.values[1])
            })
            .unzip();

        assert!(pearson_correlation(&xs, &ys).unwrap().abs() < 0.03);
    }

    #[test]
    fn test_gaussian_injects_target_correlation() {
        let sampler =
            CopulaSampler::new(CopulaModel::Gaussian, &pair_correlation(0.8), CholeskyPolicy::Strict)
                .unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let (xs, ys): (Vec<f64>, Vec<f64>) = (0..20_000)
            .map(|_| {
                let d = sampler.sample_with(&mut rng).unwrap();
                (d.values[0], d.values[1])
            })
            .unzip();

        assert!((pearson_correlation(&xs, &ys).unwrap() - 0.8).abs() < 0.03);
    }

    #[test]
    fn test_student_t_heavier_tails_than_normal() {
        for p in [0.001, 0.01, 0.99, 0.999] {
            let z = inverse_standard_normal_cdf(p);
            let t = student_t_quantile(p, 5.0);
            assert!(t.abs() > z.abs());
            assert_eq!(t.signum(), z.signum());
        }
        assert_eq!(student_t_quantile(0.0, 5.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_student_t_converges_to_normal() {
        let z = inverse_standard_normal_cdf(0.05);
        assert_relative_eq!(student_t_quantile(0.05, 1e6), z, epsilon = 1e-5);
    }

    #[test]
    fn test_clayton_pair_formula() {
        let u = clayton_pair(0.3, 0.6, 2.0);
        let expected = (0.3f64.powf(-2.0) + 0.6f64.powf(-2.0) - 1.0).powf(-0.5);
        assert_relative_eq!(u, expected, epsilon = 1e-12);

        // Joint small values stay small
        assert!(clayton_pair(0.01, 0.01, 2.0) < 0.01);
    }

    #[test]
    fn test_clayton_floor_keeps_domain() {
        // u1 = u2 = 1 gives t = 0 exactly; no NaN
        assert_relative_eq!(clayton_pair(1.0, 1.0, 2.0), 1.0);
    }

    #[test]
    fn test_gumbel_pair_formula() {
        let u = gumbel_pair(0.5, 0.5, 1.5);
        let expected = 2f64.powf(-(2f64.powf(2.0 / 3.0)));
        assert_relative_eq!(u, expected, epsilon = 1e-12);

        // theta = 1 is the independence copula C(u1, u2) = u1 * u2
        assert_relative_eq!(gumbel_pair(0.4, 0.7, 1.0), 0.28, epsilon = 1e-12);
    }

    #[test]
    fn test_archimedean_bivariate_is_exact() {
        let sampler =
            CopulaSampler::new(CopulaModel::clayton(), &pair_correlation(0.0), CholeskyPolicy::Clamp)
                .unwrap();
        let draw = sampler.sample(&[0.2, 0.7]).unwrap();

        assert_eq!(draw.scale, VariateScale::Uniform);
        assert_eq!(draw.values[0], draw.values[1]);
        assert!(sampler.factor().is_none());
        assert!(CopulaModel::clayton().is_exact_for(2));
    }

    #[test]
    fn test_archimedean_first_pair_then_passthrough() {
        let corr = CorrelationMatrix::identity(assets(4));
        let sampler = CopulaSampler::new(CopulaModel::gumbel(), &corr, CholeskyPolicy::Clamp).unwrap();

        let draw = sampler.sample(&[0.2, 0.3, 0.4, 0.9]).unwrap();
        let joint = gumbel_pair(0.2, 0.3, 1.5);

        assert_eq!(draw.values, vec![joint, joint, 0.4, 0.9]);
        assert!(!CopulaModel::gumbel().is_exact_for(4));
    }

    #[test]
    fn test_archimedean_single_asset_passthrough() {
        let corr = CorrelationMatrix::identity(assets(1));
        let sampler = CopulaSampler::new(CopulaModel::clayton(), &corr, CholeskyPolicy::Clamp).unwrap();

        assert_eq!(sampler.sample(&[0.42]).unwrap().values, vec![0.42]);
        assert!(!CopulaModel::clayton().is_exact_for(1));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let corr = pair_correlation(0.2);
        for model in [
            CopulaModel::StudentT { degrees_of_freedom: 0.0 },
            CopulaModel::Clayton { theta: -1.0 },
            CopulaModel::Gumbel { theta: 0.5 },
            CopulaModel::Clayton { theta: f64::NAN },
        ] {
            assert!(CopulaSampler::new(model, &corr, CholeskyPolicy::Clamp).is_err());
        }
    }

    #[test]
    fn test_wrong_uniform_count() {
        let sampler =
            CopulaSampler::new(CopulaModel::Gaussian, &pair_correlation(0.5), CholeskyPolicy::Clamp)
                .unwrap();
        assert!(sampler.sample(&[0.5]).is_err());
    }

    #[test]
    fn test_parameter_count() {
        assert_eq!(CopulaModel::Gaussian.parameter_count(4), 6);
        assert_eq!(CopulaModel::student_t().parameter_count(4), 7);
        assert_eq!(CopulaModel::clayton().parameter_count(4), 2);
        assert_eq!(CopulaModel::Gaussian.parameter_count(1), 0);
    }

    #[test]
    fn test_to_normal_maps_uniforms() {
        let draw = CopulaDraw {
            values: vec![0.5, 0.975],
            scale: VariateScale::Uniform,
        };
        let normal = draw.to_normal();
        assert_eq!(normal[0], 0.0);
        assert_relative_eq!(normal[1], 1.959964, epsilon = 1e-5);

        // Archimedean outputs can round onto the boundary
        let edge = CopulaDraw {
            values: vec![0.0, 1.0],
            scale: VariateScale::Uniform,
        };
        assert!(edge.to_normal().iter().all(|z| z.is_finite()));
    }

    #[test]
    fn test_model_yaml_tagging() {
        let model: CopulaModel = serde_yaml::from_str("type: StudentT\ndegrees_of_freedom: 4.0\n").unwrap();
        assert_eq!(model, CopulaModel::StudentT { degrees_of_freedom: 4.0 });

        let model: CopulaModel = serde_yaml::from_str("type: Gaussian\n").unwrap();
        assert_eq!(model, CopulaModel::Gaussian);
        assert_eq!(model.name(), "gaussian");
    }
}
