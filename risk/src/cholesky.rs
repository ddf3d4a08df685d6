//! Cholesky factorization with an explicit degeneracy policy
//!
//! Cholesky–Banachiewicz, row by row:
//! - `L[j][j] = sqrt(M[j][j] - Σ_{k<j} L[j][k]²)`
//! - `L[i][j] = (M[i][j] - Σ_{k<j} L[i][k]·L[j][k]) / L[j][j]`
//!
//! A negative (or NaN) radicand means the input is not positive
//! semi-definite. What happens then is decided by [`CholeskyPolicy`] and
//! recorded on the factor.

use crate::correlation::CorrelationMatrix;
use crate::error::{Result, RiskError};
use crate::stats::multiply_matrix_vector;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Behaviour when a pivot radicand is negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CholeskyPolicy {
    /// Clamp the radicand to zero and continue with a singular factor.
    /// Columns below a zero pivot are zeroed, so draws lose variance there.
    #[default]
    Clamp,

    /// Fail with [`RiskError::NotPositiveSemiDefinite`]
    Strict,
}

/// Lower-triangular factor `L` with `L·Lᵗ ≈ M`
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    lower: DMatrix<f64>,
    policy: CholeskyPolicy,
    clamped_pivots: Vec<usize>,
}

impl CholeskyFactor {
    /// Factor a symmetric matrix under the given policy
    ///
    /// Only the lower triangle of `matrix` is read. Non-finite entries are
    /// rejected under either policy.
    pub fn factorize(matrix: &DMatrix<f64>, policy: CholeskyPolicy) -> Result<Self> {
        if !matrix.is_square() {
            return Err(RiskError::InvalidParameter(format!(
                "Cholesky requires a square matrix, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if let Some(value) = matrix.iter().find(|v| !v.is_finite()) {
            return Err(RiskError::InvalidParameter(format!(
                "Cholesky input contains a non-finite entry: {}",
                value
            )));
        }

        let n = matrix.nrows();
        let mut lower = DMatrix::zeros(n, n);
        let mut clamped_pivots = Vec::new();

        for i in 0..n {
            for j in 0..=i {
                if i == j {
                    let sum: f64 = (0..j).map(|k| lower[(j, k)] * lower[(j, k)]).sum();
                    let radicand = matrix[(j, j)] - sum;

                    if radicand.is_nan() || radicand < 0.0 {
                        match policy {
                            CholeskyPolicy::Strict => {
                                return Err(RiskError::NotPositiveSemiDefinite {
                                    row: j,
                                    value: radicand,
                                });
                            }
                            CholeskyPolicy::Clamp => {
                                clamped_pivots.push(j);
                                lower[(j, j)] = 0.0;
                            }
                        }
                    } else {
                        lower[(j, j)] = radicand.sqrt();
                    }
                } else {
                    let sum: f64 = (0..j).map(|k| lower[(i, k)] * lower[(j, k)]).sum();
                    let pivot = lower[(j, j)];
                    lower[(i, j)] = if pivot != 0.0 {
                        (matrix[(i, j)] - sum) / pivot
                    } else {
                        0.0
                    };
                }
            }
        }

        Ok(Self {
            lower,
            policy,
            clamped_pivots,
        })
    }

    /// Factor a correlation matrix
    pub fn of_correlation(correlation: &CorrelationMatrix, policy: CholeskyPolicy) -> Result<Self> {
        Self::factorize(correlation.as_matrix(), policy)
    }

    pub fn lower(&self) -> &DMatrix<f64> {
        &self.lower
    }

    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    pub fn policy(&self) -> CholeskyPolicy {
        self.policy
    }

    /// Pivot indices whose radicand was negative and clamped to zero
    pub fn clamped_pivots(&self) -> &[usize] {
        &self.clamped_pivots
    }

    pub fn is_degraded(&self) -> bool {
        !self.clamped_pivots.is_empty()
    }

    /// Inject correlation into independent draws: `L·z`
    pub fn correlate(&self, independent: &[f64]) -> Result<Vec<f64>> {
        multiply_matrix_vector(&self.lower, independent)
    }

    /// Rebuild `L·Lᵗ`
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.lower * self.lower.transpose()
    }
}
