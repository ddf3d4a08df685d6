//! Correlation matrix estimation
//!
//! Builds the Pearson correlation matrix of a [`ReturnMatrix`]. Rows and
//! columns follow the asset insertion order of the input.

use crate::error::{Result, RiskError};
use crate::returns::ReturnMatrix;
use crate::stats::{is_constant, pearson_correlation};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Tolerance for symmetry and unit-diagonal checks on caller-supplied matrices
const VALIDATION_TOLERANCE: f64 = 1e-9;

/// Square, symmetric correlation matrix with a unit diagonal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CorrelationTable", into = "CorrelationTable")]
pub struct CorrelationMatrix {
    assets: Vec<String>,
    matrix: DMatrix<f64>,
}

/// Serialized form: asset labels plus row-major entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationTable {
    pub assets: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Estimate the correlation matrix of aligned return series
    ///
    /// Off-diagonal entries are Pearson correlations, mirrored so the result
    /// is symmetric by construction. Assets with zero variance correlate 0.0
    /// with everything else; see [`zero_variance_assets`].
    pub fn estimate(returns: &ReturnMatrix) -> Result<Self> {
        returns.require_observations(2)?;

        let series: Vec<&[f64]> = returns.iter().map(|(_, s)| s).collect();
        let n = series.len();
        let mut matrix = DMatrix::identity(n, n);

        for i in 0..n {
            for j in (i + 1)..n {
                let rho = pearson_correlation(series[i], series[j])?;
                matrix[(i, j)] = rho;
                matrix[(j, i)] = rho;
            }
        }

        Ok(Self {
            assets: returns.assets(),
            matrix,
        })
    }

    /// Identity correlation (independent assets)
    pub fn identity(assets: Vec<String>) -> Self {
        let n = assets.len();
        Self {
            assets,
            matrix: DMatrix::identity(n, n),
        }
    }

    /// Build from explicit rows, validating shape, symmetry and range
    ///
    /// Diagonal entries within tolerance of 1.0 are snapped to exactly 1.0.
    pub fn from_rows(assets: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = assets.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(RiskError::InvalidParameter(format!(
                "Correlation matrix must be {}x{} to match the asset list",
                n, n
            )));
        }

        let mut matrix = DMatrix::from_fn(n, n, |i, j| rows[i][j]);

        for i in 0..n {
            if (matrix[(i, i)] - 1.0).abs() > VALIDATION_TOLERANCE {
                return Err(RiskError::InvalidParameter(format!(
                    "Diagonal entry {} is {}, expected 1.0",
                    i,
                    matrix[(i, i)]
                )));
            }
            matrix[(i, i)] = 1.0;

            for j in 0..i {
                let (a, b) = (matrix[(i, j)], matrix[(j, i)]);
                if !a.is_finite() || a.abs() > 1.0 + VALIDATION_TOLERANCE {
                    return Err(RiskError::InvalidParameter(format!(
                        "Correlation ({}, {}) = {} is outside [-1, 1]",
                        i, j, a
                    )));
                }
                if (a - b).abs() > VALIDATION_TOLERANCE {
                    return Err(RiskError::InvalidParameter(format!(
                        "Matrix is not symmetric at ({}, {}): {} vs {}",
                        i, j, a, b
                    )));
                }
            }
        }

        Ok(Self { assets, matrix })
    }

    pub fn dim(&self) -> usize {
        self.assets.len()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    /// Whether `matrix[i][j] == matrix[j][i]` for every pair
    pub fn is_symmetric(&self) -> bool {
        self.matrix == self.matrix.transpose()
    }
}

impl TryFrom<CorrelationTable> for CorrelationMatrix {
    type Error = RiskError;

    fn try_from(table: CorrelationTable) -> Result<Self> {
        Self::from_rows(table.assets, table.rows)
    }
}

impl From<CorrelationMatrix> for CorrelationTable {
    fn from(matrix: CorrelationMatrix) -> Self {
        let rows = matrix.to_rows();
        Self {
            assets: matrix.assets,
            rows,
        }
    }
}

/// Assets whose return series is constant (see [`is_constant`])
///
/// Their correlations fall back to 0.0, so callers should flag them.
pub fn zero_variance_assets(returns: &ReturnMatrix) -> Vec<String> {
    returns
        .iter()
        .filter(|(_, series)| is_constant(series))
        .map(|(asset, _)| asset.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn sample_returns() -> ReturnMatrix {
        ReturnMatrix::from_pairs(vec![
            ("A", vec![0.01, -0.02, 0.015, 0.03, -0.01, 0.005]),
            ("B", vec![0.02, -0.03, 0.01, 0.025, -0.015, 0.0]),
            ("C", vec![-0.01, 0.02, 0.0, -0.02, 0.01, 0.004]),
        ])
        .unwrap()
    }

    #[test]
    fn test_estimate_shape_and_diagonal() {
        let corr = CorrelationMatrix::estimate(&sample_returns()).unwrap();

        assert_eq!(corr.dim(), 3);
        assert_eq!(corr.assets(), &["A", "B", "C"]);
        for i in 0..3 {
            assert_eq!(corr.get(i, i), 1.0);
        }
        assert!(corr.is_symmetric());
        assert!(corr.get(0, 1) > 0.8);
        assert!(corr.get(0, 2) < -0.8);
    }

    #[test]
    fn test_single_asset_is_identity() {
        let returns = ReturnMatrix::from_pairs(vec![("A", vec![0.01, 0.02, -0.01])]).unwrap();
        let corr = CorrelationMatrix::estimate(&returns).unwrap();

        assert_eq!(corr.to_rows(), vec![vec![1.0]]);
    }

    #[test]
    fn test_insufficient_observations() {
        let returns = ReturnMatrix::from_pairs(vec![("A", vec![0.01]), ("B", vec![0.02])]).unwrap();
        assert!(matches!(
            CorrelationMatrix::estimate(&returns),
            Err(RiskError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_zero_variance_asset_correlates_zero() {
        let returns = ReturnMatrix::from_pairs(vec![
            ("Flat", vec![0.01, 0.01, 0.01, 0.01]),
            ("B", vec![0.02, -0.01, 0.03, 0.0]),
        ])
        .unwrap();

        let corr = CorrelationMatrix::estimate(&returns).unwrap();
        assert_eq!(corr.get(0, 1), 0.0);
        assert_eq!(corr.get(0, 0), 1.0);
        assert_eq!(zero_variance_assets(&returns), vec!["Flat".to_string()]);
    }

    #[test]
    fn test_repeated_non_dyadic_series_is_zero_variance() {
        let other: Vec<f64> = (0..20).map(|i| 0.01 * ((i * 7 % 11) as f64 - 5.0)).collect();
        let returns =
            ReturnMatrix::from_pairs(vec![("Cash", vec![0.01; 20]), ("B", other)]).unwrap();

        let corr = CorrelationMatrix::estimate(&returns).unwrap();
        assert_eq!(corr.get(0, 1), 0.0);
        assert_eq!(corr.get(1, 0), 0.0);
        assert_eq!(zero_variance_assets(&returns), vec!["Cash".to_string()]);
    }

    #[test]
    fn test_from_rows_validation() {
        let assets = vec!["A".to_string(), "B".to_string()];

        let ok = CorrelationMatrix::from_rows(assets.clone(), vec![vec![1.0, 0.3], vec![0.3, 1.0]]);
        assert!(ok.is_ok());

        let asymmetric =
            CorrelationMatrix::from_rows(assets.clone(), vec![vec![1.0, 0.3], vec![0.2, 1.0]]);
        assert!(asymmetric.is_err());

        let bad_diag =
            CorrelationMatrix::from_rows(assets.clone(), vec![vec![0.9, 0.3], vec![0.3, 1.0]]);
        assert!(bad_diag.is_err());

        let out_of_range =
            CorrelationMatrix::from_rows(assets.clone(), vec![vec![1.0, 1.5], vec![1.5, 1.0]]);
        assert!(out_of_range.is_err());

        let wrong_shape = CorrelationMatrix::from_rows(assets, vec![vec![1.0]]);
        assert!(wrong_shape.is_err());
    }

    #[test]
    fn test_serde_table_form() {
        let corr = CorrelationMatrix::estimate(&sample_returns()).unwrap();
        let json = serde_json::to_string(&corr).unwrap();
        assert!(json.contains("\"assets\""));
        assert!(json.contains("\"rows\""));

        let parsed: CorrelationMatrix = serde_json::from_str(&json).unwrap();
        assert_relative_eq!(parsed.get(0, 1), corr.get(0, 1), epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_estimate_symmetric_unit_diagonal(
            data in prop::collection::vec(prop::collection::vec(-0.1f64..0.1, 12), 1..5)
        ) {
            let returns = ReturnMatrix::from_pairs(
                data.into_iter().enumerate().map(|(i, s)| (format!("asset{}", i), s)),
            )
            .unwrap();

            let corr = CorrelationMatrix::estimate(&returns).unwrap();
            prop_assert!(corr.is_symmetric());
            for i in 0..corr.dim() {
                prop_assert_eq!(corr.get(i, i), 1.0);
                for j in 0..corr.dim() {
                    prop_assert!(corr.get(i, j).abs() <= 1.0 + 1e-12);
                }
            }
        }
    }
}
