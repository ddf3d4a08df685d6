//! Statistics primitives
//!
//! Small numeric building blocks shared by every other module:
//! - Box–Muller standard normal variates
//! - Pearson correlation
//! - Dense matrix-vector product
//! - Standard normal CDF (Abramowitz–Stegun erf) and its inverse (Acklam / BSM)

use crate::error::{Result, RiskError};
use nalgebra::{DMatrix, DVector};
use rand::distributions::Open01;
use rand::Rng;
use std::f64::consts::{PI, SQRT_2};

/// Draw one standard normal variate using the Box–Muller transform
///
/// Consumes two independent uniforms from the open interval (0, 1), so the
/// logarithm is always finite.
pub fn normal_variate<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u: f64 = rng.sample(Open01);
    let v: f64 = rng.sample(Open01);
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Sample Pearson correlation of two equal-length series
///
/// Returns 0.0 for empty input or when either series is constant (see
/// [`is_constant`]).
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(RiskError::InvalidParameter(format!(
            "Pearson correlation needs equal lengths, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() || is_constant(x) || is_constant(y) {
        return Ok(0.0);
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    let denominator = (den_x * den_y).sqrt();
    if denominator == 0.0 {
        Ok(0.0)
    } else {
        Ok(num / denominator)
    }
}

/// Multiply a dense matrix by a vector
pub fn multiply_matrix_vector(matrix: &DMatrix<f64>, vector: &[f64]) -> Result<Vec<f64>> {
    if matrix.ncols() != vector.len() {
        return Err(RiskError::InvalidParameter(format!(
            "Matrix has {} columns but vector has {} entries",
            matrix.ncols(),
            vector.len()
        )));
    }

    let product = matrix * DVector::from_column_slice(vector);
    Ok(product.iter().copied().collect())
}

/// Error function, Abramowitz and Stegun formula 7.1.26
///
/// Maximum absolute error is about 1.5e-7.
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal cumulative distribution function
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / SQRT_2))
}

/// Inverse of the standard normal CDF
///
/// Rational approximation of the Beasley–Springer–Moro family (Acklam's
/// coefficients), relative error below 1.2e-9 on (0, 1). Returns negative
/// infinity for `p <= 0` and positive infinity for `p >= 1`.
pub fn inverse_standard_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population variance (divides by n), 0.0 for an empty slice
pub fn population_variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64
}

/// Population standard deviation, 0.0 for an empty slice
pub fn population_std_dev(data: &[f64]) -> f64 {
    population_variance(data).sqrt()
}

/// True when the series carries no variance
///
/// Every value equals the first, or the standard deviation is within
/// `f64::EPSILON` of zero scaled by `max(|mean|, 1)`. Repeated non-dyadic
/// values such as `[0.01; 20]` leave a rounding-sized deviation.
pub fn is_constant(data: &[f64]) -> bool {
    match data.first() {
        None => true,
        Some(first) if data.iter().all(|x| x == first) => true,
        Some(_) => population_std_dev(data) <= f64::EPSILON * mean(data).abs().max(1.0),
    }
}
