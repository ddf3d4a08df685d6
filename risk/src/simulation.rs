//! Monte Carlo simulation of portfolio returns
//!
//! Trials are split into fixed-size batches. Batch `b` draws from its own
//! `StdRng` seeded with `seed + b`, so a seeded run produces the same ordered
//! output whether batches run on the rayon pool (feature `parallel`) or
//! sequentially.
//!
//! Per trial:
//! 1. Draw one dependent variate vector from the [`CopulaSampler`]
//! 2. Take a marginal shock per asset ([`MarginalTransform`])
//! 3. Portfolio return = `Σ wᵢ · shockᵢ · σ`, scaled by `√horizon`

use crate::copula::CopulaSampler;
use crate::error::{Result, RiskError};
use crate::stats::normal_variate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default number of trials per batch
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Source of the per-asset shock in each trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginalTransform {
    /// Fresh standard normal per asset. The copula draw is still taken but
    /// does not feed the shock, so simulated returns are independent across
    /// assets whatever the model.
    #[default]
    IndependentShock,

    /// Use the copula variate itself, mapped to the normal scale when the
    /// model produces uniforms
    CopulaDriven,
}

/// Cooperative cancellation flag checked between batches
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; batches already running finish
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-run simulation inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Number of trials (> 0)
    pub n_sims: usize,

    /// Horizon in days (> 0); returns scale by its square root
    pub time_horizon_days: u32,

    /// Daily marginal volatility applied to every asset
    pub volatility: f64,
}

/// Simulated portfolio returns in trial order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedReturns {
    returns: Vec<f64>,
}

impl SimulatedReturns {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.returns
    }

    /// First `len` trials, for visualization
    pub fn preview(&self, len: usize) -> &[f64] {
        &self.returns[..len.min(self.returns.len())]
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.returns
    }
}

/// Batched Monte Carlo engine
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    batch_size: usize,
    seed: Option<u64>,
    marginal: MarginalTransform,
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            marginal: MarginalTransform::default(),
        }
    }
}

impl MonteCarloEngine {
    pub fn new(batch_size: usize, seed: Option<u64>, marginal: MarginalTransform) -> Result<Self> {
        if batch_size == 0 {
            return Err(RiskError::InvalidParameter(
                "Batch size must be positive".to_string(),
            ));
        }
        Ok(Self {
            batch_size,
            seed,
            marginal,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn marginal(&self) -> MarginalTransform {
        self.marginal
    }

    /// Run `params.n_sims` trials
    ///
    /// Unseeded engines draw one base seed from entropy per call.
    pub fn simulate(
        &self,
        sampler: &CopulaSampler,
        weights: &[f64],
        params: &SimulationParams,
        cancel: &CancellationToken,
    ) -> Result<SimulatedReturns> {
        if params.n_sims == 0 {
            return Err(RiskError::InvalidParameter(
                "Number of simulations must be positive".to_string(),
            ));
        }
        if params.time_horizon_days == 0 {
            return Err(RiskError::InvalidTimeHorizon(params.time_horizon_days));
        }
        if !(params.volatility.is_finite() && params.volatility >= 0.0) {
            return Err(RiskError::InvalidParameter(format!(
                "Volatility must be non-negative, got {}",
                params.volatility
            )));
        }
        if weights.len() != sampler.dim() {
            return Err(RiskError::WeightCountMismatch {
                expected: sampler.dim(),
                actual: weights.len(),
            });
        }

        let base_seed = self.seed.unwrap_or_else(rand::random);
        let num_batches = params.n_sims.div_ceil(self.batch_size);
        let completed = AtomicUsize::new(0);

        let run = |batch: usize| -> Result<Vec<f64>> {
            if cancel.is_cancelled() {
                return Err(RiskError::Cancelled {
                    completed: completed.load(Ordering::SeqCst),
                });
            }

            let start = batch * self.batch_size;
            let size = self.batch_size.min(params.n_sims - start);
            let seed = base_seed.wrapping_add(batch as u64);
            let returns = self.run_batch(sampler, weights, params, seed, size)?;

            completed.fetch_add(size, Ordering::SeqCst);
            debug!(batch, size, seed, "Simulation batch complete");
            Ok(returns)
        };

        #[cfg(feature = "parallel")]
        let batches = (0..num_batches)
            .into_par_iter()
            .map(run)
            .collect::<Result<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let batches = (0..num_batches).map(run).collect::<Result<Vec<_>>>()?;

        Ok(SimulatedReturns {
            returns: batches.into_iter().flatten().collect(),
        })
    }

    fn run_batch(
        &self,
        sampler: &CopulaSampler,
        weights: &[f64],
        params: &SimulationParams,
        seed: u64,
        size: usize,
    ) -> Result<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let horizon_scale = (params.time_horizon_days as f64).sqrt();
        let mut returns = Vec::with_capacity(size);

        for _ in 0..size {
            let draw = sampler.sample_with(&mut rng)?;

            let portfolio_return: f64 = match self.marginal {
                MarginalTransform::IndependentShock => weights
                    .iter()
                    .map(|w| w * normal_variate(&mut rng) * params.volatility)
                    .sum(),
                MarginalTransform::CopulaDriven => draw
                    .to_normal()
                    .iter()
                    .zip(weights)
                    .map(|(z, w)| w * z * params.volatility)
                    .sum(),
            };

            returns.push(portfolio_return * horizon_scale);
        }

        Ok(returns)
    }
}
