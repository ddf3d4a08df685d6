//! Synthetic correlated market data
//!
//! Generates daily price levels `start · exp(σᵢ · zᵢ)` where `z = L·ε` is a
//! Cholesky-correlated standard normal vector drawn fresh each day, then
//! derives the log-return matrix from those prices.

use crate::cholesky::{CholeskyFactor, CholeskyPolicy};
use crate::correlation::CorrelationMatrix;
use crate::error::{Result, RiskError};
use crate::returns::ReturnMatrix;
use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use rand::Rng;
use rand_distr::StandardNormal;

/// Specification of a synthetic asset universe
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    correlation: CorrelationMatrix,
    volatilities: Vec<f64>,
    n_days: usize,
    start_price: f64,
    start_date: NaiveDate,
}

/// Generated prices and the returns derived from them
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub dates: Vec<NaiveDate>,
    pub prices: IndexMap<String, Vec<f64>>,
    pub returns: ReturnMatrix,
}

impl SyntheticMarket {
    /// `volatilities[i]` is the daily volatility of `correlation.assets()[i]`
    pub fn new(correlation: CorrelationMatrix, volatilities: Vec<f64>, n_days: usize) -> Result<Self> {
        if volatilities.len() != correlation.dim() {
            return Err(RiskError::InvalidParameter(format!(
                "Expected {} volatilities, got {}",
                correlation.dim(),
                volatilities.len()
            )));
        }
        if let Some(bad) = volatilities.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(RiskError::InvalidParameter(format!(
                "Volatility must be non-negative, got {}",
                bad
            )));
        }
        if n_days < 2 {
            return Err(RiskError::InsufficientData(format!(
                "Need at least 2 days of prices, got {}",
                n_days
            )));
        }

        Ok(Self {
            correlation,
            volatilities,
            n_days,
            start_price: 100.0,
            start_date: default_start_date(),
        })
    }

    /// Four-asset demo universe, one year of trading days
    pub fn demo() -> Result<Self> {
        let assets = ["Stock A", "Stock B", "Bond C", "Commodity D"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let correlation = CorrelationMatrix::from_rows(
            assets,
            vec![
                vec![1.0, 0.7, 0.2, 0.3],
                vec![0.7, 1.0, 0.1, 0.4],
                vec![0.2, 0.1, 1.0, -0.2],
                vec![0.3, 0.4, -0.2, 1.0],
            ],
        )?;

        Self::new(correlation, vec![0.02, 0.025, 0.01, 0.03], 252)
    }

    pub fn with_start_price(mut self, start_price: f64) -> Self {
        self.start_price = start_price;
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn assets(&self) -> &[String] {
        self.correlation.assets()
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SyntheticData> {
        let factor = CholeskyFactor::of_correlation(&self.correlation, CholeskyPolicy::Strict)?;
        let n_assets = self.correlation.dim();

        let mut prices: IndexMap<String, Vec<f64>> = self
            .assets()
            .iter()
            .map(|asset| (asset.clone(), Vec::with_capacity(self.n_days)))
            .collect();
        let mut dates = Vec::with_capacity(self.n_days);

        for day in 0..self.n_days {
            let independent: Vec<f64> = (0..n_assets).map(|_| rng.sample(StandardNormal)).collect();
            let correlated = factor.correlate(&independent)?;

            for ((path, z), sigma) in prices.values_mut().zip(&correlated).zip(&self.volatilities) {
                path.push(self.start_price * (sigma * z).exp());
            }
            dates.push(self.start_date + Duration::days(day as i64));
        }

        let returns = ReturnMatrix::from_prices(&prices)?;
        Ok(SyntheticData {
            dates,
            prices,
            returns,
        })
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::population_std_dev;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_demo_shape() {
        let market = SyntheticMarket::demo().unwrap();
        let data = market.generate(&mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(data.dates.len(), 252);
        assert_eq!(data.prices.len(), 4);
        assert_eq!(data.returns.num_assets(), 4);
        assert_eq!(data.returns.num_observations(), 251);
        assert_eq!(data.returns.assets()[3], "Commodity D");
        assert_eq!(data.dates[0], NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn test_prices_positive_around_start() {
        let data = SyntheticMarket::demo()
            .unwrap()
            .generate(&mut StdRng::seed_from_u64(1))
            .unwrap();

        for path in data.prices.values() {
            assert!(path.iter().all(|p| *p > 50.0 && *p < 200.0));
        }
    }

    #[test]
    fn test_correlation_recovered() {
        let market = SyntheticMarket::demo().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // Long sample so the estimate settles
        let long = SyntheticMarket::new(market.correlation.clone(), vec![0.02, 0.025, 0.01, 0.03], 20_000)
            .unwrap()
            .generate(&mut rng)
            .unwrap();
        let estimated = CorrelationMatrix::estimate(&long.returns).unwrap();

        // Differencing i.i.d. levels preserves the pairwise correlation
        assert!((estimated.get(0, 1) - 0.7).abs() < 0.05);
        assert!((estimated.get(2, 3) + 0.2).abs() < 0.05);
    }

    #[test]
    fn test_return_volatility_scales_with_sigma() {
        let data = SyntheticMarket::demo()
            .unwrap()
            .generate(&mut StdRng::seed_from_u64(3))
            .unwrap();

        let bond = population_std_dev(data.returns.get("Bond C").unwrap());
        let commodity = population_std_dev(data.returns.get("Commodity D").unwrap());
        assert!(commodity > bond);
    }

    #[test]
    fn test_invalid_construction() {
        let corr = CorrelationMatrix::identity(vec!["A".to_string(), "B".to_string()]);

        assert!(SyntheticMarket::new(corr.clone(), vec![0.01], 10).is_err());
        assert!(SyntheticMarket::new(corr.clone(), vec![0.01, -0.01], 10).is_err());
        assert!(SyntheticMarket::new(corr, vec![0.01, 0.01], 1).is_err());
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let market = SyntheticMarket::demo().unwrap();
        let a = market.generate(&mut StdRng::seed_from_u64(5)).unwrap();
        let b = market.generate(&mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(a.returns, b.returns);
    }
}
