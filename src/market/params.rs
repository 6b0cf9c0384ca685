use serde::{Deserialize, Serialize};

use crate::error::{GymResult, MarketError};

/// Upper bound on the simulated warm-up before period 0.
pub const MAX_WARMUP_STEPS: usize = 10_000;

// ================================================================================================
// Rate Parameters (Inflation, Fed Rate)
// ================================================================================================

/// Parameters of a macro rate series (inflation or the federal-reserve rate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParams {
    /// Long-run level the series reverts to.
    pub mean: f64,
    /// Kept for parity with the asset parameters; the rate recurrences draw their
    /// shocks from a fixed uniform band instead.
    pub sigma: f64,
    /// Autoregressive weight on the previous value.
    pub ar_coef: f64,
    /// Moving-average weight applied to the current shock.
    pub ma_coef: f64,
    /// Uniform range the first sample is drawn from, `[low, high)`.
    pub initial_range: (f64, f64),
}

// ================================================================================================
// Asset Parameters (Stock, Bond)
// ================================================================================================

/// Parameters of a priced asset series (stock or bond).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetParams {
    /// Long-run price level; also the mean of the log-normal initial draw.
    pub mean: f64,
    /// Standard deviation of the Gaussian shock and of the initial draw.
    pub sigma: f64,
    pub ar_coef: f64,
    pub ma_coef: f64,
    /// Sensitivity of the asset to inflation deviating from its mean.
    pub inflation_coef: f64,
    /// Sensitivity of the asset to the fed rate deviating from its mean.
    pub fed_rate_coef: f64,
}

impl AssetParams {
    /// Location and scale of the log-normal whose mean and standard deviation equal
    /// `mean` and `sigma`.
    pub fn log_normal_params(&self) -> (f64, f64) {
        let mean_sq = self.mean * self.mean;
        let sigma_sq = self.sigma * self.sigma;
        let mu = (mean_sq / (sigma_sq + mean_sq).sqrt()).ln();
        let s = (sigma_sq / mean_sq + 1.0).ln().sqrt();
        (mu, s)
    }

    /// One-step conditional mean of the price given the last price and the macro gaps.
    pub fn conditional_mean(&self, last: f64, inflation_change: f64, fed_rate_change: f64) -> f64 {
        self.ar_coef * last
            + (1.0 - self.ar_coef) * self.mean
            + self.inflation_coef * inflation_change
            + self.fed_rate_coef * fed_rate_change
    }
}

// ================================================================================================
// Market Parameters
// ================================================================================================

/// Fixed parameters of the joint inflation / fed-rate / stock / bond process.
///
/// Validated once when a [`MarketProcess`](crate::market::process::MarketProcess) is built
/// and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub inflation: RateParams,
    pub fed_rate: RateParams,
    pub stock: AssetParams,
    pub bond: AssetParams,
    /// Number of internal steps taken by `initialize()` after seeding sample 0.
    pub warmup_steps: usize,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            inflation: RateParams {
                mean: 0.02,
                sigma: 0.002,
                ar_coef: 0.9,
                ma_coef: 0.5,
                initial_range: (0.02, 0.05),
            },
            fed_rate: RateParams {
                mean: 0.02,
                sigma: 0.002,
                ar_coef: 0.6,
                ma_coef: 0.2,
                initial_range: (0.0, 0.1),
            },
            stock: AssetParams {
                mean: 100.0,
                sigma: 0.1,
                ar_coef: 0.8,
                ma_coef: 0.1,
                inflation_coef: 1.5,
                fed_rate_coef: -2.0,
            },
            bond: AssetParams {
                mean: 200.0,
                sigma: 0.1,
                ar_coef: 0.5,
                ma_coef: 0.2,
                inflation_coef: -2.5,
                fed_rate_coef: -2.5,
            },
            warmup_steps: 11,
        }
    }
}

impl MarketParams {
    pub fn with_warmup_steps(self, warmup_steps: usize) -> Self {
        Self {
            warmup_steps,
            ..self
        }
    }

    pub fn with_stock(self, stock: AssetParams) -> Self {
        Self { stock, ..self }
    }

    pub fn with_bond(self, bond: AssetParams) -> Self {
        Self { bond, ..self }
    }

    pub fn validate(&self) -> GymResult<()> {
        validate_rate("inflation", &self.inflation)?;
        validate_rate("fed_rate", &self.fed_rate)?;
        validate_asset("stock", &self.stock)?;
        validate_asset("bond", &self.bond)?;
        if self.warmup_steps > MAX_WARMUP_STEPS {
            return Err(invalid(
                "warmup_steps",
                format!(
                    "must be at most {MAX_WARMUP_STEPS}, got {}",
                    self.warmup_steps
                ),
            ));
        }
        Ok(())
    }
}

// ================================================================================================
// Internal Helper
// ================================================================================================

fn validate_rate(name: &'static str, p: &RateParams) -> GymResult<()> {
    let values = [
        p.mean,
        p.sigma,
        p.ar_coef,
        p.ma_coef,
        p.initial_range.0,
        p.initial_range.1,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid(name, "all values must be finite"));
    }
    if p.sigma < 0.0 {
        return Err(invalid(name, format!("sigma must be >= 0, got {}", p.sigma)));
    }
    if p.initial_range.0 >= p.initial_range.1 {
        return Err(invalid(
            name,
            format!(
                "initial range must satisfy low < high, got [{}, {})",
                p.initial_range.0, p.initial_range.1
            ),
        ));
    }
    Ok(())
}

fn validate_asset(name: &'static str, p: &AssetParams) -> GymResult<()> {
    let values = [
        p.mean,
        p.sigma,
        p.ar_coef,
        p.ma_coef,
        p.inflation_coef,
        p.fed_rate_coef,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid(name, "all values must be finite"));
    }
    if p.mean <= 0.0 {
        return Err(invalid(name, format!("mean must be > 0, got {}", p.mean)));
    }
    if p.sigma < 0.0 {
        return Err(invalid(name, format!("sigma must be >= 0, got {}", p.sigma)));
    }
    Ok(())
}

fn invalid(name: &'static str, msg: impl Into<String>) -> crate::error::GymError {
    MarketError::InvalidParameter {
        name,
        msg: msg.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(MarketParams::default().validate().is_ok());
    }

    #[test]
    fn log_normal_params_reproduce_configured_moments() {
        let stock = MarketParams::default().stock;
        let (mu, s) = stock.log_normal_params();

        // E[X] = exp(mu + s^2 / 2), Var[X] = (exp(s^2) - 1) * exp(2 mu + s^2)
        let mean = (mu + s * s / 2.0).exp();
        let var = ((s * s).exp() - 1.0) * (2.0 * mu + s * s).exp();

        assert!((mean - stock.mean).abs() < 1e-9, "mean was {mean}");
        assert!((var.sqrt() - stock.sigma).abs() < 1e-6, "sigma was {}", var.sqrt());
    }

    #[test]
    fn rejects_non_positive_asset_mean() {
        let mut params = MarketParams::default();
        params.bond.mean = 0.0;

        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("bond"), "unexpected error: {err}");
    }

    #[test]
    fn bounds_the_warmup() {
        let at_limit = MarketParams::default().with_warmup_steps(MAX_WARMUP_STEPS);
        let beyond = MarketParams::default().with_warmup_steps(usize::MAX);

        assert!(at_limit.validate().is_ok());
        let err = beyond.validate().unwrap_err();
        assert!(err.to_string().contains("warmup_steps"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_inverted_initial_range() {
        let mut params = MarketParams::default();
        params.fed_rate.initial_range = (0.1, 0.0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_nan_coefficients() {
        let mut params = MarketParams::default();
        params.inflation.ar_coef = f64::NAN;
        assert!(params.validate().is_err());
    }
}
