use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, LogNormal, Normal};

use crate::{
    error::{GymResult, MarketError},
    market::{
        MarketSample, PriceSource,
        params::{AssetParams, MarketParams},
    },
};

/// Half-width of the uniform shock applied to both rate series.
const RATE_SHOCK: f64 = 0.1;

/// Drag of the previous fed rate on next-period inflation.
const INFLATION_FED_DRAG: f64 = 0.01;

/// Share of the inflation gap passed into the fed-rate drift.
const FED_INFLATION_PASS_THROUGH: f64 = 0.25;

/// Maximum absolute drift the inflation gap can add to the fed rate in one period.
const FED_DRIFT_LIMIT: f64 = 0.025;

/// Hard bounds of the fed rate.
pub const FED_RATE_BOUNDS: (f64, f64) = (0.0, 0.1);

/// Joint generator of inflation, fed rate, stock price and bond price.
///
/// Each series is an append-only history indexed from sample 0. `step()` reads only the
/// most recent sample of every series (first-order Markov) and appends all four new values
/// together, so a partially updated sample is never observable.
#[derive(Debug, Clone)]
pub struct MarketProcess {
    params: MarketParams,
    rng: StdRng,

    stock_noise: Normal<f64>,
    bond_noise: Normal<f64>,
    stock_initial: LogNormal<f64>,
    bond_initial: LogNormal<f64>,

    inflation: Vec<f64>,
    fed_rate: Vec<f64>,
    stock: Vec<f64>,
    bond: Vec<f64>,

    /// Copy of the last appended sample.
    current: MarketSample,
}

impl MarketProcess {
    /// Validates `params`, builds the noise distributions and runs `initialize()`.
    pub fn new(params: MarketParams, rng: StdRng) -> GymResult<Self> {
        params.validate()?;

        let stock_noise = normal("stock", &params.stock)?;
        let bond_noise = normal("bond", &params.bond)?;
        let stock_initial = log_normal("stock", &params.stock)?;
        let bond_initial = log_normal("bond", &params.bond)?;

        let capacity = params.warmup_steps + 1;
        let mut process = Self {
            params,
            rng,
            stock_noise,
            bond_noise,
            stock_initial,
            bond_initial,
            inflation: Vec::with_capacity(capacity),
            fed_rate: Vec::with_capacity(capacity),
            stock: Vec::with_capacity(capacity),
            bond: Vec::with_capacity(capacity),
            current: MarketSample::default(),
        };
        process.initialize();
        Ok(process)
    }

    /// Convenience constructor seeding the internal RNG deterministically.
    pub fn seeded(params: MarketParams, seed: u64) -> GymResult<Self> {
        Self::new(params, StdRng::seed_from_u64(seed))
    }

    /// Discards all histories, draws sample 0 and runs the warm-up steps.
    ///
    /// The RNG is not reseeded, so every call starts a fresh path of the same stream.
    #[tracing::instrument(skip(self), fields(warmup_steps = self.params.warmup_steps))]
    pub fn initialize(&mut self) {
        self.inflation.clear();
        self.fed_rate.clear();
        self.stock.clear();
        self.bond.clear();

        let (i_lo, i_hi) = self.params.inflation.initial_range;
        let (f_lo, f_hi) = self.params.fed_rate.initial_range;
        let first = MarketSample {
            inflation: self.rng.random_range(i_lo..i_hi),
            fed_rate: self.rng.random_range(f_lo..f_hi),
            stock_price: self.stock_initial.sample(&mut self.rng),
            bond_price: self.bond_initial.sample(&mut self.rng),
        };
        self.append(first);

        for _ in 0..self.params.warmup_steps {
            self.step();
        }
        tracing::debug!(sample = ?self.current, "Market initialized");
    }

    /// Draws the next joint sample and appends it to all four histories.
    pub fn step(&mut self) -> MarketSample {
        let next = self.sample_next();
        self.append(next);
        next
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    /// The most recent joint sample.
    pub fn last(&self) -> MarketSample {
        self.current
    }

    /// Number of samples in each history.
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }

    /// Joint sample at `index`, if present.
    pub fn sample(&self, index: usize) -> Option<MarketSample> {
        Some(MarketSample {
            inflation: *self.inflation.get(index)?,
            fed_rate: *self.fed_rate.get(index)?,
            stock_price: *self.stock.get(index)?,
            bond_price: *self.bond.get(index)?,
        })
    }

    /// Read-only view over all four histories.
    pub fn history(&self) -> MarketHistory<'_> {
        MarketHistory {
            inflation: &self.inflation,
            fed_rate: &self.fed_rate,
            stock: &self.stock,
            bond: &self.bond,
            current: self.current,
        }
    }

    pub fn inflation_history(&self) -> &[f64] {
        &self.inflation
    }

    pub fn fed_rate_history(&self) -> &[f64] {
        &self.fed_rate
    }

    pub fn stock_history(&self) -> &[f64] {
        &self.stock
    }

    pub fn bond_history(&self) -> &[f64] {
        &self.bond
    }
}

impl PriceSource for MarketProcess {
    fn stock_price(&self) -> f64 {
        self.current.stock_price
    }

    fn bond_price(&self) -> f64 {
        self.current.bond_price
    }
}

/// Borrowed snapshot of the market histories, oldest sample first.
#[derive(Debug, Clone, Copy)]
pub struct MarketHistory<'a> {
    pub inflation: &'a [f64],
    pub fed_rate: &'a [f64],
    pub stock: &'a [f64],
    pub bond: &'a [f64],
    current: MarketSample,
}

impl MarketHistory<'_> {
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }

    pub fn last(&self) -> MarketSample {
        self.current
    }
}

impl PriceSource for MarketHistory<'_> {
    fn stock_price(&self) -> f64 {
        self.current.stock_price
    }

    fn bond_price(&self) -> f64 {
        self.current.bond_price
    }
}

// ================================================================================================
// Recurrence
// ================================================================================================

impl MarketProcess {
    fn sample_next(&mut self) -> MarketSample {
        let p = &self.params;
        let last = self.current;

        let inflation_change = last.inflation - p.inflation.mean;
        let fed_rate_change = last.fed_rate - p.fed_rate.mean;

        // Inflation: the shock couples through the *stock* coefficients.
        let mean = p.inflation.ar_coef * last.inflation
            + (1.0 - p.inflation.ar_coef) * p.inflation.mean;
        let error = -INFLATION_FED_DRAG * last.fed_rate
            + self.rng.random_range(-RATE_SHOCK..RATE_SHOCK)
            - p.stock.fed_rate_coef * fed_rate_change
            - p.stock.inflation_coef * inflation_change;
        let ma_term = p.inflation.ma_coef * error;
        let inflation = last.inflation * ma_term + mean + error;

        // Fed rate
        let drift = (FED_INFLATION_PASS_THROUGH * inflation_change)
            .clamp(-FED_DRIFT_LIMIT, FED_DRIFT_LIMIT);
        let mean = p.fed_rate.ar_coef * last.fed_rate
            + (1.0 - p.fed_rate.ar_coef) * p.fed_rate.mean
            + drift;
        let error = self.rng.random_range(-RATE_SHOCK..RATE_SHOCK);
        let ma_term = p.fed_rate.ma_coef * error;
        let fed_rate =
            (last.fed_rate * ma_term + mean + error).clamp(FED_RATE_BOUNDS.0, FED_RATE_BOUNDS.1);

        // Assets
        let stock_error = self.stock_noise.sample(&mut self.rng);
        let stock_price = asset_next(
            &p.stock,
            last.stock_price,
            inflation_change,
            fed_rate_change,
            stock_error,
        );

        let bond_error = self.bond_noise.sample(&mut self.rng);
        let bond_price = asset_next(
            &p.bond,
            last.bond_price,
            inflation_change,
            fed_rate_change,
            bond_error,
        );

        MarketSample {
            inflation,
            fed_rate,
            stock_price,
            bond_price,
        }
    }

    fn append(&mut self, sample: MarketSample) {
        self.inflation.push(sample.inflation);
        self.fed_rate.push(sample.fed_rate);
        self.stock.push(sample.stock_price);
        self.bond.push(sample.bond_price);
        self.current = sample;
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn asset_next(
    p: &AssetParams,
    last: f64,
    inflation_change: f64,
    fed_rate_change: f64,
    error: f64,
) -> f64 {
    let mean = p.conditional_mean(last, inflation_change, fed_rate_change);
    let ma_term = p.ma_coef * error;
    last * ma_term + mean + error
}

fn normal(name: &'static str, p: &AssetParams) -> GymResult<Normal<f64>> {
    Normal::new(0.0, p.sigma).map_err(|e| {
        MarketError::Distribution {
            name,
            msg: e.to_string(),
        }
        .into()
    })
}

fn log_normal(name: &'static str, p: &AssetParams) -> GymResult<LogNormal<f64>> {
    let (mu, s) = p.log_normal_params();
    LogNormal::new(mu, s).map_err(|e| {
        MarketError::Distribution {
            name,
            msg: e.to_string(),
        }
        .into()
    })
}
