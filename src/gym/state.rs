use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    impl_add_sub_primitive, impl_from_primitive,
    market::{MarketSample, PriceSource},
    portfolio::{Portfolio, Weights},
};

/// Number of model features per snapshot: stock price, bond price, fed rate, inflation.
pub const FEATURE_COUNT: usize = 4;

/// Index of a game period. Warm-up snapshots carry negative periods; play starts at 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Period(pub i32);
impl_from_primitive!(Period, i32);
impl_add_sub_primitive!(Period, i32);

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Period {
    pub fn is_warmup(&self) -> bool {
        self.0 < 0
    }
}

// ================================================================================================
// Market State (one row per period)
// ================================================================================================

/// Immutable snapshot of market and portfolio at the start of a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub period: Period,
    pub stock_price: f64,
    pub bond_price: f64,
    pub fed_rate: f64,
    pub inflation: f64,
    pub cash: f64,
    pub stock_value: f64,
    pub bond_value: f64,
    pub portfolio_value: f64,
    pub stock_weight: f64,
    pub bond_weight: f64,
    pub cash_weight: f64,
}

impl MarketState {
    /// Values `portfolio` at the prices of `sample`.
    pub fn snapshot(period: Period, sample: MarketSample, portfolio: &Portfolio) -> Self {
        let stock_value = portfolio.stock_value(&sample);
        let bond_value = portfolio.bond_value(&sample);
        let portfolio_value = portfolio.value(&sample);
        let weights = portfolio.weights(&sample);

        Self {
            period,
            stock_price: sample.stock_price,
            bond_price: sample.bond_price,
            fed_rate: sample.fed_rate,
            inflation: sample.inflation,
            cash: portfolio.cash(),
            stock_value,
            bond_value,
            portfolio_value,
            stock_weight: weights.stock,
            bond_weight: weights.bond,
            cash_weight: weights.cash,
        }
    }

    /// Model input row in the order stock price, bond price, fed rate, inflation.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.stock_price,
            self.bond_price,
            self.fed_rate,
            self.inflation,
        ]
    }

    pub fn weights(&self) -> Weights {
        Weights {
            stock: self.stock_weight,
            bond: self.bond_weight,
            cash: self.cash_weight,
        }
    }

    pub fn sample(&self) -> MarketSample {
        MarketSample {
            inflation: self.inflation,
            fed_rate: self.fed_rate,
            stock_price: self.stock_price,
            bond_price: self.bond_price,
        }
    }
}

impl PriceSource for MarketState {
    fn stock_price(&self) -> f64 {
        self.stock_price
    }

    fn bond_price(&self) -> f64 {
        self.bond_price
    }
}

// ================================================================================================
// State Log
// ================================================================================================

/// Append-only log of snapshots, preceded by the read-only warm-up prelude.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateLog {
    prelude: Vec<MarketState>,
    log: Vec<MarketState>,
}

impl StateLog {
    /// Playable snapshots, period 0 first.
    pub fn states(&self) -> &[MarketState] {
        &self.log
    }

    /// Warm-up snapshots with negative periods.
    pub fn prelude(&self) -> &[MarketState] {
        &self.prelude
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn last(&self) -> Option<&MarketState> {
        self.log.last()
    }

    /// Prelude and log in period order.
    pub fn iter(&self) -> impl Iterator<Item = &MarketState> {
        self.prelude.iter().chain(self.log.iter())
    }

    /// The last `w` snapshots across prelude and log, oldest first.
    ///
    /// Returns fewer than `w` rows when the combined history is shorter.
    pub fn window(&self, w: usize) -> Vec<MarketState> {
        let total = self.prelude.len() + self.log.len();
        self.iter().skip(total.saturating_sub(w)).copied().collect()
    }

    /// Full trajectory (prelude followed by log).
    pub fn trajectory(&self) -> Vec<MarketState> {
        self.iter().copied().collect()
    }

    pub(crate) fn push_prelude(&mut self, state: MarketState) {
        self.prelude.push(state);
    }

    pub(crate) fn push(&mut self, state: MarketState) {
        self.log.push(state);
    }

    pub(crate) fn clear(&mut self) {
        self.prelude.clear();
        self.log.clear();
    }
}
