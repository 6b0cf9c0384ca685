use ndarray::{Array2, ArrayView1, ArrayView2, s};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    agent::{Agent, AgentIdentifier},
    error::{AgentError, DataError, GymResult},
    gym::{
        action::{Action, Actions},
        observation::Observation,
        state::{FEATURE_COUNT, MarketState, Period},
    },
    market::params::MarketParams,
    math::scaler::FeatureScaler,
    portfolio::Weights,
};

/// Number of snapshots fed to the predictor.
pub const DEFAULT_WINDOW: usize = 6;

/// A stock and a bond price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricePair {
    pub stock: f64,
    pub bond: f64,
}

// ================================================================================================
// Predictor
// ================================================================================================

/// Predicts next-period prices from a scaled `(W, 4)` window.
///
/// Rows are oldest first; columns are stock price, bond price, fed rate and inflation, each
/// min-max scaled by the agent's [`FeatureScaler`]. The returned prices are unscaled.
pub trait Predictor {
    fn predict(&self, window: ArrayView2<'_, f64>) -> GymResult<PricePair>;
}

impl<F> Predictor for F
where
    F: Fn(ArrayView2<'_, f64>) -> GymResult<PricePair>,
{
    fn predict(&self, window: ArrayView2<'_, f64>) -> GymResult<PricePair> {
        self(window)
    }
}

/// Baseline predictor: the one-step conditional mean of the market recurrence, evaluated
/// at the last (unscaled) row of the window.
#[derive(Debug, Clone)]
pub struct ArPredictor {
    params: MarketParams,
    scaler: FeatureScaler,
}

impl ArPredictor {
    pub fn new(params: MarketParams, scaler: FeatureScaler) -> Self {
        Self { params, scaler }
    }
}

impl Predictor for ArPredictor {
    fn predict(&self, window: ArrayView2<'_, f64>) -> GymResult<PricePair> {
        let flat = Array2::from_shape_vec((1, window.len()), window.iter().copied().collect())
            .map_err(|e| shape_mismatch(format!("1x{}", window.len()), e))?;
        let raw = self.scaler.inverse_transform(flat.view())?;

        let n = raw.ncols();
        if n < FEATURE_COUNT {
            return Err(AgentError::Prediction(format!(
                "window must hold at least one row of {FEATURE_COUNT} features, got {n} values"
            ))
            .into());
        }
        let last: ArrayView1<'_, f64> = raw.slice(s![0, n - FEATURE_COUNT..]);
        let (stock, bond, fed_rate, inflation) = (last[0], last[1], last[2], last[3]);

        let inflation_change = inflation - self.params.inflation.mean;
        let fed_rate_change = fed_rate - self.params.fed_rate.mean;
        Ok(PricePair {
            stock: self
                .params
                .stock
                .conditional_mean(stock, inflation_change, fed_rate_change),
            bond: self
                .params
                .bond
                .conditional_mean(bond, inflation_change, fed_rate_change),
        })
    }
}

// ================================================================================================
// Prediction Agent
// ================================================================================================

/// One decision of the [`PredictionAgent`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub period: Period,
    pub predicted: PricePair,
    pub current: PricePair,
}

/// Rebalances towards weights proportional to the predicted positive returns.
///
/// Each period the last `window` snapshots are scaled, passed to the [`Predictor`] and turned
/// into target weights (see [`target_weights`]). Stock and bond are then bought or sold by
/// `(target - current) * portfolio_value`, stock first.
#[derive(Debug, Clone)]
pub struct PredictionAgent<P> {
    predictor: P,
    scaler: FeatureScaler,
    window: usize,
    trace: Vec<PredictionRecord>,
}

impl<P: Predictor> PredictionAgent<P> {
    /// Fails with [`DataError::ShapeMismatch`] unless `scaler` was fitted on flattened
    /// windows of `window` rows.
    pub fn new(predictor: P, scaler: FeatureScaler, window: usize) -> GymResult<Self> {
        let expected = window * FEATURE_COUNT;
        if window == 0 || scaler.n_features() != expected {
            return Err(DataError::ShapeMismatch {
                expected: format!("scaler over {expected} columns"),
                actual: format!("scaler over {} columns", scaler.n_features()),
            }
            .into());
        }
        Ok(Self {
            predictor,
            scaler,
            window,
            trace: Vec::new(),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Every decision of the current game, in period order.
    pub fn trace(&self) -> &[PredictionRecord] {
        &self.trace
    }

    /// Mean absolute error of the predictions against the realized next-period prices.
    ///
    /// Decisions without a realized successor in `realized` are skipped; `None` when no
    /// decision can be scored.
    pub fn mean_absolute_error(&self, realized: &[MarketState]) -> Option<PricePair> {
        let errors: Vec<PricePair> = self
            .trace
            .iter()
            .filter_map(|record| {
                let next = realized.iter().find(|s| s.period == record.period + 1)?;
                Some(PricePair {
                    stock: (record.predicted.stock - next.stock_price).abs(),
                    bond: (record.predicted.bond - next.bond_price).abs(),
                })
            })
            .collect();

        if errors.is_empty() {
            return None;
        }
        let n = errors.len() as f64;
        Some(PricePair {
            stock: errors.iter().map(|e| e.stock).sum::<f64>() / n,
            bond: errors.iter().map(|e| e.bond).sum::<f64>() / n,
        })
    }

    fn scaled_window(&self, rows: &[MarketState]) -> GymResult<Array2<f64>> {
        let width = self.window * FEATURE_COUNT;
        let flat = Array2::from_shape_vec(
            (1, width),
            rows.iter().flat_map(|s| s.features()).collect(),
        )
        .map_err(|e| shape_mismatch(format!("1x{width}"), e))?;

        self.scaler
            .transform(flat.view())?
            .into_shape_with_order((self.window, FEATURE_COUNT))
            .map_err(|e| shape_mismatch(format!("{}x{FEATURE_COUNT}", self.window), e))
    }
}

impl<P: Predictor> Agent for PredictionAgent<P> {
    fn act(&mut self, obs: Observation) -> GymResult<Actions> {
        let rows = obs.window(self.window);
        if rows.len() < self.window {
            return Err(AgentError::InsufficientHistory {
                required: self.window,
                available: rows.len(),
            }
            .into());
        }

        let scaled = self.scaled_window(&rows)?;
        let predicted = self.predictor.predict(scaled.view())?;
        let current = PricePair {
            stock: obs.market.stock_price,
            bond: obs.market.bond_price,
        };

        let target = target_weights(predicted, current);
        let weights = obs.weights();
        let value = obs.portfolio_value();

        let mut actions = Actions::new();
        if let Some(action) = rebalance(
            (target.stock - weights.stock) * value,
            Action::buy_stock,
            Action::sell_stock,
        ) {
            actions.add(action);
        }
        if let Some(action) = rebalance(
            (target.bond - weights.bond) * value,
            Action::buy_bond,
            Action::sell_bond,
        ) {
            actions.add(action);
        }

        debug!(
            period = %obs.period,
            predicted_stock = predicted.stock,
            predicted_bond = predicted.bond,
            target_stock = target.stock,
            target_bond = target.bond,
            "Prediction"
        );
        self.trace.push(PredictionRecord {
            period: obs.period,
            predicted,
            current,
        });
        Ok(actions)
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Prediction
    }

    fn reset(&mut self) {
        self.trace.clear();
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================

/// Target weights proportional to the predicted positive returns.
///
/// Non-positive returns count as zero. If both are zero everything goes to cash; otherwise
/// the cash target is zero.
pub fn target_weights(predicted: PricePair, current: PricePair) -> Weights {
    let stock = expected_return(predicted.stock, current.stock);
    let bond = expected_return(predicted.bond, current.bond);
    let total = stock + bond;

    if total == 0.0 {
        return Weights {
            stock: 0.0,
            bond: 0.0,
            cash: 1.0,
        };
    }
    Weights {
        stock: stock / total,
        bond: bond / total,
        cash: 0.0,
    }
}

fn expected_return(predicted: f64, current: f64) -> f64 {
    let r = (predicted - current) / current;
    if r.is_finite() && r > 0.0 { r } else { 0.0 }
}

fn rebalance(
    notional: f64,
    buy: fn(f64) -> Action,
    sell: fn(f64) -> Action,
) -> Option<Action> {
    if notional > 0.0 {
        Some(buy(notional))
    } else if notional < 0.0 {
        Some(sell(-notional))
    } else {
        None
    }
}

fn shape_mismatch(expected: String, e: ndarray::ShapeError) -> crate::error::GymError {
    DataError::ShapeMismatch {
        expected,
        actual: e.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use crate::gym::{config::SessionConfig, session::GameSession};

    use super::*;

    fn session() -> GameSession {
        GameSession::new(SessionConfig::default().with_seed(17)).unwrap()
    }

    /// Scaler fitted on the session's own opening window.
    fn scaler_for(session: &GameSession, window: usize) -> FeatureScaler {
        let rows: Vec<f64> = session
            .window(window)
            .iter()
            .flat_map(|s| s.features())
            .collect();
        let x = Array2::from_shape_vec((1, rows.len()), rows).unwrap();
        FeatureScaler::fit(x.view()).unwrap()
    }

    #[test]
    fn both_returns_non_positive_means_all_cash() {
        let current = PricePair { stock: 100.0, bond: 200.0 };
        let predicted = PricePair { stock: 90.0, bond: 200.0 };

        let w = target_weights(predicted, current);

        assert_eq!(w, Weights { stock: 0.0, bond: 0.0, cash: 1.0 });
    }

    #[test]
    fn positive_returns_are_normalized_over_assets() {
        let current = PricePair { stock: 100.0, bond: 200.0 };
        let predicted = PricePair { stock: 110.0, bond: 210.0 };

        let w = target_weights(predicted, current);

        // Returns 0.10 and 0.05
        assert!((w.stock - 2.0 / 3.0).abs() < 1e-12);
        assert!((w.bond - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(w.cash, 0.0);
    }

    #[test]
    fn moves_all_cash_into_the_only_rising_asset() {
        // Arrange
        let s = session();
        let scaler = scaler_for(&s, DEFAULT_WINDOW);
        let stock_price = s.stock_price();
        let bond_price = s.bond_price();
        let predictor = move |_: ArrayView2<'_, f64>| -> GymResult<PricePair> {
            Ok(PricePair {
                stock: stock_price * 1.05,
                bond: bond_price * 0.95,
            })
        };
        let mut agent = PredictionAgent::new(predictor, scaler, DEFAULT_WINDOW).unwrap();

        // Act
        let actions = agent.act(s.observation()).unwrap();

        // Assert
        assert_eq!(actions.0, vec![Action::buy_stock(500_000.0)]);
        assert_eq!(agent.trace().len(), 1);
        assert_eq!(agent.trace()[0].period, Period(0));
    }

    #[test]
    fn predictor_sees_a_scaled_window() {
        let s = session();
        let scaler = scaler_for(&s, 3);
        let predictor = |w: ArrayView2<'_, f64>| -> GymResult<PricePair> {
            assert_eq!(w.dim(), (3, FEATURE_COUNT));
            // Fitted on this very row: every column is constant and scales to 0
            assert!(w.iter().all(|v| *v == 0.0), "window was not scaled: {w:?}");
            Ok(PricePair::default())
        };
        let mut agent = PredictionAgent::new(predictor, scaler, 3).unwrap();

        let actions = agent.act(s.observation()).unwrap();

        assert!(actions.is_empty(), "all-cash target from all-cash portfolio needs no trade");
    }

    #[test]
    fn too_long_a_window_is_an_error() {
        let s = session();
        let window = 20;
        let x = Array2::<f64>::zeros((2, window * FEATURE_COUNT));
        let scaler = FeatureScaler::fit(x.view()).unwrap();
        let mut agent = PredictionAgent::new(
            |_: ArrayView2<'_, f64>| -> GymResult<PricePair> { Ok(PricePair::default()) },
            scaler,
            window,
        )
        .unwrap();

        let err = agent.act(s.observation()).unwrap_err();
        assert!(err.to_string().contains("Not enough history"), "unexpected: {err}");
    }

    #[test]
    fn rejects_scaler_of_the_wrong_width() {
        let s = session();
        let scaler = scaler_for(&s, 4);
        let result = PredictionAgent::new(
            |_: ArrayView2<'_, f64>| -> GymResult<PricePair> { Ok(PricePair::default()) },
            scaler,
            DEFAULT_WINDOW,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ar_predictor_applies_the_conditional_mean_to_the_last_row() {
        // Arrange
        let s = session();
        let params = MarketParams::default();
        let rows: Vec<f64> = s.window(2).iter().flat_map(|st| st.features()).collect();
        let fit_on = Array2::from_shape_vec((2, 8), [rows.clone(), rows.iter().map(|v| v * 2.0).collect()].concat()).unwrap();
        let scaler = FeatureScaler::fit(fit_on.view()).unwrap();
        let scaled = scaler
            .transform(Array2::from_shape_vec((1, 8), rows).unwrap().view())
            .unwrap()
            .into_shape_with_order((2, FEATURE_COUNT))
            .unwrap();

        // Act
        let predicted = ArPredictor::new(params, scaler).predict(scaled.view()).unwrap();

        // Assert
        let last = s.last_state().copied().unwrap();
        let infl_gap = last.inflation - params.inflation.mean;
        let fed_gap = last.fed_rate - params.fed_rate.mean;
        let want_stock = params.stock.conditional_mean(last.stock_price, infl_gap, fed_gap);
        let want_bond = params.bond.conditional_mean(last.bond_price, infl_gap, fed_gap);
        assert!((predicted.stock - want_stock).abs() < 1e-6, "{predicted:?}");
        assert!((predicted.bond - want_bond).abs() < 1e-6, "{predicted:?}");
    }

    #[test]
    fn mean_absolute_error_scores_against_the_next_period() {
        let mut agent = PredictionAgent::new(
            |_: ArrayView2<'_, f64>| -> GymResult<PricePair> { Ok(PricePair::default()) },
            FeatureScaler::fit(Array2::<f64>::zeros((1, 4)).view()).unwrap(),
            1,
        )
        .unwrap();
        agent.trace.push(PredictionRecord {
            period: Period(0),
            predicted: PricePair { stock: 100.0, bond: 200.0 },
            current: PricePair::default(),
        });

        let s = session();
        let mut next = s.last_state().copied().unwrap();
        next.period = Period(1);
        next.stock_price = 104.0;
        next.bond_price = 198.0;

        let mae = agent.mean_absolute_error(&[next]).unwrap();
        assert_eq!(mae, PricePair { stock: 4.0, bond: 2.0 });
        assert!(agent.mean_absolute_error(&[]).is_none());
    }
}
