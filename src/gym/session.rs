use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{EnvError, GymResult},
    gym::{
        EventOutcome, SessionStatus,
        action::{Action, Actions, Command},
        config::SessionConfig,
        observation::Observation,
        state::{MarketState, Period, StateLog},
    },
    market::{PriceSource, process::MarketProcess},
    portfolio::{Asset, Portfolio, Rejection, TradeOutcome, Weights},
};

/// Final result of a played game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub final_value: f64,
    pub won: bool,
    pub periods: Period,
}

/// One game: a market, a portfolio, the period counter and the snapshot log.
///
/// Trades execute immediately at the latest market prices. `end_turn` steps the market
/// once and appends exactly one snapshot. After `max_periods` advances the session is
/// [`SessionStatus::Terminal`] and the log holds `max_periods + 1` snapshots.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: SessionConfig,
    market: MarketProcess,
    starting_portfolio: Portfolio,
    portfolio: Portfolio,
    period: Period,
    last_period: Period,
    states: StateLog,
    status: SessionStatus,
}

impl GameSession {
    /// Validates `config`, initializes the market and records the opening snapshots.
    pub fn new(config: SessionConfig) -> GymResult<Self> {
        config.validate()?;
        let last_period = i32::try_from(config.max_periods())
            .map(Period)
            .map_err(|_| {
                EnvError::InvalidConfig(format!(
                    "`max_periods` of {} overflows the period counter",
                    config.max_periods()
                ))
            })?;

        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let market = MarketProcess::new(*config.market(), rng)?;
        let starting_portfolio = Portfolio::new(
            config.starting_cash(),
            config.starting_stock_shares(),
            config.starting_bond_shares(),
        )?;

        let mut session = Self {
            states: StateLog::default(),
            config,
            market,
            starting_portfolio,
            portfolio: starting_portfolio,
            period: Period(0),
            last_period,
            status: SessionStatus::AwaitingAction,
        };
        session.record_opening_states();
        Ok(session)
    }

    /// Starts a new game on a fresh market path with the starting portfolio.
    #[tracing::instrument(skip(self), fields(seed = ?self.config.seed()))]
    pub fn reset(&mut self) -> Observation<'_> {
        self.market.initialize();
        self.portfolio = self.starting_portfolio;
        self.period = Period(0);
        self.status = SessionStatus::AwaitingAction;
        self.record_opening_states();

        info!(
            stock_price = self.market.stock_price(),
            bond_price = self.market.bond_price(),
            "Session Reset"
        );
        self.observation()
    }

    /// Routes one player event.
    ///
    /// Trades go to the portfolio, `end_turn` advances the period. Every event is a no-op
    /// once the session is terminal. Rejected trades are logged and leave holdings untouched.
    pub fn handle_event(&mut self, action: Action) -> EventOutcome {
        if self.status.is_terminal() {
            debug!(action = %action.kind(), "Session Terminal: event ignored");
            return EventOutcome::Ignored;
        }

        if let Err(e) = action.validate() {
            warn!(
                period = %self.period,
                action = %action.kind(),
                error = %e,
                "Command Rejected"
            );
            return EventOutcome::Trade(TradeOutcome::Rejected(Rejection::InvalidAmount));
        }

        let outcome = match action {
            Action::EndTurn => return EventOutcome::Advanced(self.end_turn()),
            Action::BuyStock(cmd) => self.portfolio.buy(Asset::Stock, cmd.amount, &self.market),
            Action::SellStock(cmd) => self.portfolio.sell(Asset::Stock, cmd.amount, &self.market),
            Action::BuyBond(cmd) => self.portfolio.buy(Asset::Bond, cmd.amount, &self.market),
            Action::SellBond(cmd) => self.portfolio.sell(Asset::Bond, cmd.amount, &self.market),
            Action::IncreaseCash(cmd) => self.portfolio.increase_cash(cmd.amount, &self.market),
            Action::DecreaseCash(cmd) => self.portfolio.decrease_cash(cmd.amount, &self.market),
        };

        let amount = action.amount().unwrap_or_default();
        match outcome {
            TradeOutcome::Rejected(reason) => warn!(
                period = %self.period,
                action = %action.kind(),
                amount,
                %reason,
                "Command Rejected"
            ),
            _ => debug!(
                period = %self.period,
                action = %action.kind(),
                amount,
                ?outcome,
                "Command Applied"
            ),
        }
        EventOutcome::Trade(outcome)
    }

    /// Routes a batch of events in order.
    pub fn apply(&mut self, actions: Actions) -> Vec<EventOutcome> {
        actions
            .into_iter()
            .map(|action| self.handle_event(action))
            .collect()
    }

    pub fn observation(&self) -> Observation<'_> {
        Observation {
            period: self.period,
            max_periods: self.config.max_periods(),
            market: self.market.last(),
            portfolio: &self.portfolio,
            states: &self.states,
        }
    }

    /// Final value and win flag, evaluated at the current prices.
    pub fn outcome(&self) -> GameOutcome {
        let final_value = self.portfolio_value();
        GameOutcome {
            final_value,
            won: self.config.is_win(final_value),
            periods: self.period,
        }
    }
}

// ================================================================================================
// Accessor Methods
// ================================================================================================

impl GameSession {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Playable snapshots, period 0 first.
    pub fn states(&self) -> &[MarketState] {
        self.states.states()
    }

    pub fn state_log(&self) -> &StateLog {
        &self.states
    }

    pub fn last_state(&self) -> Option<&MarketState> {
        self.states.last()
    }

    pub fn prelude(&self) -> &[MarketState] {
        self.states.prelude()
    }

    pub fn window(&self, w: usize) -> Vec<MarketState> {
        self.states.window(w)
    }

    pub fn market(&self) -> &MarketProcess {
        &self.market
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn portfolio_value(&self) -> f64 {
        self.portfolio.value(&self.market)
    }

    pub fn weights(&self) -> Weights {
        self.portfolio.weights(&self.market)
    }

    pub fn stock_price(&self) -> f64 {
        self.market.stock_price()
    }

    pub fn bond_price(&self) -> f64 {
        self.market.bond_price()
    }
}

// ================================================================================================
// Transition
// ================================================================================================

impl GameSession {
    #[tracing::instrument(skip(self), fields(period = %self.period))]
    fn end_turn(&mut self) -> Period {
        self.period += 1;
        let sample = self.market.step();
        self.states
            .push(MarketState::snapshot(self.period, sample, &self.portfolio));

        if self.period.0 >= self.last_period.0 {
            self.status = SessionStatus::Terminal;
            info!(
                final_value = self.portfolio_value(),
                "Session Terminal"
            );
        } else {
            debug!(value = self.portfolio_value(), "Period Advanced");
        }
        self.period
    }

    /// Snapshots every sample produced by `initialize()`: the warm-up samples become the
    /// prelude, the last one is period 0.
    fn record_opening_states(&mut self) {
        self.states.clear();
        let last = self.market.len().saturating_sub(1);
        for index in 0..self.market.len() {
            let Some(sample) = self.market.sample(index) else {
                continue;
            };
            let period = Period(index as i32 - last as i32);
            let state = MarketState::snapshot(period, sample, &self.portfolio);
            if period.is_warmup() {
                self.states.push_prelude(state);
            } else {
                self.states.push(state);
            }
        }
    }
}
