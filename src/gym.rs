use serde::{Deserialize, Serialize};

use crate::portfolio::TradeOutcome;

pub mod action;
pub mod config;
pub mod observation;
pub mod runner;
pub mod session;
pub mod state;

/// Represents the lifecycle status of a game session.
///
/// # Lifecycle
///
/// A session is a finite state machine driven by `handle_event()` and `reset()`.
/// Advancing a period is transient inside `end_turn` and never observable.
///
/// ```md
/// Current State                          | Event            | Next State      | Notes
/// ---------------------------------------|------------------|-----------------|--------------------------------------
/// `AwaitingAction`                       | trade            | AwaitingAction  | Routed to the portfolio
/// `AwaitingAction` (period < max - 1)    | end_turn         | AwaitingAction  | Market steps, snapshot appended
/// `AwaitingAction` (period == max - 1)   | end_turn         | Terminal        | Last snapshot appended
/// `Terminal`                             | trade / end_turn | Terminal        | Ignored
/// any                                    | reset()          | AwaitingAction  | New market path, starting portfolio
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// The session accepts trades and `end_turn` for the current period.
    AwaitingAction,

    /// All periods have been played. Only `reset()` has an effect.
    Terminal,
}

impl SessionStatus {
    pub fn is_awaiting_action(&self) -> bool {
        matches!(self, Self::AwaitingAction)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

/// What a single event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventOutcome {
    /// A trade was routed to the portfolio.
    Trade(TradeOutcome),
    /// The session moved to the given period.
    Advanced(state::Period),
    /// The session is terminal; nothing happened.
    Ignored,
}

impl EventOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    pub fn trade(&self) -> Option<TradeOutcome> {
        match self {
            Self::Trade(outcome) => Some(*outcome),
            _ => None,
        }
    }
}
