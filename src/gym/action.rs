use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::error::{AgentError, DataError, GymResult};

// ================================================================================================
// Command Trait
// ================================================================================================

/// Represents an executable instruction from a player or agent.
pub trait Command {
    /// Performs intrinsic validation (stateless checks).
    /// Returns `Ok(())` if the command parameters are self-consistent.
    fn validate(&self) -> GymResult<()>;
}

// ================================================================================================
// The Action Enum (The Command Wrapper)
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    EnumCount,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    BuyStock,
    SellStock,
    BuyBond,
    SellBond,
    IncreaseCash,
    DecreaseCash,
    EndTurn,
}

impl From<&Action> for ActionKind {
    fn from(action: &Action) -> Self {
        match action {
            Action::BuyStock(_) => ActionKind::BuyStock,
            Action::SellStock(_) => ActionKind::SellStock,
            Action::BuyBond(_) => ActionKind::BuyBond,
            Action::SellBond(_) => ActionKind::SellBond,
            Action::IncreaseCash(_) => ActionKind::IncreaseCash,
            Action::DecreaseCash(_) => ActionKind::DecreaseCash,
            Action::EndTurn => ActionKind::EndTurn,
        }
    }
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether this kind carries a notional amount.
    pub fn is_trade(&self) -> bool {
        !matches!(self, Self::EndTurn)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Action {
    BuyStock(TradeCmd),
    SellStock(TradeCmd),
    BuyBond(TradeCmd),
    SellBond(TradeCmd),
    IncreaseCash(TradeCmd),
    DecreaseCash(TradeCmd),
    EndTurn,
}

impl Command for Action {
    fn validate(&self) -> GymResult<()> {
        match self.trade_cmd() {
            Some(cmd) => cmd.validate(),
            None => Ok(()),
        }
    }
}

impl Action {
    pub fn buy_stock(amount: f64) -> Self {
        Self::BuyStock(TradeCmd { amount })
    }

    pub fn sell_stock(amount: f64) -> Self {
        Self::SellStock(TradeCmd { amount })
    }

    pub fn buy_bond(amount: f64) -> Self {
        Self::BuyBond(TradeCmd { amount })
    }

    pub fn sell_bond(amount: f64) -> Self {
        Self::SellBond(TradeCmd { amount })
    }

    pub fn increase_cash(amount: f64) -> Self {
        Self::IncreaseCash(TradeCmd { amount })
    }

    pub fn decrease_cash(amount: f64) -> Self {
        Self::DecreaseCash(TradeCmd { amount })
    }

    /// Builds an action from its kind; `amount` is ignored for `EndTurn`.
    pub fn from_kind(kind: ActionKind, amount: f64) -> Self {
        let cmd = TradeCmd { amount };
        match kind {
            ActionKind::BuyStock => Self::BuyStock(cmd),
            ActionKind::SellStock => Self::SellStock(cmd),
            ActionKind::BuyBond => Self::BuyBond(cmd),
            ActionKind::SellBond => Self::SellBond(cmd),
            ActionKind::IncreaseCash => Self::IncreaseCash(cmd),
            ActionKind::DecreaseCash => Self::DecreaseCash(cmd),
            ActionKind::EndTurn => Self::EndTurn,
        }
    }

    /// Parses an action from its event name, e.g. `"buy_stock"`.
    pub fn parse(name: &str, amount: f64) -> GymResult<Self> {
        let kind = ActionKind::from_str(name).map_err(DataError::from)?;
        Ok(Self::from_kind(kind, amount))
    }

    pub fn kind(&self) -> ActionKind {
        self.into()
    }

    pub fn is_end_turn(&self) -> bool {
        matches!(self, Self::EndTurn)
    }

    /// Notional of a trade action, `None` for `EndTurn`.
    pub fn amount(&self) -> Option<f64> {
        self.trade_cmd().map(|cmd| cmd.amount)
    }

    fn trade_cmd(&self) -> Option<&TradeCmd> {
        match self {
            Action::BuyStock(cmd)
            | Action::SellStock(cmd)
            | Action::BuyBond(cmd)
            | Action::SellBond(cmd)
            | Action::IncreaseCash(cmd)
            | Action::DecreaseCash(cmd) => Some(cmd),
            Action::EndTurn => None,
        }
    }
}

// ================================================================================================
// The Commands (PODs - Plain Old Data)
// ================================================================================================

/// A currency notional to move between cash and an asset class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TradeCmd {
    pub amount: f64,
}

impl Command for TradeCmd {
    fn validate(&self) -> GymResult<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(AgentError::InvalidInput(format!(
                "Trade amount must be finite and non-negative. Got: {}",
                self.amount
            ))
            .into());
        }
        Ok(())
    }
}

// ================================================================================================
// Batching
// ================================================================================================

/// An ordered batch of actions for one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actions(pub Vec<Action>);

impl Actions {
    /// Returns an [`Actions`] instance that represents **no operations**.
    pub fn no_op() -> Self {
        Actions(Vec::new())
    }

    pub fn new() -> Self {
        Self::no_op()
    }

    pub fn add(&mut self, action: Action) {
        self.0.push(action);
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.add(action);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }
}

impl From<Action> for Actions {
    fn from(action: Action) -> Self {
        Actions::new().with_action(action)
    }
}

impl From<Vec<Action>> for Actions {
    fn from(vec: Vec<Action>) -> Self {
        Actions(vec)
    }
}

impl FromIterator<Action> for Actions {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Actions(iter.into_iter().collect())
    }
}

impl IntoIterator for Actions {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
