use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{EnvError, GymResult},
    market::params::MarketParams,
};

/// Starting cash of a fresh portfolio.
pub const DEFAULT_STARTING_CASH: f64 = 500_000.0;

/// Number of playable periods in a game.
pub const DEFAULT_MAX_PERIODS: u32 = 18;

/// Periods are counted in `i32`, so a game cannot run longer than this.
pub const MAX_PERIODS_LIMIT: u32 = i32::MAX as u32;

// ================================================================================================
// Win Rule
// ================================================================================================

/// How the final portfolio value is compared against the win target.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WinRule {
    /// Final value strictly above the target.
    #[default]
    Above,
    /// Final value at or above the target.
    AtLeast,
}

impl WinRule {
    pub fn is_win(self, final_value: f64, target: f64) -> bool {
        match self {
            WinRule::Above => final_value > target,
            WinRule::AtLeast => final_value >= target,
        }
    }
}

// ================================================================================================
// Preset Session Configurations
// ================================================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    PartialOrd,
    Ord,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPreset {
    /// **Batch Evaluation**
    ///
    /// The setup used to score agents and generate training data.
    ///
    /// # Configuration Details
    /// * **Portfolio:** 500 000 in cash, no shares.
    /// * **Horizon:** 18 periods after 11 warm-up steps.
    /// * **Win:** Final value strictly above the starting cash.
    Evaluation,

    /// **Interactive Play**
    ///
    /// Same market and horizon, but a human player has to beat a 1 % gain.
    ///
    /// # Configuration Details
    /// * **Win:** Final value of at least 505 000.
    Interactive,
}

impl From<SessionPreset> for SessionConfig {
    fn from(preset: SessionPreset) -> Self {
        match preset {
            SessionPreset::Evaluation => SessionConfig::default(),
            SessionPreset::Interactive => SessionConfig::default()
                .with_win_target(505_000.0)
                .with_win_rule(WinRule::AtLeast),
        }
    }
}

/// Configuration blueprint for a [`GameSession`](crate::gym::session::GameSession).
///
/// # Example
///
/// ```
/// # use allocation_gym::prelude::*;
/// let cfg = SessionConfig::default()
///     .with_max_periods(12)
///     .with_seed(7);
///
/// let session = GameSession::new(cfg)?;
/// assert_eq!(session.states().len(), 1);
/// # Ok::<(), GymError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    // ========================================================================
    // Game Rules
    // ========================================================================
    max_periods: u32,

    /// Threshold the final portfolio value is compared against.
    win_target: f64,

    win_rule: WinRule,

    // ========================================================================
    // Starting Portfolio
    // ========================================================================
    starting_cash: f64,

    starting_stock_shares: f64,

    starting_bond_shares: f64,

    // ========================================================================
    // Market
    // ========================================================================
    market: MarketParams,

    /// `None` draws the market path from OS entropy.
    seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_periods: DEFAULT_MAX_PERIODS,
            win_target: DEFAULT_STARTING_CASH,
            win_rule: WinRule::Above,
            starting_cash: DEFAULT_STARTING_CASH,
            starting_stock_shares: 0.0,
            starting_bond_shares: 0.0,
            market: MarketParams::default(),
            seed: None,
        }
    }
}

// ================================================================================================
// Builder Methods
// ================================================================================================

impl SessionConfig {
    pub fn with_max_periods(self, max_periods: u32) -> Self {
        Self {
            max_periods,
            ..self
        }
    }

    pub fn with_win_target(self, win_target: f64) -> Self {
        Self { win_target, ..self }
    }

    pub fn with_win_rule(self, win_rule: WinRule) -> Self {
        Self { win_rule, ..self }
    }

    pub fn with_starting_cash(self, starting_cash: f64) -> Self {
        Self {
            starting_cash,
            ..self
        }
    }

    pub fn with_starting_shares(self, stock_shares: f64, bond_shares: f64) -> Self {
        Self {
            starting_stock_shares: stock_shares,
            starting_bond_shares: bond_shares,
            ..self
        }
    }

    pub fn with_market(self, market: MarketParams) -> Self {
        Self { market, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn without_seed(self) -> Self {
        Self { seed: None, ..self }
    }
}

// ================================================================================================
// Accessor Methods
// ================================================================================================

impl SessionConfig {
    pub fn max_periods(&self) -> u32 {
        self.max_periods
    }

    pub fn win_target(&self) -> f64 {
        self.win_target
    }

    pub fn win_rule(&self) -> WinRule {
        self.win_rule
    }

    /// Whether `final_value` wins under this configuration's target and rule.
    pub fn is_win(&self, final_value: f64) -> bool {
        self.win_rule.is_win(final_value, self.win_target)
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn starting_stock_shares(&self) -> f64 {
        self.starting_stock_shares
    }

    pub fn starting_bond_shares(&self) -> f64 {
        self.starting_bond_shares
    }

    pub fn market(&self) -> &MarketParams {
        &self.market
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Seed of the `index`-th game in a batch, derived from the base seed.
    pub fn seed_for_game(&self, index: usize) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(index as u64))
    }

    pub fn validate(&self) -> GymResult<()> {
        if self.max_periods == 0 {
            return Err(EnvError::InvalidConfig("`max_periods` must be at least 1".to_string()).into());
        }
        if self.max_periods > MAX_PERIODS_LIMIT {
            return Err(EnvError::InvalidConfig(format!(
                "`max_periods` must be at most {MAX_PERIODS_LIMIT}, got {}",
                self.max_periods
            ))
            .into());
        }
        if !self.win_target.is_finite() {
            return Err(EnvError::InvalidConfig(format!(
                "`win_target` must be finite, got {}",
                self.win_target
            ))
            .into());
        }
        for (name, value) in [
            ("starting_cash", self.starting_cash),
            ("starting_stock_shares", self.starting_stock_shares),
            ("starting_bond_shares", self.starting_bond_shares),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EnvError::InvalidConfig(format!(
                    "`{name}` must be finite and non-negative, got {value}"
                ))
                .into());
            }
        }
        self.market.validate()
    }

    /// Computes a deterministic hash of this configuration.
    ///
    /// Used to name exported datasets so that runs with identical settings share a file.
    pub fn hash(&self) -> GymResult<String> {
        let mut hasher = blake3::Hasher::new();
        let bytes = postcard::to_stdvec(self).map_err(EnvError::Encoding)?;
        hasher.update(&bytes);
        Ok(format!("{}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn defaults_describe_an_18_period_game() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.max_periods(), 18);
        assert_eq!(cfg.starting_cash(), 500_000.0);
        assert_eq!(cfg.win_target(), 500_000.0);
        assert_eq!(cfg.market().warmup_steps, 11);
        assert!(cfg.seed().is_none());
    }

    #[test]
    fn presets_parse_from_snake_case() {
        let preset = SessionPreset::from_str("interactive").expect("preset should parse");
        let cfg = SessionConfig::from(preset);
        assert_eq!(cfg.win_target(), 505_000.0);
        assert_eq!(cfg.win_rule(), WinRule::AtLeast);
        assert_eq!(
            SessionConfig::from(SessionPreset::Evaluation),
            SessionConfig::default()
        );
    }

    #[test]
    fn hash_is_stable_and_sensitive() {
        let a = SessionConfig::default().with_seed(1);
        let b = SessionConfig::default().with_seed(1);
        let c = SessionConfig::default().with_seed(2);

        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        assert_ne!(a.hash().unwrap(), c.hash().unwrap(), "seed must affect the hash");
    }

    #[test]
    fn game_seeds_are_offset_from_base() {
        let cfg = SessionConfig::default().with_seed(100);
        assert_eq!(cfg.seed_for_game(0), Some(100));
        assert_eq!(cfg.seed_for_game(7), Some(107));
        assert_eq!(SessionConfig::default().seed_for_game(3), None);
    }

    #[test]
    fn rejects_zero_periods() {
        assert!(SessionConfig::default().with_max_periods(0).validate().is_err());
    }

    #[test]
    fn bounds_max_periods_to_the_period_counter() {
        let at_limit = SessionConfig::default().with_max_periods(MAX_PERIODS_LIMIT);
        let beyond = SessionConfig::default().with_max_periods(u32::MAX);

        assert!(at_limit.validate().is_ok());
        let err = beyond.validate().unwrap_err();
        assert!(err.to_string().contains("max_periods"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_negative_or_non_finite_starting_holdings() {
        let base = SessionConfig::default();

        assert!(base.with_starting_cash(-1.0).validate().is_err());
        assert!(base.with_starting_cash(f64::NAN).validate().is_err());
        assert!(base.with_starting_cash(f64::INFINITY).validate().is_err());
        assert!(base.with_starting_shares(-0.5, 0.0).validate().is_err());
        assert!(base.with_starting_shares(0.0, f64::NAN).validate().is_err());
        assert!(base.with_starting_shares(2.0, 3.0).validate().is_ok());
    }

    #[test]
    fn win_rules_differ_only_at_the_target() {
        assert!(!WinRule::Above.is_win(505_000.0, 505_000.0));
        assert!(WinRule::AtLeast.is_win(505_000.0, 505_000.0));

        assert!(WinRule::Above.is_win(505_000.01, 505_000.0));
        assert!(WinRule::AtLeast.is_win(505_000.01, 505_000.0));
        assert!(!WinRule::AtLeast.is_win(504_999.99, 505_000.0));

        assert_eq!(WinRule::from_str("at_least").unwrap(), WinRule::AtLeast);
        assert_eq!(SessionConfig::default().win_rule(), WinRule::Above);
    }
}
