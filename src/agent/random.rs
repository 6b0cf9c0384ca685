use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::{
    agent::{Agent, AgentIdentifier},
    error::GymResult,
    gym::{
        action::{Action, ActionKind, Actions},
        observation::Observation,
    },
};

/// Actions the random policy chooses from.
const CHOICES: [ActionKind; 3] = [
    ActionKind::BuyStock,
    ActionKind::BuyBond,
    ActionKind::IncreaseCash,
];

/// Bounds of the notional as a fraction of current portfolio value.
pub const NOTIONAL_FRACTION: (f64, f64) = (0.1, 0.4);

/// Baseline policy: one uniformly chosen trade per period, sized at a random share of the
/// portfolio.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Seeds from `seed` when given, otherwise from OS entropy.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::new(StdRng::from_os_rng()),
        }
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, obs: Observation) -> GymResult<Actions> {
        let Some(&kind) = CHOICES.choose(&mut self.rng) else {
            return Ok(Actions::no_op());
        };
        let fraction = self
            .rng
            .random_range(NOTIONAL_FRACTION.0..NOTIONAL_FRACTION.1);
        let amount = fraction * obs.portfolio_value();

        Ok(Action::from_kind(kind, amount).into())
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Random
    }
}
