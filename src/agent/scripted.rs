use std::collections::VecDeque;

use crate::{
    agent::{Agent, AgentIdentifier},
    error::GymResult,
    gym::{action::Actions, observation::Observation},
};

/// Replays a fixed list of per-period batches. Periods beyond the script are no-ops.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    script: Vec<Actions>,
    pending: VecDeque<Actions>,
}

impl ScriptedAgent {
    pub fn new(script: Vec<Actions>) -> Self {
        Self {
            pending: script.iter().cloned().collect(),
            script,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FromIterator<Actions> for ScriptedAgent {
    fn from_iter<T: IntoIterator<Item = Actions>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Agent for ScriptedAgent {
    fn act(&mut self, _obs: Observation) -> GymResult<Actions> {
        Ok(self.pending.pop_front().unwrap_or_default())
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Scripted
    }

    fn reset(&mut self) {
        self.pending = self.script.iter().cloned().collect();
    }
}
