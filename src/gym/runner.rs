use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    agent::{Agent, AgentIdentifier},
    error::{EnvError, GymError, GymResult},
    gym::{
        EventOutcome,
        action::Action,
        config::SessionConfig,
        session::{GameOutcome, GameSession},
        state::MarketState,
    },
    report::summary::BatchReport,
};

// ================================================================================================
// Scenario Runner
// ================================================================================================

/// Drives one session through all of its periods under an [`Agent`].
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    session: GameSession,
    fresh: bool,
}

impl ScenarioRunner {
    pub fn new(config: SessionConfig) -> GymResult<Self> {
        Ok(Self::from_session(GameSession::new(config)?))
    }

    /// Wraps an unplayed session; the first `run()` plays on its current market path.
    pub fn from_session(session: GameSession) -> Self {
        Self {
            session,
            fresh: true,
        }
    }

    /// Plays a full game and returns its outcome.
    ///
    /// The agent is reset before the first period and consulted once per period; its batch
    /// is applied in order and the turn is ended unless the batch already did so. Every run
    /// after the first starts from `reset()`, i.e. on a new market path.
    #[tracing::instrument(skip_all, fields(agent = %agent.identifier()))]
    pub fn run<A: Agent>(&mut self, agent: &mut A) -> GymResult<GameOutcome> {
        if !self.fresh {
            self.session.reset();
        }
        self.fresh = false;
        agent.reset();

        while !self.session.is_terminal() {
            let actions = agent.act(self.session.observation())?;
            let advanced = self
                .session
                .apply(actions)
                .iter()
                .any(EventOutcome::is_advanced);
            if !advanced {
                self.session.handle_event(Action::EndTurn);
            }
        }

        let outcome = self.session.outcome();
        info!(
            final_value = outcome.final_value,
            won = outcome.won,
            "Game Finished"
        );
        Ok(outcome)
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn into_session(self) -> GameSession {
        self.session
    }
}

// ================================================================================================
// Batch Runner
// ================================================================================================

/// Result of one game in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub agent: AgentIdentifier,
    pub outcome: GameOutcome,
    /// Prelude and log of the game, if the batch keeps trajectories.
    pub trajectory: Option<Vec<MarketState>>,
}

/// Plays many independent games in parallel.
///
/// Game `i` gets its own session seeded with `base_seed + i` (OS entropy when the config
/// has no seed) and its own agent from the factory. No state is shared between games.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    config: SessionConfig,
    games: usize,
    show_progress: bool,
    keep_trajectories: bool,
}

impl BatchRunner {
    pub fn new(config: SessionConfig, games: usize) -> Self {
        Self {
            config,
            games,
            show_progress: false,
            keep_trajectories: false,
        }
    }

    pub fn with_progress(self, show_progress: bool) -> Self {
        Self {
            show_progress,
            ..self
        }
    }

    pub fn with_trajectories(self, keep_trajectories: bool) -> Self {
        Self {
            keep_trajectories,
            ..self
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn games(&self) -> usize {
        self.games
    }

    /// Plays all games and summarizes them.
    pub fn run<A, F>(&self, make_agent: F) -> GymResult<BatchReport>
    where
        A: Agent,
        F: Fn(usize) -> A + Sync,
    {
        BatchReport::from_records(self.play_all(make_agent)?)
    }

    /// Plays all games and returns one record per game, ordered by game id.
    pub fn play_all<A, F>(&self, make_agent: F) -> GymResult<Vec<GameRecord>>
    where
        A: Agent,
        F: Fn(usize) -> A + Sync,
    {
        self.config.validate()?;
        let pb = if self.show_progress {
            progress_bar(self.games as u64)?
        } else {
            ProgressBar::hidden()
        };
        pb.set_message("Playing games...");

        let mut records = (0..self.games)
            .into_par_iter()
            .try_fold(Vec::new, |mut acc, game_id| {
                acc.push(self.worker(game_id, make_agent(game_id))?);
                pb.inc(1);
                Ok(acc)
            })
            .try_reduce(Vec::new, |mut a, b| {
                a.extend(b);
                Ok::<_, GymError>(a)
            })?;
        records.sort_unstable_by_key(|r| r.game_id);

        pb.finish_with_message("Batch complete.");
        info!(games = records.len(), "Batch Complete");
        Ok(records)
    }

    #[tracing::instrument(skip(self, agent), fields(game_id = %game_id))]
    fn worker<A: Agent>(&self, game_id: usize, mut agent: A) -> GymResult<GameRecord> {
        let config = match self.config.seed_for_game(game_id) {
            Some(seed) => self.config.with_seed(seed),
            None => self.config,
        };

        let mut runner = ScenarioRunner::new(config)?;
        let outcome = runner.run(&mut agent)?;
        let trajectory = self
            .keep_trajectories
            .then(|| runner.session().state_log().trajectory());

        Ok(GameRecord {
            game_id,
            agent: agent.identifier(),
            outcome,
            trajectory,
        })
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================
fn progress_bar(capacity: u64) -> GymResult<ProgressBar> {
    let bar = ProgressBar::new(capacity);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {msg}")
            .map_err(EnvError::ProgressBar)?
            .progress_chars("#>-"));
    Ok(bar)
}

#[cfg(test)]
mod tests {
    use crate::{
        agent::{random::RandomAgent, scripted::ScriptedAgent},
        gym::{action::Actions, state::Period},
    };

    use super::*;

    #[test]
    fn scenario_plays_every_period() {
        let mut runner = ScenarioRunner::new(SessionConfig::default().with_seed(5)).unwrap();
        let mut agent = RandomAgent::seeded(5);

        let outcome = runner.run(&mut agent).unwrap();

        assert_eq!(outcome.periods, Period(18));
        assert_eq!(runner.session().states().len(), 19);
        assert_eq!(outcome.won, outcome.final_value > 500_000.0);
    }

    #[test]
    fn agent_end_turn_is_not_doubled() {
        // Arrange: the script ends every turn itself
        let script = vec![Actions::from(Action::EndTurn); 18];
        let mut agent = ScriptedAgent::new(script);
        let mut runner = ScenarioRunner::new(SessionConfig::default().with_seed(5)).unwrap();

        // Act
        runner.run(&mut agent).unwrap();

        // Assert: 18 scripted end_turns are exactly the 18 periods
        assert_eq!(agent.remaining(), 0);
        assert!(runner.session().is_terminal());
    }

    #[test]
    fn second_run_starts_a_new_game() {
        let mut runner = ScenarioRunner::new(SessionConfig::default().with_seed(5)).unwrap();
        let mut agent = ScriptedAgent::default();

        let first = runner.run(&mut agent).unwrap();
        let second = runner.run(&mut agent).unwrap();

        assert_eq!(first.final_value, 500_000.0, "all-cash portfolio keeps its value");
        assert_eq!(second.periods, Period(18));
        assert_eq!(runner.session().states().len(), 19);
    }

    #[test]
    fn batch_is_deterministic_and_ordered() {
        let runner = BatchRunner::new(SessionConfig::default().with_seed(1_000), 16);

        let a = runner.play_all(|i| RandomAgent::seeded(i as u64)).unwrap();
        let b = runner.play_all(|i| RandomAgent::seeded(i as u64)).unwrap();

        assert_eq!(a, b, "same seeds must give the same batch");
        let ids: Vec<usize> = a.iter().map(|r| r.game_id).collect();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());
        assert!(a.iter().all(|r| r.trajectory.is_none()));
    }

    #[test]
    fn batch_games_use_offset_seeds() {
        let config = SessionConfig::default().with_seed(50);
        let records = BatchRunner::new(config, 3)
            .with_trajectories(true)
            .play_all(|_| ScriptedAgent::default())
            .unwrap();

        // Game 2 of the batch equals a standalone game seeded with 52
        let mut single = ScenarioRunner::new(config.with_seed(52)).unwrap();
        single.run(&mut ScriptedAgent::default()).unwrap();

        let trajectory = records[2].trajectory.as_ref().unwrap();
        assert_eq!(trajectory, &single.session().state_log().trajectory());
        assert_eq!(trajectory.len(), 11 + 19);
    }
}
