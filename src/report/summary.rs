use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DataError, GymResult},
    gym::runner::GameRecord,
    report::journal::Journal,
};

/// Aggregate statistics of a batch of games.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub games: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub mean_final_value: f64,
    pub median_final_value: f64,
    pub min_final_value: f64,
    pub max_final_value: f64,
}

/// Per-game records of a batch plus their summary statistics.
#[derive(Debug, Clone)]
pub struct BatchReport {
    records: Vec<GameRecord>,
    /// Final values sorted ascending.
    sorted_values: Vec<OrderedFloat<f64>>,
}

impl BatchReport {
    /// Fails with [`DataError::EmptyDataset`] if there are no records.
    pub fn from_records(records: Vec<GameRecord>) -> GymResult<Self> {
        if records.is_empty() {
            return Err(DataError::EmptyDataset("batch has no games".to_string()).into());
        }

        let mut sorted_values: Vec<OrderedFloat<f64>> = records
            .iter()
            .map(|r| OrderedFloat(r.outcome.final_value))
            .collect();
        sorted_values.sort_unstable();

        Ok(Self {
            records,
            sorted_values,
        })
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn games(&self) -> usize {
        self.records.len()
    }

    /// Final values in game order.
    pub fn final_values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.outcome.final_value).collect()
    }

    pub fn wins(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.won).count()
    }

    pub fn win_rate(&self) -> f64 {
        self.wins() as f64 / self.games() as f64
    }

    pub fn mean_final_value(&self) -> f64 {
        self.sorted_values.iter().map(|v| v.0).sum::<f64>() / self.games() as f64
    }

    pub fn median_final_value(&self) -> f64 {
        let n = self.sorted_values.len();
        let mid = n / 2;
        if n % 2 == 0 {
            (self.sorted_values[mid - 1].0 + self.sorted_values[mid].0) / 2.0
        } else {
            self.sorted_values[mid].0
        }
    }

    pub fn min_final_value(&self) -> f64 {
        self.sorted_values[0].0
    }

    pub fn max_final_value(&self) -> f64 {
        self.sorted_values[self.sorted_values.len() - 1].0
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            games: self.games(),
            wins: self.wins(),
            win_rate: self.win_rate(),
            mean_final_value: self.mean_final_value(),
            median_final_value: self.median_final_value(),
            min_final_value: self.min_final_value(),
            max_final_value: self.max_final_value(),
        }
    }

    /// Journal of every kept trajectory, keyed by game id.
    ///
    /// Empty when the batch was played without keeping trajectories.
    pub fn journal(&self) -> GymResult<Journal> {
        Journal::from_trajectories(self.records.iter().filter_map(|r| {
            r.trajectory
                .as_deref()
                .map(|states| (r.game_id, states))
        }))
    }
}
