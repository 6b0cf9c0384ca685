use itertools::Itertools;
use ndarray::{Array2, Array3, Axis};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::info;

use crate::{
    agent::random::RandomAgent,
    error::{AgentError, DataError, GymResult, SystemError},
    gym::{
        config::SessionConfig,
        runner::BatchRunner,
        state::{FEATURE_COUNT, MarketState},
    },
    math::scaler::FeatureScaler,
};

/// Number of regression targets per sample: next stock and bond price.
pub const TARGET_COUNT: usize = 2;

/// Mixed into the game seed so agent and market draw from different streams.
const AGENT_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Plays `n` random-policy games in parallel and returns each full trajectory
/// (warm-up prelude followed by the log), ordered by game id.
///
/// With a seeded config the output is reproducible: game `i` uses `seed + i`.
#[tracing::instrument(skip(config), fields(seed = ?config.seed()))]
pub fn generate_games(n: usize, config: &SessionConfig) -> GymResult<Vec<Vec<MarketState>>> {
    let records = BatchRunner::new(*config, n)
        .with_trajectories(true)
        .play_all(|i| {
            RandomAgent::from_seed_option(config.seed_for_game(i).map(|s| s ^ AGENT_STREAM))
        })?;

    let games = records
        .into_iter()
        .map(|r| {
            r.trajectory.ok_or_else(|| {
                SystemError::InvariantViolation(format!(
                    "game {} finished without a trajectory",
                    r.game_id
                ))
                .into()
            })
        })
        .collect::<GymResult<Vec<_>>>()?;

    info!(games = games.len(), "Games Generated");
    Ok(games)
}

/// Rolling-window regression samples.
///
/// `x` has shape `(n, window, 4)` with features `(stock, bond, fed, inflation)` per row;
/// `y` has shape `(n, 2)` holding the stock and bond price that follow each window.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    x: Array3<f64>,
    y: Array2<f64>,
}

impl TrainingSet {
    /// Cuts every game into windows: for each index `j` in `window..len`, the rows
    /// `j - window..j` become one sample and the prices at `j` its target.
    pub fn from_games<G>(games: &[G], window: usize) -> GymResult<Self>
    where
        G: AsRef<[MarketState]>,
    {
        if window == 0 {
            return Err(AgentError::InvalidInput("window must be at least 1".to_string()).into());
        }

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for game in games {
            let states = game.as_ref();
            for j in window..states.len() {
                xs.extend(states[j - window..j].iter().flat_map(MarketState::features));
                ys.extend([states[j].stock_price, states[j].bond_price]);
            }
        }

        let n = ys.len() / TARGET_COUNT;
        if n == 0 {
            return Err(DataError::EmptyDataset(format!(
                "no game is longer than the window of {window}"
            ))
            .into());
        }

        let x = Array3::from_shape_vec((n, window, FEATURE_COUNT), xs).map_err(shape_error)?;
        let y = Array2::from_shape_vec((n, TARGET_COUNT), ys).map_err(shape_error)?;
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window(&self) -> usize {
        self.x.len_of(Axis(1))
    }

    pub fn x(&self) -> &Array3<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    /// `x` reshaped to `(n, window * 4)`, one flattened window per row.
    pub fn flattened_x(&self) -> GymResult<Array2<f64>> {
        let (n, w, f) = self.x.dim();
        self.x
            .to_owned()
            .into_shape_with_order((n, w * f))
            .map_err(shape_error)
    }

    /// Fits a min-max scaler on the flattened windows.
    pub fn fit_scaler(&self) -> GymResult<FeatureScaler> {
        FeatureScaler::fit(self.flattened_x()?.view())
    }

    /// Shuffles the samples with `seed` and returns `(train, test)`.
    ///
    /// The test side holds `ceil(n * test_fraction)` samples. Fails if the fraction lies
    /// outside `(0, 1)` or if either side would end up empty.
    pub fn split(&self, test_fraction: f64, seed: u64) -> GymResult<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(DataError::InvalidSplit(test_fraction).into());
        }

        let n = self.len();
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(DataError::EmptyDataset(format!(
                "splitting {n} samples at {test_fraction} leaves one side empty"
            ))
            .into());
        }

        let mut indices = (0..n).collect_vec();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }
}

fn shape_error(e: ndarray::ShapeError) -> crate::error::GymError {
    DataError::ShapeMismatch {
        expected: "a rectangular sample buffer".to_string(),
        actual: e.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use crate::{gym::state::Period, market::MarketSample, portfolio::Portfolio};

    use super::*;

    /// A synthetic game whose prices encode the row index.
    fn ramp(len: usize) -> Vec<MarketState> {
        let portfolio = Portfolio::new(500_000.0, 0.0, 0.0).unwrap();
        (0..len)
            .map(|i| {
                let sample = MarketSample {
                    inflation: 0.02,
                    fed_rate: 0.01 * i as f64,
                    stock_price: 100.0 + i as f64,
                    bond_price: 200.0 + i as f64,
                };
                MarketState::snapshot(Period(i as i32), sample, &portfolio)
            })
            .collect()
    }

    #[test]
    fn windows_and_targets_line_up() {
        let games = vec![ramp(10), ramp(8)];

        let set = TrainingSet::from_games(&games, 3).unwrap();

        assert_eq!(set.len(), 7 + 5);
        assert_eq!(set.x().dim(), (12, 3, 4));
        assert_eq!(set.y().dim(), (12, 2));

        // Sample 0: rows 0..3 predict row 3
        assert_eq!(set.x()[[0, 0, 0]], 100.0);
        assert_eq!(set.x()[[0, 2, 1]], 202.0);
        assert_eq!(set.y().row(0).to_vec(), vec![103.0, 203.0]);

        // First sample of the second game
        assert_eq!(set.x()[[7, 0, 0]], 100.0);
        assert_eq!(set.y().row(7).to_vec(), vec![103.0, 203.0]);
    }

    #[test]
    fn flattened_rows_follow_feature_order() {
        let set = TrainingSet::from_games(&[ramp(4)], 2).unwrap();

        let flat = set.flattened_x().unwrap();

        assert_eq!(flat.dim(), (2, 8));
        assert_eq!(
            flat.row(0).to_vec(),
            vec![100.0, 200.0, 0.0, 0.02, 101.0, 201.0, 0.01, 0.02]
        );
    }

    #[test]
    fn short_games_give_an_empty_dataset_error() {
        assert!(TrainingSet::from_games(&[ramp(3)], 3).is_err());
        assert!(TrainingSet::from_games::<Vec<MarketState>>(&[], 3).is_err());
        assert!(TrainingSet::from_games(&[ramp(5)], 0).is_err());
    }

    #[test]
    fn split_is_seeded_and_complete() {
        let set = TrainingSet::from_games(&[ramp(14)], 4).unwrap();

        let (train, test) = set.split(0.25, 9).unwrap();
        let (train_again, test_again) = set.split(0.25, 9).unwrap();

        assert_eq!(test.len(), 3, "ceil(10 * 0.25)");
        assert_eq!(train.len(), 7);
        assert_eq!(train, train_again);
        assert_eq!(test, test_again);

        let mut targets: Vec<f64> = train
            .y()
            .column(0)
            .iter()
            .chain(test.y().column(0).iter())
            .copied()
            .collect();
        targets.sort_by(f64::total_cmp);
        assert_eq!(targets, (4..14).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn split_rejects_degenerate_fractions() {
        let set = TrainingSet::from_games(&[ramp(6)], 4).unwrap();

        assert!(set.split(0.0, 1).is_err());
        assert!(set.split(1.0, 1).is_err());
        assert!(set.split(0.9, 1).is_err(), "2 samples at 0.9 leave no training data");
    }

    #[test]
    fn generated_games_are_full_and_reproducible() {
        let config = SessionConfig::default().with_seed(77);

        let a = generate_games(3, &config).unwrap();
        let b = generate_games(3, &config).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let expected = config.market().warmup_steps + config.max_periods() as usize + 1;
        assert!(a.iter().all(|g| g.len() == expected));
        assert!(a[0][0].period.is_warmup());
    }
}
