use std::time::Instant;

use allocation_gym::{agent::predictive::DEFAULT_WINDOW, prelude::*};
use anyhow::{Context, Result};
use tracing::info;

mod common;

const SEED: u64 = 42;
const TRAINING_GAMES: usize = 500;
const BASELINE_GAMES: usize = 1_000;

fn main() -> Result<()> {
    let _guard = common::init_tracing()?;
    let config = SessionConfig::default().with_seed(SEED);
    let out = common::output_dir();

    // 1. Training data from random-policy games
    let gen_start = Instant::now();
    let games = generate_games(TRAINING_GAMES, &config).context("Failed to generate games")?;
    let gen_time = gen_start.elapsed();

    let set = TrainingSet::from_games(&games, DEFAULT_WINDOW)?;
    let (train, test) = set.split(0.2, SEED)?;
    let scaler = train.fit_scaler()?;
    scaler.save(common::scaler_path())?;
    info!(
        train = train.len(),
        test = test.len(),
        window = DEFAULT_WINDOW,
        "Dataset Ready"
    );

    // 2. Random baseline
    let batch_start = Instant::now();
    let report = BatchRunner::new(config, BASELINE_GAMES)
        .with_progress(true)
        .with_trajectories(true)
        .run(|i| RandomAgent::from_seed_option(config.seed_for_game(i)))?;
    let batch_time = batch_start.elapsed();

    let journal = report.journal()?.with_tag(config.hash()?);
    let journal_path = journal.to_parquet(&out, None, None)?;

    println!("\n--- Random Baseline ---");
    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    println!("\n--- Artifacts ---");
    println!("Scaler:  {}", common::scaler_path().display());
    println!("Journal: {}", journal_path.display());
    println!("\n--- Timings ---");
    println!("1. Game generation ({TRAINING_GAMES} games): {gen_time:?}");
    println!("2. Baseline batch ({BASELINE_GAMES} games):  {batch_time:?}");

    Ok(())
}
