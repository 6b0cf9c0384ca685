use allocation_gym::{agent::predictive::DEFAULT_WINDOW, prelude::*};
use anyhow::{Context, Result};

mod common;

const SEED: u64 = 7;
const GAMES: usize = 200;

/// Evaluates the conditional-mean baseline against the random policy.
///
/// Run the `monte_carlo` demo first; it writes the fitted scaler this demo loads.
fn main() -> Result<()> {
    let _guard = common::init_tracing()?;

    let scaler = FeatureScaler::load(common::scaler_path())
        .context("Failed to load scaler, run the monte_carlo demo first")?;
    let config = SessionConfig::from(SessionPreset::Interactive).with_seed(SEED);
    let predictor = ArPredictor::new(*config.market(), scaler.clone());
    let agent = PredictionAgent::new(predictor, scaler, DEFAULT_WINDOW)?;

    // 1. One game in detail
    let mut runner = ScenarioRunner::new(config)?;
    let mut single = agent.clone();
    let outcome = runner.run(&mut single)?;
    let mae = single.mean_absolute_error(runner.session().states());

    println!("--- Single Game ---");
    println!(
        "Final value: {:.2} (target {:.0}, rule {}, won: {})",
        outcome.final_value,
        config.win_target(),
        config.win_rule(),
        outcome.won
    );
    if let Some(mae) = mae {
        println!("MAE stock: {:.4}, MAE bond: {:.4}", mae.stock, mae.bond);
    }
    Journal::from_trajectories([(0, runner.session().states())])?
        .with_tag("single_game")
        .to_csv(common::output_dir(), None, None)?;

    // 2. Batch comparison on identical market paths
    let predictive = BatchRunner::new(config, GAMES)
        .with_progress(true)
        .run(|_| agent.clone())?;
    let random = BatchRunner::new(config, GAMES)
        .with_progress(true)
        .run(|i| RandomAgent::from_seed_option(config.seed_for_game(i)))?;

    println!("\n--- Batch ({GAMES} games) ---");
    for (name, report) in [("prediction", &predictive), ("random", &random)] {
        let s = report.summary();
        println!(
            "{name:>10}: mean {:.2}, median {:.2}, win rate {:.1}%",
            s.mean_final_value,
            s.median_final_value,
            100.0 * s.win_rate
        );
    }

    Ok(())
}
