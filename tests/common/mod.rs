use allocation_gym::prelude::*;

pub const SEED: u64 = 2_024;

pub fn setup_config() -> SessionConfig {
    SessionConfig::default().with_seed(SEED)
}

/// Games generated with the random policy, for fitting scalers and predictors.
pub fn setup_games(n: usize) -> Vec<Vec<MarketState>> {
    generate_games(n, &setup_config().with_seed(SEED + 1_000)).expect("game generation failed")
}

/// A prediction agent backed by the conditional-mean baseline, fitted on fresh games.
pub fn setup_prediction_agent(window: usize) -> PredictionAgent<ArPredictor> {
    let games = setup_games(8);
    let set = TrainingSet::from_games(&games, window).expect("dataset failed");
    let scaler = set.fit_scaler().expect("scaler fit failed");
    let predictor = ArPredictor::new(*setup_config().market(), scaler.clone());
    PredictionAgent::new(predictor, scaler, window).expect("agent construction failed")
}
