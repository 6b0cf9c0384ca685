// 1. Traits
pub use crate::agent::Agent;
pub use crate::agent::predictive::Predictor;
pub use crate::gym::action::Command;
pub use crate::market::PriceSource;
pub use crate::report::io::{Report, ReportName, ToCsv, ToJson, ToParquet, ToSchema};

// 2. The Core "Loop" Types
pub use crate::gym::{
    EventOutcome, SessionStatus,
    action::{Action, ActionKind, Actions, TradeCmd},
    config::{SessionConfig, SessionPreset, WinRule},
    observation::Observation,
    runner::{BatchRunner, GameRecord, ScenarioRunner},
    session::{GameOutcome, GameSession},
    state::{MarketState, Period, StateLog},
};

// 3. Market & Portfolio
pub use crate::market::{
    MarketSample, PriceHistory,
    params::{AssetParams, MarketParams, RateParams},
    process::{MarketHistory, MarketProcess},
};
pub use crate::portfolio::{Asset, Portfolio, Rejection, TradeOutcome, Weights};

// 4. Agents
pub use crate::agent::{
    AgentIdentifier,
    predictive::{ArPredictor, PredictionAgent, PredictionRecord, PricePair},
    random::RandomAgent,
    scripted::ScriptedAgent,
};

// 5. Data & Reports
pub use crate::data::dataset::{TrainingSet, generate_games};
pub use crate::math::scaler::FeatureScaler;
pub use crate::report::{
    journal::{Journal, JournalCol},
    summary::{BatchReport, BatchSummary},
};

// 6. Errors
pub use crate::error::{
    AgentError, DataError, EnvError, GymError, GymResult, IoError, MarketError, PortfolioError,
    SystemError,
};
