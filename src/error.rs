use thiserror::Error;

pub type GymResult<T> = Result<T, GymError>;

#[derive(Debug, Error)]
pub enum GymError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors raised while building or sampling the market process.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Invalid market parameter `{name}`: {msg}")]
    InvalidParameter { name: &'static str, msg: String },

    #[error("Invalid distribution for `{name}`: {msg}")]
    Distribution { name: &'static str, msg: String },
}

/// Errors raised when a portfolio cannot be constructed.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Price history for stocks and bonds must not be empty")]
    EmptyPriceHistory,

    #[error("Invalid starting holdings: {0}")]
    InvalidHoldings(String),
}

/// Errors occurring within Agent logic or execution.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid input to agent: {0}")]
    InvalidInput(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Not enough history for a window of {required} states (got {available})")]
    InsufficientHistory { required: usize, available: usize },
}

/// Errors related to datasets, feature scaling and report frames.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Invalid split fraction {0}: must lie in (0, 1)")]
    InvalidSplit(f64),

    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Failed to parse enum: {0}")]
    ParseEnum(#[from] strum::ParseError),
}

/// Errors related to session configuration and the run loop.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode SessionConfig")]
    Encoding(#[from] postcard::Error),

    #[error("Progress bar error")]
    ProgressBar(#[from] indicatif::style::TemplateError),
}

/// Errors related to File I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),
}

/// Errors related to internal invariants.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
