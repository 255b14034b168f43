//! Error types for the operator.

use std::path::PathBuf;

use nanobskt::BasketError;

/// All errors that can occur while driving a basket.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error("failed to read scenario file {path}: {source}")]
    ScenarioRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse scenario JSON: {0}")]
    ScenarioParse(#[from] serde_json::Error),

    #[error("step {index} failed: {source}")]
    StepFailed { index: usize, source: BasketError },

    #[error("step {index} succeeded but was expected to fail with '{expected}'")]
    UnexpectedSuccess { index: usize, expected: String },

    #[error("event log {path}: {source}")]
    EventLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("basket error: {0}")]
    Basket(#[from] BasketError),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
