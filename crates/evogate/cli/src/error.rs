//! CLI error type

use evogate_evaluator::EvaluationError;
use evogate_evidence::StoreError;
use evogate_executor::GateError;
use evogate_scorer::ConfigError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("invalid evaluation configuration: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("invalid scorer configuration: {0}")]
    Scorer(#[from] ConfigError),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Process exit code. Verdicts have their own codes; every error is 1.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
