use evogate_evidence::StoreError;
use evogate_scorer::ConfigError;
use evogate_stability::StabilityError;
use evogate_types::GateDecision;

/// Errors from version-control backends.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("tag not found: {0}")]
    TagNotFound(String),
    #[error("tag already exists: {0}")]
    TagExists(String),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Errors from the gate executor.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error("invalid scorer configuration: {0}")]
    Scorer(#[from] ConfigError),
    #[error(transparent)]
    Stability(#[from] StabilityError),
    #[error("invalid gate configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The decision was recorded but its version-control action did not
    /// complete. A human needs to look.
    #[error("{} action failed: {reason}", decision.kind)]
    ActionFailed {
        decision: Box<GateDecision>,
        reason: String,
    },
}

pub type GateResult<T> = Result<T, GateError>;
