use evogate_types::{BundleId, Drift, TypesError};

/// Errors from the evidence store.
///
/// Evaluation shortfalls are not errors; they are recorded in the bundle.
/// Everything here is fatal to the operation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Types(#[from] TypesError),
    #[error("evidence bundle not found: {0}")]
    BundleNotFound(BundleId),
    #[error("evidence bundle {0} is sealed")]
    Sealed(BundleId),
    #[error("evidence bundle {0} is not sealed")]
    NotSealed(BundleId),
    #[error("evidence bundle {id} tampered: {} drifting path(s)", drift.len())]
    Tampered { id: BundleId, drift: Vec<Drift> },
    #[error("evaluation artifact for {0} is not available")]
    ArtifactUnavailable(BundleId),
    #[error("timed out waiting to seal {0}")]
    SealLockBusy(BundleId),
    #[error("no sealed evidence bundle")]
    NoBundles,
    #[error("could not allocate a unique bundle id after {0} attempts")]
    IdExhausted(u32),
    #[error("invalid post-seal file name: {0}")]
    InvalidFileName(String),
    #[error("background task failed: {0}")]
    Join(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
