/// Errors from the shared data model.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("invalid bundle id: {0}")]
    InvalidBundleId(String),
    #[error("malformed manifest: {0}")]
    Manifest(String),
    #[error("malformed exposition: {0}")]
    Exposition(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
