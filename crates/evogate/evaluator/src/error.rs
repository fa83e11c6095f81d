/// Errors from the statistical evaluator.
///
/// These never escape bundle creation: the store records them as an
/// `evaluator_error` artifact.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("invalid evaluator configuration: {0}")]
    InvalidConfig(String),
    #[error("non-finite test statistic: {0}")]
    NonFinite(String),
}
