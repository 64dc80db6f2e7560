use thiserror::Error;

/// Boxed error raised by a collaborator (catalog API, cache, ...).
pub type UpstreamError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the clustering pipeline.
///
/// Every variant except [`PipelineError::Upstream`] is a deterministic
/// function of the pipeline input, so retrying with the same input is
/// pointless. Upstream errors are carried unchanged for the caller to judge.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("upstream failure: {0}")]
    Upstream(#[source] UpstreamError),

    #[error("pipeline cancelled")]
    Cancelled,
}

impl From<UpstreamError> for PipelineError {
    /// Pipeline errors raised inside a collaborator come back out as themselves.
    fn from(err: UpstreamError) -> Self {
        match err.downcast::<PipelineError>() {
            Ok(inner) => *inner,
            Err(err) => PipelineError::Upstream(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
