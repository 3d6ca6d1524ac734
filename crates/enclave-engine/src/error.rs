/// Errors raised while constructing an [`EngineClient`](crate::EngineClient).
/// Failures of individual calls surface as [`enclave::ControlPlaneError`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid engine url: {0}")]
    InvalidUrl(String),

    #[error("invalid path segment {0}")]
    InvalidPath(String),

    #[error("http client: {0}")]
    Client(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
