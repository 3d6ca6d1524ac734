use std::time::Duration;

use enclave::{AcquisitionError, ControlPlaneError, ScopeError};

#[derive(Debug, thiserror::Error)]
pub enum QuickstartError {
    #[error("config error: {0}")]
    Config(String),

    #[error("engine error: {0}")]
    Engine(#[from] enclave_engine::EngineError),

    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("{0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("enclave {enclave} timed out after {after:?}")]
    TimedOut { enclave: String, after: Duration },

    #[error("api error: {0}")]
    Api(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("teardown of enclave {0} failed, clean it up manually: {1}")]
    Teardown(String, String),
}

impl From<ScopeError<QuickstartError>> for QuickstartError {
    fn from(err: ScopeError<QuickstartError>) -> Self {
        match err {
            ScopeError::Acquisition(e) => Self::Acquisition(e),
            ScopeError::Workflow { source, .. } => source,
            ScopeError::TimedOut { enclave, after } => Self::TimedOut { enclave, after },
        }
    }
}

pub type QuickstartResult<T> = Result<T, QuickstartError>;
