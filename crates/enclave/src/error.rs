use std::time::Duration;

/// Failure reported by a control-plane backend.
#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("control plane unavailable: {0}")]
    Unavailable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("enclave {0} has been released")]
    Released(String),

    #[error("service {service} has no public port {port_id}")]
    MissingPort { service: String, port_id: String },

    #[error("{stage} failed: {message}")]
    RunFailed { stage: &'static str, message: String },

    #[error("remote error: {0}")]
    Remote(String),
}

impl ControlPlaneError {
    /// `true` when the remote side reports that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ControlPlaneError>;

/// The enclave could not be provisioned. Never retried by the manager.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("invalid enclave name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("enclave name {0} was already used in this session")]
    NameInUse(String),

    #[error("failed to create enclave {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: ControlPlaneError,
    },
}

/// Outcome of a scoped run, see [`EnclaveManager::with_enclave`](crate::EnclaveManager::with_enclave).
///
/// `Workflow` carries the caller's own error unchanged; a release failure
/// that happened afterwards is reported through logs and
/// [`EnclaveManager::leaked`](crate::EnclaveManager::leaked), never here.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError<E> {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("workflow in enclave {enclave} failed: {source}")]
    Workflow {
        enclave: String,
        #[source]
        source: E,
    },

    #[error("workflow in enclave {enclave} timed out after {after:?}")]
    TimedOut { enclave: String, after: Duration },
}

impl<E> ScopeError<E> {
    /// The workflow's own error, if that is what ended the scope.
    pub fn into_workflow(self) -> Option<E> {
        match self {
            Self::Workflow { source, .. } => Some(source),
            _ => None,
        }
    }
}
