use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::config::RunConfig;
use crate::control_plane::ControlPlane;
use crate::error::{ControlPlaneError, Result};
use crate::types::{ExecResult, RunResult, ServiceInfo};

/// Lifecycle of an acquired enclave. States only move forward.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnclaveState {
    Acquired = 0,
    Stopped = 1,
    Destroyed = 2,
}

impl EnclaveState {
    fn from_u8(v: u8) -> Self {
        debug_assert!(v <= 2, "invalid EnclaveState: {v}");
        match v {
            0 => Self::Acquired,
            1 => Self::Stopped,
            _ => Self::Destroyed,
        }
    }
}

impl std::fmt::Display for EnclaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquired => f.write_str("acquired"),
            Self::Stopped => f.write_str("stopped"),
            Self::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// Identity of one acquired enclave. Clones share the lifecycle state.
#[derive(Debug, Clone)]
pub struct EnclaveHandle {
    name: String,
    uuid: String,
    created_at_epoch_seconds: i64,
    state: Arc<AtomicU8>,
}

impl EnclaveHandle {
    pub(crate) fn new(name: String, uuid: String, created_at_epoch_seconds: i64) -> Self {
        Self {
            name,
            uuid,
            created_at_epoch_seconds,
            state: Arc::new(AtomicU8::new(EnclaveState::Acquired as u8)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn created_at_epoch_seconds(&self) -> i64 {
        self.created_at_epoch_seconds
    }

    pub fn state(&self) -> EnclaveState {
        EnclaveState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` unless the handle is already further along.
    /// Returns the state before the call.
    pub(crate) fn advance(&self, to: EnclaveState) -> EnclaveState {
        EnclaveState::from_u8(self.state.fetch_max(to as u8, Ordering::AcqRel))
    }
}

/// Capability to operate on one acquired enclave.
///
/// Valid only while the handle is [`EnclaveState::Acquired`]; afterwards
/// every operation fails with [`ControlPlaneError::Released`].
#[derive(Clone)]
pub struct EnclaveContext {
    handle: EnclaveHandle,
    control_plane: Arc<dyn ControlPlane>,
}

impl EnclaveContext {
    pub(crate) fn new(handle: EnclaveHandle, control_plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            handle,
            control_plane,
        }
    }

    pub fn handle(&self) -> &EnclaveHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    fn ensure_live(&self) -> Result<()> {
        match self.handle.state() {
            EnclaveState::Acquired => Ok(()),
            _ => Err(ControlPlaneError::Released(self.handle.name.clone())),
        }
    }

    /// Run a remote package (e.g. `github.com/org/repo/package`) in this enclave.
    pub async fn run_package(&self, package: &str, config: &RunConfig) -> Result<RunResult> {
        self.ensure_live()?;
        self.control_plane
            .run_package(self.name(), package, config)
            .await
    }

    /// Run an inline script in this enclave.
    pub async fn run_script(&self, script: &str, config: &RunConfig) -> Result<RunResult> {
        self.ensure_live()?;
        self.control_plane
            .run_script(self.name(), script, config)
            .await
    }

    pub async fn service(&self, service: &str) -> Result<ServiceInfo> {
        self.ensure_live()?;
        self.control_plane.service(self.name(), service).await
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        self.ensure_live()?;
        self.control_plane.list_services(self.name()).await
    }

    /// Run a command in `service`. A non-zero exit code is not an error;
    /// check [`ExecResult::exit_code`].
    pub async fn exec(&self, service: &str, argv: &[String]) -> Result<ExecResult> {
        self.ensure_live()?;
        self.control_plane.exec(self.name(), service, argv).await
    }
}

impl std::fmt::Debug for EnclaveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnclaveContext")
            .field("handle", &self.handle)
            .field("control_plane", &self.control_plane.name())
            .finish()
    }
}
