use async_trait::async_trait;

use crate::config::{EnclaveOptions, RunConfig};
use crate::error::Result;
use crate::types::{EnclaveInfo, ExecResult, RunResult, ServiceInfo};

/// Capability set of the external service that owns enclaves.
///
/// Every method is a call across the process boundary. Implementations must
/// report a missing enclave as [`ControlPlaneError::NotFound`](crate::ControlPlaneError::NotFound)
/// so that repeated teardown can be recognised.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Human-readable name for this backend (e.g. "engine").
    fn name(&self) -> &str;

    /// Create an enclave with the given name.
    async fn create_enclave(&self, name: &str, options: &EnclaveOptions) -> Result<EnclaveInfo>;
    /// Stop every service in the enclave. The enclave itself stays around.
    async fn stop_enclave(&self, name: &str) -> Result<()>;
    /// Remove the enclave and everything in it.
    async fn destroy_enclave(&self, name: &str) -> Result<()>;

    // -- operations --
    async fn run_package(
        &self,
        enclave: &str,
        package: &str,
        config: &RunConfig,
    ) -> Result<RunResult>;
    async fn run_script(&self, enclave: &str, script: &str, config: &RunConfig)
    -> Result<RunResult>;
    async fn service(&self, enclave: &str, service: &str) -> Result<ServiceInfo>;
    /// Every service currently running in the enclave.
    async fn list_services(&self, enclave: &str) -> Result<Vec<ServiceInfo>>;
    /// Run `argv` inside the service's container and wait for it to exit.
    async fn exec(&self, enclave: &str, service: &str, argv: &[String]) -> Result<ExecResult>;
}
