use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ControlPlaneError, Result};

/// What the control plane returns for a freshly created enclave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclaveInfo {
    pub name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub interpretation_error: Option<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub execution_error: Option<String>,
    #[serde(default)]
    pub output: String,
}

impl RunResult {
    /// Fail unless interpretation, validation and execution all came back clean.
    pub fn ensure_success(&self) -> Result<()> {
        if let Some(message) = &self.interpretation_error {
            return Err(ControlPlaneError::RunFailed {
                stage: "interpretation",
                message: message.clone(),
            });
        }
        if !self.validation_errors.is_empty() {
            return Err(ControlPlaneError::RunFailed {
                stage: "validation",
                message: self.validation_errors.join("; "),
            });
        }
        if let Some(message) = &self.execution_error {
            return Err(ControlPlaneError::RunFailed {
                stage: "execution",
                message: message.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub number: u16,
    #[serde(default = "default_transport")]
    pub transport: String,
}

fn default_transport() -> String {
    "tcp".into()
}

impl PortSpec {
    pub fn tcp(number: u16) -> Self {
        Self {
            number,
            transport: default_transport(),
        }
    }
}

/// Network context of a service running inside an enclave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub public_ports: BTreeMap<String, PortSpec>,
}

impl ServiceInfo {
    /// `http://{public_ip}:{port}` for the given port id.
    pub fn public_url(&self, port_id: &str) -> Result<String> {
        let port = self
            .public_ports
            .get(port_id)
            .ok_or_else(|| ControlPlaneError::MissingPort {
                service: self.name.clone(),
                port_id: port_id.to_string(),
            })?;
        let ip = self
            .public_ip
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| {
                ControlPlaneError::Remote(format!("service {} has no public address", self.name))
            })?;
        Ok(format!("http://{ip}:{}", port.number))
    }
}

/// Outcome of a command run inside a service container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    pub exit_code: i32,
    #[serde(default)]
    pub output: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of a teardown attempt.
///
/// `ReleaseFailed` means the remote enclave is in an unknown state and an
/// operator has to clean it up by hand.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    ReleaseFailed(String),
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}
