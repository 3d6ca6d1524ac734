use std::time::Duration;

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_PARALLELISM: u32 = 4;

/// Isolation mode requested from the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnclaveMode {
    #[default]
    Test,
    Production,
}

impl EnclaveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclaveOptions {
    pub mode: EnclaveMode,
    /// Allow services to be moved between subnetworks (network partitioning).
    pub subnetworking: bool,
}

/// How far an enclave is torn down when its scope ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Teardown {
    /// Stop the enclave's services but keep it inspectable on the remote side.
    Stop,
    #[default]
    Destroy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Upper bound on the workflow run inside [`with_enclave`](crate::EnclaveManager::with_enclave).
    pub workflow_timeout: Option<Duration>,
    pub teardown: Teardown,
}

/// Parameters for a package or script run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub params: serde_json::Value,
    pub dry_run: bool,
    pub parallelism: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            params: serde_json::Value::Object(serde_json::Map::new()),
            dry_run: false,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}
