//! In-process [`ControlPlane`] that keeps every enclave in memory.
//!
//! Packages are resolved from a catalogue registered up front; running one
//! starts its services inside the target enclave only. Commands run in a
//! service are answered by a handler registered for that service. Faults can be
//! injected for create and teardown, and every call is counted so tests can
//! assert on exactly-once semantics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{EnclaveOptions, RunConfig};
use crate::control_plane::ControlPlane;
use crate::error::{ControlPlaneError, Result};
use crate::types::{EnclaveInfo, ExecResult, RunResult, ServiceInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryEnclaveStatus {
    Running,
    Stopped,
}

/// Snapshot of one enclave held by [`MemoryControlPlane`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEnclave {
    pub uuid: String,
    pub options: EnclaveOptions,
    pub status: MemoryEnclaveStatus,
    pub services: BTreeMap<String, ServiceInfo>,
    /// Package locators and script bodies, in the order they ran.
    pub runs: Vec<String>,
    /// `(service, argv)` of every command executed, in order.
    pub execs: Vec<(String, Vec<String>)>,
}

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub stop: usize,
    pub destroy: usize,
    pub run: usize,
    pub service: usize,
    pub exec: usize,
}

impl CallCounts {
    /// Stop and destroy calls together.
    pub fn teardowns(&self) -> usize {
        self.stop + self.destroy
    }
}

#[derive(Default)]
struct State {
    enclaves: HashMap<String, MemoryEnclave>,
    calls: CallCounts,
    fail_create: Option<String>,
    fail_teardown: Option<String>,
}

type ExecHandler = Arc<dyn Fn(&[String]) -> ExecResult + Send + Sync>;

#[derive(Default)]
pub struct MemoryControlPlane {
    packages: HashMap<String, Vec<ServiceInfo>>,
    exec_handlers: HashMap<String, ExecHandler>,
    state: Mutex<State>,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package that starts `services` when run.
    pub fn with_package(mut self, package: impl Into<String>, services: Vec<ServiceInfo>) -> Self {
        self.packages.insert(package.into(), services);
        self
    }

    /// Answer commands executed in `service` with `handler`. Services without
    /// a handler report exit code 127.
    pub fn with_exec<F>(mut self, service: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[String]) -> ExecResult + Send + Sync + 'static,
    {
        self.exec_handlers.insert(service.into(), Arc::new(handler));
        self
    }

    /// Make every following `create_enclave` fail with `reason`.
    pub async fn fail_create(&self, reason: impl Into<String>) {
        self.state.lock().await.fail_create = Some(reason.into());
    }

    /// Make every following stop/destroy fail with `reason`.
    pub async fn fail_teardown(&self, reason: impl Into<String>) {
        self.state.lock().await.fail_teardown = Some(reason.into());
    }

    /// Let teardown calls succeed again.
    pub async fn heal_teardown(&self) {
        self.state.lock().await.fail_teardown = None;
    }

    pub async fn calls(&self) -> CallCounts {
        self.state.lock().await.calls
    }

    pub async fn enclave(&self, name: &str) -> Option<MemoryEnclave> {
        self.state.lock().await.enclaves.get(name).cloned()
    }

    pub async fn enclave_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().await.enclaves.keys().cloned().collect();
        names.sort();
        names
    }
}

fn running<'a>(state: &'a mut State, name: &str) -> Result<&'a mut MemoryEnclave> {
    let enclave = state
        .enclaves
        .get_mut(name)
        .ok_or_else(|| ControlPlaneError::NotFound(format!("enclave {name}")))?;
    if enclave.status != MemoryEnclaveStatus::Running {
        return Err(ControlPlaneError::InvalidRequest(format!(
            "enclave {name} is stopped"
        )));
    }
    Ok(enclave)
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_enclave(&self, name: &str, options: &EnclaveOptions) -> Result<EnclaveInfo> {
        let mut state = self.state.lock().await;
        state.calls.create += 1;
        if let Some(reason) = &state.fail_create {
            return Err(ControlPlaneError::Unavailable(reason.clone()));
        }
        if state.enclaves.contains_key(name) {
            return Err(ControlPlaneError::AlreadyExists(format!("enclave {name}")));
        }

        let uuid = Uuid::new_v4().simple().to_string();
        state.enclaves.insert(
            name.to_string(),
            MemoryEnclave {
                uuid: uuid.clone(),
                options: options.clone(),
                status: MemoryEnclaveStatus::Running,
                services: BTreeMap::new(),
                runs: Vec::new(),
                execs: Vec::new(),
            },
        );
        Ok(EnclaveInfo {
            name: name.to_string(),
            uuid,
        })
    }

    async fn stop_enclave(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.stop += 1;
        if let Some(reason) = &state.fail_teardown {
            return Err(ControlPlaneError::Remote(reason.clone()));
        }
        let enclave = state
            .enclaves
            .get_mut(name)
            .ok_or_else(|| ControlPlaneError::NotFound(format!("enclave {name}")))?;
        enclave.status = MemoryEnclaveStatus::Stopped;
        Ok(())
    }

    async fn destroy_enclave(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.destroy += 1;
        if let Some(reason) = &state.fail_teardown {
            return Err(ControlPlaneError::Remote(reason.clone()));
        }
        state
            .enclaves
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControlPlaneError::NotFound(format!("enclave {name}")))
    }

    async fn run_package(
        &self,
        enclave: &str,
        package: &str,
        config: &RunConfig,
    ) -> Result<RunResult> {
        let mut state = self.state.lock().await;
        state.calls.run += 1;
        let target = running(&mut state, enclave)?;

        let Some(services) = self.packages.get(package) else {
            return Ok(RunResult {
                interpretation_error: Some(format!("package {package} could not be found")),
                ..RunResult::default()
            });
        };

        target.runs.push(package.to_string());
        if !config.dry_run {
            for svc in services {
                target.services.insert(svc.name.clone(), svc.clone());
            }
        }
        Ok(RunResult {
            output: format!("{} service(s) started from {package}", services.len()),
            ..RunResult::default()
        })
    }

    async fn run_script(
        &self,
        enclave: &str,
        script: &str,
        _config: &RunConfig,
    ) -> Result<RunResult> {
        let mut state = self.state.lock().await;
        state.calls.run += 1;
        let target = running(&mut state, enclave)?;
        target.runs.push(script.to_string());
        Ok(RunResult::default())
    }

    async fn service(&self, enclave: &str, service: &str) -> Result<ServiceInfo> {
        let mut state = self.state.lock().await;
        state.calls.service += 1;
        let target = running(&mut state, enclave)?;
        target
            .services
            .get(service)
            .cloned()
            .ok_or_else(|| ControlPlaneError::NotFound(format!("service {service} in {enclave}")))
    }

    async fn list_services(&self, enclave: &str) -> Result<Vec<ServiceInfo>> {
        let mut state = self.state.lock().await;
        state.calls.service += 1;
        let target = running(&mut state, enclave)?;
        Ok(target.services.values().cloned().collect())
    }

    async fn exec(&self, enclave: &str, service: &str, argv: &[String]) -> Result<ExecResult> {
        let mut state = self.state.lock().await;
        state.calls.exec += 1;
        let target = running(&mut state, enclave)?;
        if !target.services.contains_key(service) {
            return Err(ControlPlaneError::NotFound(format!(
                "service {service} in {enclave}"
            )));
        }
        if argv.is_empty() {
            return Err(ControlPlaneError::InvalidRequest(
                "exec needs a command".into(),
            ));
        }
        target.execs.push((service.to_string(), argv.to_vec()));

        Ok(match self.exec_handlers.get(service) {
            Some(handler) => (**handler)(argv),
            None => ExecResult {
                exit_code: 127,
                output: format!("{}: command not found", argv.join(" ")),
            },
        })
    }
}
