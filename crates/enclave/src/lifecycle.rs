use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{EnclaveOptions, ManagerConfig, Teardown};
use crate::context::{EnclaveContext, EnclaveHandle, EnclaveState};
use crate::control_plane::ControlPlane;
use crate::error::{AcquisitionError, ControlPlaneError, ScopeError};
use crate::types::ReleaseOutcome;

/// Longest enclave name the control plane accepts.
const MAX_NAME_LEN: usize = 60;

/// `"{prefix}-{unix seconds}"`, the naming scheme for per-run enclaves.
pub fn timestamped_name(prefix: &str) -> String {
    format!("{prefix}-{}", chrono::Utc::now().timestamp())
}

/// An enclave whose teardown failed and needs manual cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakedEnclave {
    pub name: String,
    pub teardown: Teardown,
    pub reason: String,
}

#[derive(Default)]
struct Ledger {
    names: HashSet<String>,
    leaked: Vec<LeakedEnclave>,
}

/// Acquires enclaves from a [`ControlPlane`] and guarantees a teardown
/// attempt for every enclave it hands out.
///
/// Share via `Arc<EnclaveManager>`; independent scopes may run concurrently.
pub struct EnclaveManager {
    control_plane: Arc<dyn ControlPlane>,
    config: ManagerConfig,
    ledger: Mutex<Ledger>,
}

impl EnclaveManager {
    pub fn new(control_plane: Arc<dyn ControlPlane>, config: ManagerConfig) -> Self {
        Self {
            control_plane,
            config,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Create the enclave `name` and return a context for it.
    ///
    /// The caller owns the teardown: pair every successful call with
    /// [`release`](Self::release), or use [`with_enclave`](Self::with_enclave).
    pub async fn acquire(
        &self,
        name: &str,
        options: &EnclaveOptions,
    ) -> Result<EnclaveContext, AcquisitionError> {
        validate_name(name)?;

        // Reserve the name before the remote call so concurrent scopes
        // cannot race for it.
        if !self.ledger.lock().await.names.insert(name.to_string()) {
            return Err(AcquisitionError::NameInUse(name.to_string()));
        }

        info!(
            enclave = %name,
            backend = self.control_plane.name(),
            mode = options.mode.as_str(),
            subnetworking = options.subnetworking,
            "creating enclave"
        );
        let created = self
            .control_plane
            .create_enclave(name, options)
            .await
            .map_err(|source| {
                error!(enclave = %name, error = %source, "enclave creation failed");
                AcquisitionError::Create {
                    name: name.to_string(),
                    source,
                }
            })?;

        let handle = EnclaveHandle::new(
            name.to_string(),
            created.uuid,
            chrono::Utc::now().timestamp(),
        );
        info!(enclave = %name, uuid = %handle.uuid(), "enclave created");
        Ok(EnclaveContext::new(handle, Arc::clone(&self.control_plane)))
    }

    /// Tear the enclave down at the configured [`Teardown`] level.
    pub async fn release(&self, handle: &EnclaveHandle) -> ReleaseOutcome {
        match self.config.teardown {
            Teardown::Stop => self.stop(handle).await,
            Teardown::Destroy => self.destroy(handle).await,
        }
    }

    /// Stop the enclave. It stays on the remote side until destroyed.
    pub async fn stop(&self, handle: &EnclaveHandle) -> ReleaseOutcome {
        let result = self.control_plane.stop_enclave(handle.name()).await;
        self.settle(handle, Teardown::Stop, result).await
    }

    /// Destroy the enclave and everything in it.
    pub async fn destroy(&self, handle: &EnclaveHandle) -> ReleaseOutcome {
        let result = self.control_plane.destroy_enclave(handle.name()).await;
        self.settle(handle, Teardown::Destroy, result).await
    }

    async fn settle(
        &self,
        handle: &EnclaveHandle,
        teardown: Teardown,
        result: Result<(), ControlPlaneError>,
    ) -> ReleaseOutcome {
        let name = handle.name();
        match result {
            Ok(()) => {
                let reached = match teardown {
                    Teardown::Stop => EnclaveState::Stopped,
                    Teardown::Destroy => EnclaveState::Destroyed,
                };
                handle.advance(reached);
                info!(enclave = %name, state = %handle.state(), "enclave released");
                ReleaseOutcome::Released
            }
            Err(e) if e.is_not_found() => {
                handle.advance(EnclaveState::Destroyed);
                info!(enclave = %name, "enclave already gone");
                ReleaseOutcome::Released
            }
            Err(e) => {
                let reason = e.to_string();
                error!(
                    enclave = %name,
                    error = %reason,
                    "an error occurred releasing enclave {name} that we created"
                );
                error!("ACTION REQUIRED: you'll need to clean up enclave {name} manually");
                self.ledger.lock().await.leaked.push(LeakedEnclave {
                    name: name.to_string(),
                    teardown,
                    reason: reason.clone(),
                });
                ReleaseOutcome::ReleaseFailed(reason)
            }
        }
    }

    /// Acquire `name`, run `workflow` with its context, and release the
    /// enclave exactly once on every exit path.
    ///
    /// A panic inside the workflow is resumed after the release. When the
    /// workflow fails and the release fails too, the workflow's error is
    /// returned and the release failure is logged and recorded in
    /// [`leaked`](Self::leaked).
    pub async fn with_enclave<T, E, F, Fut>(
        &self,
        name: &str,
        options: &EnclaveOptions,
        workflow: F,
    ) -> Result<T, ScopeError<E>>
    where
        F: FnOnce(EnclaveContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ctx = self.acquire(name, options).await?;
        let handle = ctx.handle().clone();
        let guard = LeakGuard::new(handle.clone());

        // Call the workflow inside the future so a panic while building it
        // is caught as well.
        let run = AssertUnwindSafe(async move { workflow(ctx).await }).catch_unwind();
        let finished = match self.config.workflow_timeout {
            Some(after) => tokio::time::timeout(after, run).await.map_err(|_| after),
            None => Ok(run.await),
        };

        let outcome = self.release(&handle).await;
        guard.disarm();

        let released = outcome.is_released();
        match finished {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(source))) => {
                if !released {
                    warn!(
                        enclave = %name,
                        "workflow failed and the enclave could not be released either; returning the workflow error"
                    );
                }
                Err(ScopeError::Workflow {
                    enclave: name.to_string(),
                    source,
                })
            }
            Ok(Err(panic)) => {
                warn!(enclave = %name, released, "workflow panicked; enclave teardown attempted");
                std::panic::resume_unwind(panic)
            }
            Err(after) => {
                warn!(enclave = %name, ?after, released, "workflow timed out");
                Err(ScopeError::TimedOut {
                    enclave: name.to_string(),
                    after,
                })
            }
        }
    }

    /// Enclaves whose teardown failed so far, oldest first.
    pub async fn leaked(&self) -> Vec<LeakedEnclave> {
        self.ledger.lock().await.leaked.clone()
    }
}

/// Check `name` against the naming rules every acquisition enforces:
/// non-empty, at most 60 characters, ASCII letters, digits and `-` only.
pub fn validate_name(name: &str) -> Result<(), AcquisitionError> {
    let invalid = |reason| AcquisitionError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("longer than 60 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("only ASCII letters, digits and '-' are allowed"));
    }
    Ok(())
}

/// Flags an enclave whose scope was dropped before release, which happens
/// when the surrounding task is cancelled. Nothing is sent to the remote
/// side from `Drop`; the enclave is left for manual cleanup.
struct LeakGuard {
    handle: Option<EnclaveHandle>,
}

impl LeakGuard {
    fn new(handle: EnclaveHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for LeakGuard {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle
            && handle.state() == EnclaveState::Acquired
        {
            error!(
                enclave = %handle.name(),
                "scope dropped before release; ACTION REQUIRED: clean up enclave {} manually",
                handle.name()
            );
        }
    }
}
