//! Scoped acquisition of remote enclaves.
//!
//! An enclave is an isolated sandbox owned by an external control plane.
//! [`EnclaveManager`] creates one, hands out an [`EnclaveContext`] to work
//! with it, and always attempts a teardown once creation succeeded:
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use enclave::{EnclaveManager, EnclaveOptions, ManagerConfig, MemoryControlPlane, RunConfig};
//!
//! let manager = EnclaveManager::new(Arc::new(MemoryControlPlane::new()), ManagerConfig::default());
//! let output = manager
//!     .with_enclave("demo-1", &EnclaveOptions::default(), |ctx| async move {
//!         let run = ctx.run_script("def run(plan): pass", &RunConfig::default()).await?;
//!         run.ensure_success()?;
//!         Ok::<_, enclave::ControlPlaneError>(run.output)
//!     })
//!     .await?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod control_plane;
mod error;
mod lifecycle;
pub mod memory;
mod types;

pub use config::{EnclaveMode, EnclaveOptions, ManagerConfig, RunConfig, Teardown};
pub use context::{EnclaveContext, EnclaveHandle, EnclaveState};
pub use control_plane::ControlPlane;
pub use error::{AcquisitionError, ControlPlaneError, Result, ScopeError};
pub use lifecycle::{EnclaveManager, LeakedEnclave, timestamped_name, validate_name};
pub use memory::MemoryControlPlane;
pub use types::{EnclaveInfo, ExecResult, PortSpec, ReleaseOutcome, RunResult, ServiceInfo};
