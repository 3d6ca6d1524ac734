//! HTTP [`ControlPlane`](enclave::ControlPlane) talking to the enclave engine.
//!
//! | operation | request |
//! |-----------|---------|
//! | create    | `POST /enclaves` |
//! | stop      | `POST /enclaves/{name}/stop` |
//! | destroy   | `DELETE /enclaves/{name}` |
//! | package   | `POST /enclaves/{name}/starlark/packages` |
//! | script    | `POST /enclaves/{name}/starlark/scripts` |
//! | service   | `GET /enclaves/{name}/services/{service}` |
//! | services  | `GET /enclaves/{name}/services` |
//! | exec      | `POST /enclaves/{name}/services/{service}/exec` |
//!
//! Names are sent as single percent-encoded path segments.

mod client;
mod error;
mod http;
mod wire;

pub use client::EngineClient;
pub use error::{EngineError, EngineResult};
pub use http::{DEFAULT_TIMEOUT, HttpClient};
