use std::time::Duration;

use async_trait::async_trait;
use enclave::{
    ControlPlane, ControlPlaneError, EnclaveInfo, EnclaveOptions, ExecResult, RunConfig,
    RunResult, ServiceInfo,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::http::HttpClient;
use crate::wire::{
    CreateEnclaveRequest, ErrorBody, ExecRequest, RunPackageRequest, RunScriptRequest,
};

/// [`ControlPlane`] backed by the engine's REST API.
#[derive(Clone)]
pub struct EngineClient {
    http: HttpClient,
}

impl EngineClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Connect to the engine at `base_url` with the default timeout.
    pub fn connect(base_url: &str, api_key: Option<String>) -> EngineResult<Self> {
        Self::connect_with_timeout(base_url, api_key, crate::http::DEFAULT_TIMEOUT)
    }

    pub fn connect_with_timeout(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> EngineResult<Self> {
        HttpClient::new(base_url, api_key, timeout).map(Self::new)
    }

    fn request(
        &self,
        op: &str,
        method: Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, ControlPlaneError> {
        self.http
            .request(method, segments)
            .map_err(|e| ControlPlaneError::InvalidRequest(format!("{op}: {e}")))
    }

    async fn send(&self, op: &str, req: reqwest::RequestBuilder) -> Result<Response, ControlPlaneError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ControlPlaneError::Unavailable(format!("{op}: {e}")))?;
        let status = resp.status();
        debug!(op, status = %status, "engine response");
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);
        Err(classify(op, status, message))
    }

    async fn decode<T: DeserializeOwned>(op: &str, resp: Response) -> Result<T, ControlPlaneError> {
        resp.json()
            .await
            .map_err(|e| ControlPlaneError::Remote(format!("{op} decode: {e}")))
    }
}

/// Map an unsuccessful engine response onto the control-plane taxonomy.
fn classify(op: &str, status: StatusCode, message: String) -> ControlPlaneError {
    let detail = format!("{op} {status}: {message}");
    match status {
        StatusCode::NOT_FOUND => ControlPlaneError::NotFound(detail),
        StatusCode::CONFLICT => ControlPlaneError::AlreadyExists(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ControlPlaneError::InvalidRequest(detail)
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            ControlPlaneError::Unavailable(detail)
        }
        _ => {
            warn!(op, status = %status, "unexpected engine response");
            ControlPlaneError::Remote(detail)
        }
    }
}

#[async_trait]
impl ControlPlane for EngineClient {
    fn name(&self) -> &str {
        "engine"
    }

    async fn create_enclave(
        &self,
        name: &str,
        options: &EnclaveOptions,
    ) -> enclave::Result<EnclaveInfo> {
        let op = "create enclave";
        let body = CreateEnclaveRequest {
            enclave_name: name,
            mode: options.mode,
            subnetworking: options.subnetworking,
        };
        let req = self.request(op, Method::POST, &["enclaves"])?.json(&body);
        let resp = self.send(op, req).await?;
        Self::decode(op, resp).await
    }

    async fn stop_enclave(&self, name: &str) -> enclave::Result<()> {
        let op = "stop enclave";
        let req = self.request(op, Method::POST, &["enclaves", name, "stop"])?;
        self.send(op, req).await?;
        Ok(())
    }

    async fn destroy_enclave(&self, name: &str) -> enclave::Result<()> {
        let op = "destroy enclave";
        let req = self.request(op, Method::DELETE, &["enclaves", name])?;
        self.send(op, req).await?;
        Ok(())
    }

    async fn run_package(
        &self,
        enclave: &str,
        package: &str,
        config: &RunConfig,
    ) -> enclave::Result<RunResult> {
        let op = "run package";
        let body = RunPackageRequest {
            package_id: package,
            config,
        };
        let req = self
            .request(op, Method::POST, &["enclaves", enclave, "starlark", "packages"])?
            .json(&body);
        let resp = self.send(op, req).await?;
        Self::decode(op, resp).await
    }

    async fn run_script(
        &self,
        enclave: &str,
        script: &str,
        config: &RunConfig,
    ) -> enclave::Result<RunResult> {
        let op = "run script";
        let body = RunScriptRequest { script, config };
        let req = self
            .request(op, Method::POST, &["enclaves", enclave, "starlark", "scripts"])?
            .json(&body);
        let resp = self.send(op, req).await?;
        Self::decode(op, resp).await
    }

    async fn service(&self, enclave: &str, service: &str) -> enclave::Result<ServiceInfo> {
        let op = "get service";
        let req = self.request(op, Method::GET, &["enclaves", enclave, "services", service])?;
        let resp = self.send(op, req).await?;
        Self::decode(op, resp).await
    }

    async fn list_services(&self, enclave: &str) -> enclave::Result<Vec<ServiceInfo>> {
        let op = "list services";
        let req = self.request(op, Method::GET, &["enclaves", enclave, "services"])?;
        let resp = self.send(op, req).await?;
        Self::decode(op, resp).await
    }

    async fn exec(
        &self,
        enclave: &str,
        service: &str,
        argv: &[String],
    ) -> enclave::Result<ExecResult> {
        let op = "exec";
        let req = self
            .request(
                op,
                Method::POST,
                &["enclaves", enclave, "services", service, "exec"],
            )?
            .json(&ExecRequest { command: argv });
        let resp = self.send(op, req).await?;
        Self::decode(op, resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_statuses() {
        let c = |s| classify("op", s, "msg".into());
        assert!(c(StatusCode::NOT_FOUND).is_not_found());
        assert!(matches!(
            c(StatusCode::CONFLICT),
            ControlPlaneError::AlreadyExists(_)
        ));
        assert!(matches!(
            c(StatusCode::BAD_REQUEST),
            ControlPlaneError::InvalidRequest(_)
        ));
        assert!(matches!(
            c(StatusCode::UNPROCESSABLE_ENTITY),
            ControlPlaneError::InvalidRequest(_)
        ));
        assert!(matches!(
            c(StatusCode::SERVICE_UNAVAILABLE),
            ControlPlaneError::Unavailable(_)
        ));
        assert!(matches!(
            c(StatusCode::INTERNAL_SERVER_ERROR),
            ControlPlaneError::Remote(_)
        ));
    }

    #[test]
    fn classify_keeps_operation_and_message() {
        let err = classify("destroy enclave", StatusCode::NOT_FOUND, "gone".into());
        assert_eq!(err.to_string(), "not found: destroy enclave 404 Not Found: gone");
    }
}
