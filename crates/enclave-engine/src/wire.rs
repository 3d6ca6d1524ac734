use enclave::{EnclaveMode, RunConfig};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enclaves
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateEnclaveRequest<'a> {
    pub enclave_name: &'a str,
    pub mode: EnclaveMode,
    pub subnetworking: bool,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "message")]
    pub error: String,
}

// ---------------------------------------------------------------------------
// Starlark
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RunPackageRequest<'a> {
    pub package_id: &'a str,
    #[serde(flatten)]
    pub config: &'a RunConfig,
}

#[derive(Debug, Serialize)]
pub struct RunScriptRequest<'a> {
    pub script: &'a str,
    #[serde(flatten)]
    pub config: &'a RunConfig,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ExecRequest<'a> {
    pub command: &'a [String],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_package_request_flattens_config() {
        let config = RunConfig::default();
        let body = serde_json::to_value(RunPackageRequest {
            package_id: "github.com/example/quickstart",
            config: &config,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "package_id": "github.com/example/quickstart",
                "params": {},
                "dry_run": false,
                "parallelism": 4,
            })
        );
    }

    #[test]
    fn create_request_uses_lowercase_mode() {
        let body = serde_json::to_value(CreateEnclaveRequest {
            enclave_name: "demo-1",
            mode: EnclaveMode::Production,
            subnetworking: true,
        })
        .unwrap();

        assert_eq!(body["mode"], "production");
        assert_eq!(body["subnetworking"], true);
    }

    #[test]
    fn error_body_accepts_message_alias() {
        let body: ErrorBody = serde_json::from_str(r#"{"message": "no such enclave"}"#).unwrap();
        assert_eq!(body.error, "no such enclave");
    }
}
