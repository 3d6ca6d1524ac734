use std::path::Path;
use std::time::Duration;

use enclave::{EnclaveOptions, ManagerConfig, RunConfig, Teardown};
use serde::{Deserialize, Serialize};

use crate::error::{QuickstartError, QuickstartResult};

pub(crate) const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:9779";
pub(crate) const DEFAULT_PREFIX: &str = "quick-start-rust-example";
pub(crate) const DEFAULT_PACKAGE: &str = "github.com/kurtosis-tech/awesome-kurtosis/quickstart";
/// Default wall-clock budget for one scenario (3 minutes).
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 180;
pub(crate) const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickstartConfig {
    pub engine: EngineConfig,
    pub enclave: EnclaveConfig,
    pub package: PackageConfig,
    pub api: ApiConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENGINE_URL.into(),
            api_key: None,
            timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclaveConfig {
    /// Enclave names are `{prefix}-{unix seconds}`.
    pub prefix: String,
    #[serde(flatten)]
    pub options: EnclaveOptions,
    pub teardown: Teardown,
    /// Scenario timeout; 0 disables it.
    pub timeout_secs: u64,
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            options: EnclaveOptions::default(),
            teardown: Teardown::Destroy,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub locator: String,
    #[serde(flatten)]
    pub run: RunConfig,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            locator: DEFAULT_PACKAGE.into(),
            run: RunConfig::default(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub service: String,
    pub port_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            service: "api".into(),
            port_id: "http".into(),
        }
    }
}

impl QuickstartConfig {
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            workflow_timeout: (self.enclave.timeout_secs > 0)
                .then(|| Duration::from_secs(self.enclave.timeout_secs)),
            teardown: self.enclave.teardown,
        }
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }

    fn validate(&self) -> QuickstartResult<()> {
        if self.engine.url.is_empty() {
            return Err(QuickstartError::Config("engine.url must not be empty".into()));
        }
        if self.engine.timeout_secs == 0 {
            return Err(QuickstartError::Config(
                "engine.timeout_secs must be positive".into(),
            ));
        }
        if self.enclave.prefix.is_empty() {
            return Err(QuickstartError::Config(
                "enclave.prefix must not be empty".into(),
            ));
        }
        if self.package.locator.is_empty() {
            return Err(QuickstartError::Config(
                "package.locator must not be empty".into(),
            ));
        }
        if self.package.run.parallelism == 0 {
            return Err(QuickstartError::Config(
                "package.parallelism must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a quickstart config from a YAML file.
pub async fn load(path: &Path) -> QuickstartResult<QuickstartConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| QuickstartError::Config(format!("read {}: {e}", path.display())))?;
    let config: QuickstartConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| QuickstartError::Config(format!("parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave::EnclaveMode;

    async fn load_str(yaml: &str) -> QuickstartResult<QuickstartConfig> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickstart.yaml");
        tokio::fs::write(&path, yaml).await.unwrap();
        load(&path).await
    }

    #[tokio::test]
    async fn load_full_config() {
        let yaml = r#"
engine:
  url: https://engine.example.com
  api_key: secret
  timeout_secs: 60
enclave:
  prefix: cassandra-partition
  mode: production
  subnetworking: true
  teardown: stop
  timeout_secs: 600
package:
  locator: github.com/example/cassandra-package
  params:
    num_nodes: 3
  parallelism: 8
api:
  service: web
  port_id: https
"#;
        let config = load_str(yaml).await.unwrap();

        assert_eq!(config.engine.url, "https://engine.example.com");
        assert_eq!(config.engine.api_key.as_deref(), Some("secret"));
        assert_eq!(config.engine_timeout(), Duration::from_secs(60));
        assert_eq!(config.enclave.prefix, "cassandra-partition");
        assert_eq!(config.enclave.options.mode, EnclaveMode::Production);
        assert!(config.enclave.options.subnetworking);
        assert_eq!(config.package.locator, "github.com/example/cassandra-package");
        assert_eq!(config.package.run.params["num_nodes"], 3);
        assert_eq!(config.package.run.parallelism, 8);
        assert!(!config.package.run.dry_run);
        assert_eq!(config.api.service, "web");
        assert_eq!(config.api.port_id, "https");

        let manager = config.manager_config();
        assert_eq!(manager.teardown, Teardown::Stop);
        assert_eq!(manager.workflow_timeout, Some(Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let config = load_str("{}").await.unwrap();
        assert_eq!(config, QuickstartConfig::default());
        assert_eq!(config.engine.url, DEFAULT_ENGINE_URL);
        assert_eq!(config.package.locator, DEFAULT_PACKAGE);
        assert_eq!(
            config.manager_config().workflow_timeout,
            Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        );
        assert_eq!(config.manager_config().teardown, Teardown::Destroy);
    }

    #[tokio::test]
    async fn zero_timeout_disables_it() {
        let config = load_str("enclave:\n  timeout_secs: 0\n").await.unwrap();
        assert_eq!(config.manager_config().workflow_timeout, None);
    }

    #[tokio::test]
    async fn rejects_invalid_values() {
        let err = load_str("package:\n  parallelism: 0\n").await.unwrap_err();
        assert!(err.to_string().contains("parallelism"), "got: {err}");

        let err = load_str("enclave:\n  prefix: \"\"\n").await.unwrap_err();
        assert!(err.to_string().contains("prefix"), "got: {err}");
    }

    #[tokio::test]
    async fn rejects_unknown_teardown() {
        let err = load_str("enclave:\n  teardown: pause\n").await.unwrap_err();
        assert!(matches!(err, QuickstartError::Config(_)));
    }

    #[tokio::test]
    async fn missing_file_is_config_error() {
        let err = load(Path::new("/nonexistent/quickstart.yaml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read"), "got: {err}");
    }
}
