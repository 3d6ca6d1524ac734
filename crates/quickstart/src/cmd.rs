use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use enclave::{ControlPlane, EnclaveManager, timestamped_name, validate_name};
use enclave_engine::EngineClient;
use tracing::{error, info};

use crate::config::{self, QuickstartConfig};
use crate::error::{QuickstartError, QuickstartResult};
use crate::scenario;

/// Where the config comes from and which engine to talk to.
#[derive(Args)]
pub struct EngineArgs {
    /// YAML config file; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Engine base URL (overrides the config file)
    #[arg(long, env = "ENCLAVE_ENGINE_URL")]
    engine_url: Option<String>,
    /// Bearer token for the engine API
    #[arg(long, env = "ENCLAVE_ENGINE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl EngineArgs {
    /// Load the config file (or defaults) and apply command-line overrides.
    async fn load(self) -> QuickstartResult<QuickstartConfig> {
        let mut config = match &self.config {
            Some(path) => config::load(path).await?,
            None => QuickstartConfig::default(),
        };
        if let Some(url) = self.engine_url {
            config.engine.url = url;
        }
        if self.api_key.is_some() {
            config.engine.api_key = self.api_key;
        }
        Ok(config)
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Enclave name (defaults to `{prefix}-{unix seconds}`)
    #[arg(long)]
    name: Option<String>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args)]
pub struct TeardownArgs {
    /// Name of the enclave to tear down
    name: String,
    #[command(flatten)]
    engine: EngineArgs,
}

fn connect(config: &QuickstartConfig) -> QuickstartResult<EngineClient> {
    let client = EngineClient::connect_with_timeout(
        &config.engine.url,
        config.engine.api_key.clone(),
        config.engine_timeout(),
    )?;
    Ok(client)
}

pub async fn run_quickstart(args: RunArgs) -> QuickstartResult<()> {
    let config = args.engine.load().await?;

    let client = connect(&config)?;
    let manager = EnclaveManager::new(Arc::new(client), config.manager_config());
    let name = args
        .name
        .unwrap_or_else(|| timestamped_name(&config.enclave.prefix));

    let result = scenario::run_quickstart(&manager, &config, &name).await;

    let leaked = manager.leaked().await;
    for leak in &leaked {
        error!(
            enclave = %leak.name,
            teardown = ?leak.teardown,
            reason = %leak.reason,
            "enclave left behind, run `quickstart destroy {}`",
            leak.name
        );
    }

    let report = result?;
    if let Some(leak) = leaked.into_iter().next() {
        return Err(QuickstartError::Teardown(leak.name, leak.reason));
    }
    println!(
        "quickstart passed in enclave {} ({} actors at {})",
        report.enclave, report.actors_listed, report.api_url
    );
    Ok(())
}

pub async fn run_stop(args: TeardownArgs) -> QuickstartResult<()> {
    validate_name(&args.name)?;
    let config = args.engine.load().await?;
    connect(&config)?.stop_enclave(&args.name).await?;
    info!(enclave = %args.name, "enclave stopped");
    Ok(())
}

pub async fn run_destroy(args: TeardownArgs) -> QuickstartResult<()> {
    validate_name(&args.name)?;
    let config = args.engine.load().await?;
    let client = connect(&config)?;
    match client.destroy_enclave(&args.name).await {
        Ok(()) => info!(enclave = %args.name, "enclave destroyed"),
        Err(e) if e.is_not_found() => info!(enclave = %args.name, "enclave already gone"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn engine_at(server: &MockServer) -> EngineArgs {
        EngineArgs {
            config: None,
            engine_url: Some(server.base_url()),
            api_key: None,
        }
    }

    fn teardown_args(server: &MockServer, name: &str) -> TeardownArgs {
        TeardownArgs {
            name: name.into(),
            engine: engine_at(server),
        }
    }

    // ---------------------------------------------------------------------------
    // run
    // ---------------------------------------------------------------------------

    /// Mock engine and actor API on one server; the enclave cannot be destroyed.
    async fn leaky_engine(server: &MockServer, name: &str) {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/enclaves");
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(json!({ "name": name, "uuid": "7d1e" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("/enclaves/{name}/starlark/packages"));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "output": "started" }));
            })
            .await;
        let port = server.port();
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/enclaves/{name}/services/api"));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "name": "api",
                        "public_ip": "127.0.0.1",
                        "public_ports": { "http": { "number": port } },
                    }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/actor");
                then.status(201);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/actor");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!([
                        { "first_name": "Penelope", "last_name": "Guiness" },
                        { "first_name": "Kevin", "last_name": "Bacon" },
                        { "first_name": "Steve", "last_name": "Buscemi" },
                        { "first_name": "ThisFirstNameIsntInDB", "last_name": "ThisLastNameIsntInDB" },
                    ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("/enclaves/{name}"));
                then.status(500).body("docker: device or resource busy");
            })
            .await;
    }

    #[tokio::test]
    async fn run_with_failed_teardown_is_an_error() {
        let server = MockServer::start_async().await;
        leaky_engine(&server, "leaky-run").await;

        let err = run_quickstart(RunArgs {
            name: Some("leaky-run".into()),
            engine: engine_at(&server),
        })
        .await
        .unwrap_err();

        match err {
            QuickstartError::Teardown(name, reason) => {
                assert_eq!(name, "leaky-run");
                assert!(reason.contains("resource busy"), "got: {reason}");
            }
            other => panic!("expected Teardown, got {other:?}"),
        }
    }

    // ---------------------------------------------------------------------------
    // stop / destroy
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn destroy_of_missing_enclave_succeeds() {
        let server = MockServer::start_async().await;
        let destroy = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/enclaves/gone-already");
                then.status(404)
                    .header("content-type", "application/json")
                    .json_body(json!({ "error": "enclave gone-already not found" }));
            })
            .await;

        run_destroy(teardown_args(&server, "gone-already"))
            .await
            .unwrap();
        destroy.assert_async().await;
    }

    #[tokio::test]
    async fn destroy_engine_failure_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/enclaves/stuck");
                then.status(500).body("docker hung");
            })
            .await;

        let err = run_destroy(teardown_args(&server, "stuck"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuickstartError::ControlPlane(_)), "got: {err}");
    }

    #[tokio::test]
    async fn teardown_rejects_invalid_names_before_calling_engine() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_contains("/enclaves");
                then.status(204);
            })
            .await;

        for name in ["scratch/../prod", "api?x=1", ""] {
            let err = run_destroy(teardown_args(&server, name)).await.unwrap_err();
            assert!(matches!(err, QuickstartError::Acquisition(_)), "{name}: {err}");
            let err = run_stop(teardown_args(&server, name)).await.unwrap_err();
            assert!(matches!(err, QuickstartError::Acquisition(_)), "{name}: {err}");
        }
        any.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn stop_reads_engine_settings_from_config_file() {
        let server = MockServer::start_async().await;
        let stop = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/enclaves/demo-1/stop")
                    .header("authorization", "Bearer from-file");
                then.status(204);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickstart.yaml");
        let yaml = format!(
            "engine:\n  url: {}\n  api_key: from-file\n",
            server.base_url()
        );
        tokio::fs::write(&path, yaml).await.unwrap();

        run_stop(TeardownArgs {
            name: "demo-1".into(),
            engine: EngineArgs {
                config: Some(path),
                engine_url: None,
                api_key: None,
            },
        })
        .await
        .unwrap();
        stop.assert_async().await;
    }
}
