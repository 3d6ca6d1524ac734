use enclave::{EnclaveContext, EnclaveManager};
use tracing::info;

use crate::actors::{Actor, ActorClient};
use crate::config::QuickstartConfig;
use crate::error::{QuickstartError, QuickstartResult};

/// Actors inserted by the scenario; the last one is not part of the seed data.
pub fn scenario_actors() -> Vec<Actor> {
    vec![
        Actor::new("Kevin", "Bacon"),
        Actor::new("Steve", "Buscemi"),
        Actor::new("ThisFirstNameIsntInDB", "ThisLastNameIsntInDB"),
    ]
}

/// What a successful quickstart run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub enclave: String,
    pub api_url: String,
    pub actors_posted: usize,
    pub actors_listed: usize,
}

/// Run the quickstart package in a fresh enclave and exercise its actor API.
///
/// The enclave is released whatever the outcome.
pub async fn run_quickstart(
    manager: &EnclaveManager,
    config: &QuickstartConfig,
    name: &str,
) -> QuickstartResult<Report> {
    info!(enclave = %name, package = %config.package.locator, "starting quickstart");
    let report = manager
        .with_enclave(name, &config.enclave.options, |ctx| async move {
            exercise(&ctx, config).await
        })
        .await?;
    info!(
        enclave = %report.enclave,
        actors = report.actors_listed,
        "quickstart verified"
    );
    Ok(report)
}

async fn exercise(ctx: &EnclaveContext, config: &QuickstartConfig) -> QuickstartResult<Report> {
    let result = ctx
        .run_package(&config.package.locator, &config.package.run)
        .await?;
    result.ensure_success()?;
    info!(enclave = %ctx.name(), output = %result.output, "package started");

    let service = ctx.service(&config.api.service).await?;
    let api_url = service.public_url(&config.api.port_id)?;
    info!(enclave = %ctx.name(), api_url = %api_url, "api service resolved");

    let client = ActorClient::new(&api_url)?;
    let posted = scenario_actors();
    client.post_actors(&posted).await?;

    let listed = client.list_actors().await?;
    verify(&posted, &listed)?;

    Ok(Report {
        enclave: ctx.name().to_string(),
        api_url,
        actors_posted: posted.len(),
        actors_listed: listed.len(),
    })
}

/// Every posted actor must be listed, and the listing must hold more than
/// just the posted ones.
fn verify(posted: &[Actor], listed: &[Actor]) -> QuickstartResult<()> {
    if let Some(missing) = posted.iter().find(|a| !listed.contains(a)) {
        return Err(QuickstartError::Verification(format!(
            "actor {} {} missing from listing",
            missing.first_name, missing.last_name
        )));
    }
    if listed.len() <= posted.len() {
        return Err(QuickstartError::Verification(format!(
            "expected more than {} actors, got {}",
            posted.len(),
            listed.len()
        )));
    }
    Ok(())
}
