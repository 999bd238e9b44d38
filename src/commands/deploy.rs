// ABOUTME: Deploy and redeploy command implementations.
// ABOUTME: Turn CLI settings into requests and run the pipeline with live progress.

use std::collections::BTreeMap;

use super::runtime_connection::{forward_events, open_manager};
use crate::cli::DeploySettings;
use skiff::config::Config;
use skiff::deploy::{DeployError, DeployRequest, DeployUpdate, Deployment};
use skiff::error::{Error, Result};
use skiff::output::Output;
use skiff::types::{DeploymentId, OwnerId, parse_env_pair};

/// Deploy a repository for `owner`.
pub async fn deploy(
    config: Config,
    owner: OwnerId,
    repo_url: String,
    settings: DeploySettings,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Deploying {repo_url}"));

    let mut request = DeployRequest::new(owner, repo_url);
    request.branch = settings.branch;
    request.build_command = settings.build_command.unwrap_or_default();
    request.start_command = settings.start_command.unwrap_or_default();
    request.env_vars = parse_env(&settings.env)?;

    let (manager, events) = open_manager(&config, &output).await?;
    let printer = forward_events(events, Output::new(output.mode()));

    let result = manager.launch(request).await;
    drop(manager);
    let _ = printer.await;

    finish(result, &output)
}

/// Apply `settings` to an existing deployment and rebuild it.
pub async fn redeploy(
    config: Config,
    owner: OwnerId,
    id: DeploymentId,
    settings: DeploySettings,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Redeploying {id}"));

    let update = DeployUpdate {
        branch: settings.branch,
        build_command: settings.build_command,
        start_command: settings.start_command,
        env_vars: if settings.env.is_empty() {
            None
        } else {
            Some(parse_env(&settings.env)?)
        },
    };

    let (manager, events) = open_manager(&config, &output).await?;
    let printer = forward_events(events, Output::new(output.mode()));

    let result = manager.redeploy(&id, &owner, update).await;
    drop(manager);
    let _ = printer.await;

    finish(result, &output)
}

fn finish(result: std::result::Result<Deployment, DeployError>, output: &Output) -> Result<()> {
    let deployment = result?;
    output.deployment(&deployment);
    match &deployment.url {
        Some(url) => output.success(&format!("Deployed {} at {url}", deployment.id)),
        None => output.success(&format!("Deployed {}", deployment.id)),
    }
    Ok(())
}

fn parse_env(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| parse_env_pair(pair).map_err(|e| Error::Deploy(e.into())))
        .collect()
}
