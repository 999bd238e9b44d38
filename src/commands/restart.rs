// ABOUTME: Restart command implementation.
// ABOUTME: Restarts a running or failed deployment's container in place.

use super::runtime_connection::{forward_events, open_manager};
use skiff::config::Config;
use skiff::error::Result;
use skiff::output::Output;
use skiff::types::{DeploymentId, OwnerId};

pub async fn restart(
    config: Config,
    owner: OwnerId,
    id: DeploymentId,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Restarting {id}"));

    let (manager, events) = open_manager(&config, &output).await?;
    let printer = forward_events(events, Output::new(output.mode()));

    let result = match manager.get(&id, &owner).await {
        Ok(deployment) => manager.restart(deployment).await,
        Err(e) => Err(e),
    };
    drop(manager);
    let _ = printer.await;

    let deployment = result?;
    output.success(&format!(
        "Restarted {} at {}",
        deployment.id,
        deployment.url.as_deref().unwrap_or("-")
    ));
    Ok(())
}
