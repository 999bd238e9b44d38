// ABOUTME: Delete command implementation.
// ABOUTME: Tears a deployment down and reports anything left behind.

use super::runtime_connection::{forward_events, open_manager};
use skiff::config::Config;
use skiff::error::Result;
use skiff::output::Output;
use skiff::types::{DeploymentId, OwnerId};

pub async fn delete(
    config: Config,
    owner: OwnerId,
    id: DeploymentId,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Deleting {id}"));

    let (manager, events) = open_manager(&config, &output).await?;
    let printer = forward_events(events, Output::new(output.mode()));

    let result = manager.delete(&id, &owner).await;
    drop(manager);
    let _ = printer.await;

    let teardown = result?;
    for warning in teardown.diagnostics.warnings() {
        output.warning(&warning.message);
    }
    if teardown.container_removed {
        output.progress("  → Container removed");
    }
    if teardown.image_removed {
        output.progress("  → Image removed");
    }
    if teardown.workspace_removed {
        output.progress("  → Workspace removed");
    }

    output.success(&format!("Deleted {id}"));
    Ok(())
}
