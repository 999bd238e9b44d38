// ABOUTME: Status command implementation.
// ABOUTME: Reads deployment records straight from the store; no runtime needed.

use skiff::config::Config;
use skiff::deploy::DeployError;
use skiff::error::Result;
use skiff::output::Output;
use skiff::store::{DeploymentStore, JsonFileStore};
use skiff::types::{DeploymentId, OwnerId};

pub async fn status(
    config: Config,
    owner: OwnerId,
    id: Option<DeploymentId>,
    output: Output,
) -> Result<()> {
    let store = JsonFileStore::new(config.store_dir());

    match id {
        Some(id) => {
            let deployment = store
                .find_by_id(&id, &owner)
                .await
                .map_err(DeployError::from)?
                .ok_or(DeployError::NotFound(id))?;
            output.deployment(&deployment);
        }
        None => {
            let deployments = store.list(&owner).await.map_err(DeployError::from)?;
            output.deployments(&deployments);
        }
    }
    Ok(())
}
