// ABOUTME: Container runtime controller for deployments.
// ABOUTME: Create+start, restart, tolerant stop-and-remove, and lookup by deployment name.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::deployment::Deployment;
use super::error::RuntimeError;
use super::naming;
use crate::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError,
    ImageOps, RestartPolicyConfig,
};
use crate::types::{ContainerId, DeploymentId, ImageRef, OwnerId};

/// Stage bounds and policies the controller applies.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub restart_policy: RestartPolicyConfig,
    /// Grace period given to the container process when stopping or restarting.
    pub stop_grace: Duration,
    pub start_timeout: Duration,
    pub restart_timeout: Duration,
    pub stop_timeout: Duration,
}

/// What a stop found along the way.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub container_removed: bool,
    pub image_removed: bool,
}

pub struct ContainerController<R> {
    runtime: Arc<R>,
    settings: ControllerSettings,
}

async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T, RuntimeError>>,
) -> Result<T, RuntimeError> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| RuntimeError::Timeout { operation, after })?
}

impl<R: ContainerOps + ImageOps> ContainerController<R> {
    pub fn new(runtime: Arc<R>, settings: ControllerSettings) -> Self {
        Self { runtime, settings }
    }

    fn container_config(&self, deployment: &Deployment, image: &ImageRef) -> ContainerConfig {
        ContainerConfig {
            name: naming::container_name(&deployment.owner, &deployment.id),
            image: image.clone(),
            env: deployment
                .env_vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>(),
            labels: naming::labels(&deployment.id, &deployment.owner),
            command: None,
            restart_policy: self.settings.restart_policy,
        }
    }

    /// Create and start the deployment's container from `image`.
    ///
    /// A container that was created but failed to start is left for
    /// Cleanup, which finds it by name.
    pub async fn create_and_start(
        &self,
        deployment: &Deployment,
        image: &ImageRef,
    ) -> Result<ContainerId, RuntimeError> {
        let config = self.container_config(deployment, image);
        bounded("start", self.settings.start_timeout, async {
            let id = self
                .runtime
                .create_container(&config)
                .await
                .map_err(RuntimeError::Create)?;
            tracing::debug!(
                deployment = %deployment.id,
                container = %id.short(12),
                "created container"
            );

            self.runtime
                .start_container(&id)
                .await
                .map_err(RuntimeError::Start)?;
            Ok(id)
        })
        .await
    }

    /// Restart an existing container.
    pub async fn restart(&self, container: Option<&ContainerId>) -> Result<(), RuntimeError> {
        let Some(id) = container.filter(|id| !id.is_empty()) else {
            return Err(RuntimeError::ContainerNotFound(
                "deployment has no container".to_string(),
            ));
        };

        bounded("restart", self.settings.restart_timeout, async {
            match self
                .runtime
                .restart_container(id, self.settings.stop_grace)
                .await
            {
                Ok(()) => Ok(()),
                Err(ContainerError::NotFound(_)) => {
                    Err(RuntimeError::ContainerNotFound(id.to_string()))
                }
                Err(e) => Err(RuntimeError::Restart(e)),
            }
        })
        .await
    }

    /// Stop and remove a container, then remove `image`.
    ///
    /// Resources that are already gone count as removed; any other runtime
    /// failure is returned.
    pub async fn stop(
        &self,
        container: &ContainerId,
        image: Option<&str>,
    ) -> Result<StopOutcome, RuntimeError> {
        bounded("stop", self.settings.stop_timeout, async {
            let mut outcome = StopOutcome::default();

            match self
                .runtime
                .stop_container(container, self.settings.stop_grace)
                .await
            {
                Ok(()) | Err(ContainerError::NotRunning(_)) | Err(ContainerError::NotFound(_)) => {}
                Err(e) => return Err(RuntimeError::Stop(e)),
            }

            match self.runtime.remove_container(container, true).await {
                Ok(()) => outcome.container_removed = true,
                Err(ContainerError::NotFound(_)) => {
                    tracing::debug!(container = %container.short(12), "container already gone");
                }
                Err(e) => return Err(RuntimeError::Remove(e)),
            }

            if let Some(image) = image {
                match self.runtime.remove_image(image, true).await {
                    Ok(()) => outcome.image_removed = true,
                    Err(ImageError::NotFound(_)) => {
                        tracing::debug!(image, "image already gone");
                    }
                    Err(e) => return Err(RuntimeError::RemoveImage(e)),
                }
            }

            Ok(outcome)
        })
        .await
    }
}

/// Find the deployment's container by its derived name, whether or not its
/// id was ever persisted.
pub async fn locate<R: ContainerOps + ?Sized>(
    runtime: &R,
    id: &DeploymentId,
    owner: &OwnerId,
) -> Result<Option<ContainerSummary>, ContainerError> {
    let name = naming::container_name(owner, id);
    let found = runtime
        .list_containers(&ContainerFilters::by_name(&name))
        .await?;
    // The runtime matches name substrings
    Ok(found.into_iter().find(|c| c.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployRequest;
    use crate::runtime::{MockOp, MockRuntime};

    fn settings() -> ControllerSettings {
        ControllerSettings {
            restart_policy: RestartPolicyConfig::Always,
            stop_grace: Duration::from_secs(1),
            start_timeout: Duration::from_secs(5),
            restart_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }

    fn deployment() -> Deployment {
        let new = DeployRequest::new(OwnerId::new("alice"), "https://github.com/a/b")
            .env("PORT", "8080")
            .validate("main")
            .unwrap();
        Deployment::from_new(new)
    }

    async fn started() -> (
        Arc<MockRuntime>,
        ContainerController<MockRuntime>,
        Deployment,
        ContainerId,
        String,
    ) {
        let runtime = Arc::new(MockRuntime::new());
        let controller = ContainerController::new(runtime.clone(), settings());
        let deployment = deployment();
        let tag = naming::image_tag(&deployment.id);
        runtime.insert_image(&tag);
        let image = ImageRef::parse(&tag).unwrap();
        let id = controller.create_and_start(&deployment, &image).await.unwrap();
        (runtime, controller, deployment, id, tag)
    }

    #[tokio::test]
    async fn create_and_start_applies_env_and_labels() {
        let (runtime, _, deployment, id, _) = started().await;
        let containers = runtime.containers();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].id, id);
        assert!(containers[0].running);
        assert_eq!(containers[0].env["PORT"], "8080");
        assert_eq!(
            containers[0].labels[naming::LABEL_DEPLOYMENT],
            deployment.id.to_string()
        );
    }

    #[tokio::test]
    async fn restart_without_container_is_not_found() {
        let runtime = Arc::new(MockRuntime::new());
        let controller = ContainerController::new(runtime, settings());
        let err = controller.restart(None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn restart_of_vanished_container_is_not_found() {
        let (runtime, controller, _, id, _) = started().await;
        runtime.remove_container_out_of_band(&id);
        let err = controller.restart(Some(&id)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn stop_tolerates_missing_container_and_image() {
        let (runtime, controller, _, id, tag) = started().await;
        runtime.remove_container_out_of_band(&id);
        controller.stop(&id, Some(&tag)).await.unwrap();
        let outcome = controller.stop(&id, Some(&tag)).await.unwrap();
        assert_eq!(outcome, StopOutcome::default());
    }

    #[tokio::test]
    async fn stop_surfaces_other_failures() {
        let (runtime, controller, _, id, tag) = started().await;
        runtime.fail(MockOp::RemoveContainer, "daemon unavailable");
        let err = controller.stop(&id, Some(&tag)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Remove(_)));
    }

    #[tokio::test]
    async fn start_times_out() {
        let runtime = Arc::new(MockRuntime::new());
        runtime.delay(MockOp::Start, Duration::from_secs(5));
        let controller = ContainerController::new(
            runtime.clone(),
            ControllerSettings {
                start_timeout: Duration::from_millis(20),
                ..settings()
            },
        );
        let deployment = deployment();
        let tag = naming::image_tag(&deployment.id);
        runtime.insert_image(&tag);
        let err = controller
            .create_and_start(&deployment, &ImageRef::parse(&tag).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Timeout { operation: "start", .. }));
    }

    #[tokio::test]
    async fn locate_matches_exact_name() {
        let (runtime, _, deployment, id, _) = started().await;
        let found = locate(runtime.as_ref(), &deployment.id, &deployment.owner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);

        let missing = locate(runtime.as_ref(), &DeploymentId::new("other"), &deployment.owner)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn locate_ignores_names_sharing_a_prefix() {
        let (runtime, _, deployment, _, _) = started().await;
        let prefix = DeploymentId::new(&deployment.id.as_str()[..8]);

        let found = locate(runtime.as_ref(), &prefix, &deployment.owner)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
