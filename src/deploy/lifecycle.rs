// ABOUTME: Lifecycle manager driving deployments through clone, build, and start.
// ABOUTME: Owns the status state machine, failure cleanup, and per-id serialization.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::instrument;

use super::cleanup::{Cleanup, CleanupReport};
use super::controller::{ContainerController, ControllerSettings};
use super::deployment::{DeployRequest, DeployUpdate, Deployment};
use super::error::{DeployError, RuntimeError};
use super::lock::DeployLocks;
use super::naming;
use super::state::DeploymentStatus;
use crate::build::ImageBuilder;
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::events::{DeploymentEvent, EventBus};
use crate::runtime::{DeployRuntime, RestartPolicyConfig};
use crate::source::{SourceFetcher, VersionControl};
use crate::store::DeploymentStore;
use crate::types::{DeploymentId, OwnerId, ValidationError};

/// What tearing down a deployment's runtime resources did.
#[derive(Debug, Default)]
pub struct Teardown {
    pub container_removed: bool,
    pub image_removed: bool,
    pub workspace_removed: bool,
    pub diagnostics: Diagnostics,
}

impl Teardown {
    fn absorb(&mut self, report: CleanupReport) {
        self.container_removed |= report.containers_removed > 0;
        self.image_removed |= report.images_removed > 0;
        self.workspace_removed |= report.workspace_removed;
        self.diagnostics.extend_cleanup(report.failures);
    }
}

struct Inner<R> {
    store: Arc<dyn DeploymentStore>,
    events: Arc<dyn EventBus>,
    fetcher: SourceFetcher,
    builder: ImageBuilder<R>,
    controller: ContainerController<R>,
    cleanup: Cleanup<R>,
    locks: DeployLocks,
    domain: String,
    default_branch: String,
    allow_local_repos: bool,
}

/// Entry point for every deployment operation.
///
/// Cheap to clone; clones share collaborators and locks.
pub struct LifecycleManager<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for LifecycleManager<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: DeployRuntime + 'static> LifecycleManager<R> {
    pub fn new(
        config: &Config,
        runtime: Arc<R>,
        store: Arc<dyn DeploymentStore>,
        events: Arc<dyn EventBus>,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        let timeouts = config.timeouts;
        let settings = ControllerSettings {
            restart_policy: RestartPolicyConfig::from(&config.restart),
            stop_grace: config.stop_grace,
            start_timeout: timeouts.start,
            restart_timeout: timeouts.restart,
            stop_timeout: timeouts.stop,
        };

        Self {
            inner: Arc::new(Inner {
                store,
                events,
                fetcher: SourceFetcher::new(vcs, config.repos_root.clone(), timeouts.clone),
                builder: ImageBuilder::new(
                    runtime.clone(),
                    config.base_image.clone(),
                    timeouts.build,
                ),
                controller: ContainerController::new(runtime.clone(), settings),
                cleanup: Cleanup::new(runtime, config.stop_grace),
                locks: DeployLocks::new(),
                domain: config.domain.clone(),
                default_branch: config.default_branch.clone(),
                allow_local_repos: config.allow_local_repos,
            }),
        }
    }

    pub fn locks(&self) -> &DeployLocks {
        &self.inner.locks
    }

    /// Validate a request and persist it as an `initializing` deployment.
    #[instrument(skip_all, fields(owner = %request.owner))]
    pub async fn create(&self, request: DeployRequest) -> Result<Deployment, DeployError> {
        let new = request.validate(&self.inner.default_branch)?;
        if new.repo_url.is_local() && !self.inner.allow_local_repos {
            return Err(ValidationError::LocalRepoNotAllowed(new.repo_url.to_string()).into());
        }
        let deployment = self.inner.store.create(new).await?;
        tracing::info!(deployment = %deployment.id, "deployment created");
        self.emit(&deployment).await;
        Ok(deployment)
    }

    /// Run clone, build, and start for an `initializing` or `failed` deployment.
    #[instrument(skip_all, fields(deployment = %deployment.id, owner = %deployment.owner))]
    pub async fn start(&self, deployment: Deployment) -> Result<Deployment, DeployError> {
        let _guard = self.inner.locks.acquire(&deployment.id).await;
        let mut deployment = self.reload(&deployment.id, &deployment.owner).await?;

        match deployment.status {
            DeploymentStatus::Initializing => {}
            DeploymentStatus::Failed => self.rearm(&mut deployment).await?,
            from => {
                return Err(DeployError::InvalidState {
                    id: deployment.id,
                    from,
                    to: DeploymentStatus::Cloning,
                });
            }
        }

        self.run_pipeline(deployment).await
    }

    /// Create a deployment and run its pipeline.
    pub async fn launch(&self, request: DeployRequest) -> Result<Deployment, DeployError> {
        let deployment = self.create(request).await?;
        self.start(deployment).await
    }

    /// `launch` on its own task, so one slow build does not hold up the caller.
    pub fn spawn_launch(
        &self,
        request: DeployRequest,
    ) -> JoinHandle<Result<Deployment, DeployError>> {
        let manager = self.clone();
        tokio::spawn(async move { manager.launch(request).await })
    }

    /// Restart the container of a `running` or `failed` deployment.
    #[instrument(skip_all, fields(deployment = %deployment.id, owner = %deployment.owner))]
    pub async fn restart(&self, deployment: Deployment) -> Result<Deployment, DeployError> {
        let _guard = self.inner.locks.acquire(&deployment.id).await;
        let mut deployment = self.reload(&deployment.id, &deployment.owner).await?;

        if !matches!(
            deployment.status,
            DeploymentStatus::Running | DeploymentStatus::Failed
        ) {
            return Err(DeployError::InvalidState {
                id: deployment.id,
                from: deployment.status,
                to: DeploymentStatus::Restarting,
            });
        }

        self.advance(&mut deployment, DeploymentStatus::Restarting, "restarting container")
            .await?;

        match self
            .inner
            .controller
            .restart(deployment.container_ref.as_ref())
            .await
        {
            Ok(()) => {
                if let Some(container) = &deployment.container_ref {
                    deployment.url = Some(naming::deployment_url(container, &self.inner.domain));
                }
                self.advance(&mut deployment, DeploymentStatus::Running, "running")
                    .await?;
                Ok(deployment)
            }
            Err(e) => {
                if matches!(e, RuntimeError::ContainerNotFound(_)) {
                    deployment.container_ref = None;
                    deployment.url = None;
                }
                Err(self.fail(&mut deployment, e.into(), false).await)
            }
        }
    }

    /// Stop and remove the deployment's container and image.
    ///
    /// Stop failures end up in the returned diagnostics, never as an error.
    /// Once the container is gone a stored record drops its runtime refs and
    /// leaves `running`. The caller decides whether to delete it.
    #[instrument(skip_all, fields(deployment = %deployment.id, owner = %deployment.owner))]
    pub async fn terminate(&self, deployment: Deployment) -> Result<Teardown, DeployError> {
        let _guard = self.inner.locks.acquire(&deployment.id).await;
        let (mut deployment, stored) = match self
            .inner
            .store
            .find_by_id(&deployment.id, &deployment.owner)
            .await?
        {
            Some(found) => (found, true),
            None => (deployment, false),
        };

        let had_container = deployment.container_ref.is_some();
        let teardown = self.stop_resources(&mut deployment).await;

        if stored && had_container && deployment.container_ref.is_none() {
            if deployment.status.can_transition_to(DeploymentStatus::Failed) {
                self.advance(&mut deployment, DeploymentStatus::Failed, "container terminated")
                    .await?;
            } else {
                self.inner.store.save(&mut deployment).await?;
            }
        }
        Ok(teardown)
    }

    /// Tear everything down and forget the deployment.
    #[instrument(skip_all, fields(deployment = %id, owner = %owner))]
    pub async fn delete(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
    ) -> Result<Teardown, DeployError> {
        let _guard = self.inner.locks.acquire(id).await;
        let mut deployment = self.reload(id, owner).await?;

        let mut teardown = self.stop_resources(&mut deployment).await;
        let mut report = self.inner.cleanup.reclaim(id, owner).await;
        self.inner
            .cleanup
            .reclaim_workspace(&self.inner.fetcher, id, &mut report)
            .await;
        teardown.absorb(report);

        // A previous delete may have failed between these two writes
        if deployment.status != DeploymentStatus::Removed {
            self.advance(&mut deployment, DeploymentStatus::Removed, "deployment removed")
                .await?;
        }
        self.inner.store.remove(&deployment).await?;

        tracing::info!("deployment deleted");
        self.publish(owner, DeploymentEvent::removed(id)).await;
        Ok(teardown)
    }

    /// Apply an update, tear down what is running, and start from scratch.
    #[instrument(skip_all, fields(deployment = %id, owner = %owner))]
    pub async fn redeploy(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
        update: DeployUpdate,
    ) -> Result<Deployment, DeployError> {
        let _guard = self.inner.locks.acquire(id).await;
        let mut deployment = self.reload(id, owner).await?;

        if deployment.status != DeploymentStatus::Initializing
            && !deployment
                .status
                .can_transition_to(DeploymentStatus::Initializing)
        {
            return Err(DeployError::InvalidState {
                id: deployment.id,
                from: deployment.status,
                to: DeploymentStatus::Initializing,
            });
        }

        update.apply_to(&mut deployment)?;
        self.release(&mut deployment).await?;

        deployment.status = DeploymentStatus::Initializing;
        deployment.logs = Some("redeploying".to_string());
        self.inner.store.save(&mut deployment).await?;
        tracing::info!("deployment reset for redeploy");
        self.emit(&deployment).await;

        self.run_pipeline(deployment).await
    }

    pub async fn get(&self, id: &DeploymentId, owner: &OwnerId) -> Result<Deployment, DeployError> {
        self.reload(id, owner).await
    }

    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<Deployment>, DeployError> {
        Ok(self.inner.store.list(owner).await?)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    async fn run_pipeline(&self, mut deployment: Deployment) -> Result<Deployment, DeployError> {
        match self.stages(&mut deployment).await {
            Ok(()) => Ok(deployment),
            Err(e) => Err(self.fail(&mut deployment, e, true).await),
        }
    }

    async fn stages(&self, deployment: &mut Deployment) -> Result<(), DeployError> {
        self.advance(deployment, DeploymentStatus::Cloning, "cloning repository")
            .await?;
        let workspace = self
            .inner
            .fetcher
            .fetch(&deployment.id, &deployment.repo_url, &deployment.branch)
            .await?;

        self.advance(deployment, DeploymentStatus::Building, "building image")
            .await?;
        let image = self.inner.builder.build(deployment, &workspace).await?;

        self.advance(deployment, DeploymentStatus::Starting, "starting container")
            .await?;
        let container = self
            .inner
            .controller
            .create_and_start(deployment, &image)
            .await?;

        deployment.url = Some(naming::deployment_url(&container, &self.inner.domain));
        deployment.container_ref = Some(container);
        deployment.image_ref = Some(image.to_string());
        self.advance(deployment, DeploymentStatus::Running, "running")
            .await
    }

    /// Put a failed deployment back to `initializing` for a fresh start.
    async fn rearm(&self, deployment: &mut Deployment) -> Result<(), DeployError> {
        self.release(deployment).await?;
        self.advance(deployment, DeploymentStatus::Initializing, "restarting deployment")
            .await
    }

    /// Drop everything a previous run left behind: container, image, and workspace.
    async fn release(&self, deployment: &mut Deployment) -> Result<(), DeployError> {
        let mut teardown = self.stop_resources(deployment).await;
        teardown.absorb(
            self.inner
                .cleanup
                .reclaim(&deployment.id, &deployment.owner)
                .await,
        );
        self.inner.fetcher.remove_workspace(&deployment.id).await?;
        deployment.clear_runtime_refs();

        tracing::debug!(
            deployment = %deployment.id,
            container_removed = teardown.container_removed,
            image_removed = teardown.image_removed,
            warnings = teardown.diagnostics.warnings().len(),
            "released previous run"
        );
        Ok(())
    }

    /// Persist `next` with a message, then announce it.
    async fn advance(
        &self,
        deployment: &mut Deployment,
        next: DeploymentStatus,
        message: &str,
    ) -> Result<(), DeployError> {
        if !deployment.status.can_transition_to(next) {
            return Err(DeployError::InvalidState {
                id: deployment.id.clone(),
                from: deployment.status,
                to: next,
            });
        }

        deployment.status = next;
        deployment.logs = Some(message.to_string());
        self.inner.store.save(deployment).await?;

        tracing::info!(
            deployment = %deployment.id,
            owner = %deployment.owner,
            status = %next,
            "{}",
            message
        );
        self.emit(deployment).await;
        Ok(())
    }

    /// Record a stage failure and hand the error back for the caller.
    async fn fail(
        &self,
        deployment: &mut Deployment,
        error: DeployError,
        reclaim: bool,
    ) -> DeployError {
        tracing::warn!(
            deployment = %deployment.id,
            stage = %deployment.status,
            "stage failed: {}",
            error
        );

        if reclaim {
            self.inner
                .cleanup
                .reclaim(&deployment.id, &deployment.owner)
                .await;
            deployment.clear_runtime_refs();
        }

        if deployment.status.can_transition_to(DeploymentStatus::Failed) {
            deployment.status = DeploymentStatus::Failed;
        }
        deployment.logs = Some(error.to_string());

        if let Err(e) = self.inner.store.save(deployment).await {
            tracing::warn!(deployment = %deployment.id, "failed to persist failure: {}", e);
        }
        self.emit(deployment).await;
        error
    }

    async fn stop_resources(&self, deployment: &mut Deployment) -> Teardown {
        let mut teardown = Teardown::default();
        let Some(container) = deployment.container_ref.clone() else {
            return teardown;
        };

        match self
            .inner
            .controller
            .stop(&container, deployment.image_ref.as_deref())
            .await
        {
            Ok(outcome) => {
                teardown.container_removed = outcome.container_removed;
                teardown.image_removed = outcome.image_removed;
                deployment.clear_runtime_refs();
            }
            Err(e) => teardown.diagnostics.warn(Warning::stop(format!(
                "deployment {}: {}",
                deployment.id, e
            ))),
        }
        teardown
    }

    async fn reload(&self, id: &DeploymentId, owner: &OwnerId) -> Result<Deployment, DeployError> {
        self.inner
            .store
            .find_by_id(id, owner)
            .await?
            .ok_or_else(|| DeployError::NotFound(id.clone()))
    }

    async fn emit(&self, deployment: &Deployment) {
        self.publish(&deployment.owner, DeploymentEvent::update(deployment))
            .await;
    }

    async fn publish(&self, channel: &OwnerId, event: DeploymentEvent) {
        if let Err(e) = self.inner.events.publish(channel, event).await {
            tracing::warn!(channel = %channel, "failed to publish event: {}", e);
        }
    }
}
