// ABOUTME: Best-effort reclaim of a deployment's runtime resources and workspace.
// ABOUTME: Finds resources by derived name, so it also catches never-persisted ones.

use std::sync::Arc;
use std::time::Duration;

use super::controller::locate;
use super::error::CleanupError;
use super::naming;
use crate::runtime::{ContainerError, ContainerOps, ImageError, ImageFilters, ImageOps};
use crate::source::SourceFetcher;
use crate::types::{DeploymentId, OwnerId};

/// What Cleanup released and what it could not.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub containers_removed: usize,
    pub images_removed: usize,
    pub workspace_removed: bool,
    pub failures: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, id: &DeploymentId, error: CleanupError) {
        tracing::warn!(deployment = %id, "cleanup: {}", error);
        self.failures.push(error);
    }
}

pub struct Cleanup<R> {
    runtime: Arc<R>,
    stop_grace: Duration,
}

impl<R: ContainerOps + ImageOps> Cleanup<R> {
    pub fn new(runtime: Arc<R>, stop_grace: Duration) -> Self {
        Self {
            runtime,
            stop_grace,
        }
    }

    /// Remove any container and image belonging to the deployment.
    ///
    /// Never fails: every removal error lands in the report.
    pub async fn reclaim(&self, id: &DeploymentId, owner: &OwnerId) -> CleanupReport {
        let mut report = CleanupReport::default();
        self.reclaim_containers(id, owner, &mut report).await;
        self.reclaim_image(id, &mut report).await;

        if report.containers_removed + report.images_removed > 0 {
            tracing::info!(
                deployment = %id,
                containers = report.containers_removed,
                images = report.images_removed,
                "reclaimed runtime resources"
            );
        }
        report
    }

    /// Remove the deployment's workspace, recording the outcome in `report`.
    pub async fn reclaim_workspace(
        &self,
        fetcher: &SourceFetcher,
        id: &DeploymentId,
        report: &mut CleanupReport,
    ) {
        match fetcher.remove_workspace(id).await {
            Ok(removed) => report.workspace_removed = removed,
            Err(source) => report.fail(
                id,
                CleanupError::Workspace {
                    path: fetcher.workspace(id),
                    source,
                },
            ),
        }
    }

    async fn reclaim_containers(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
        report: &mut CleanupReport,
    ) {
        let container = match locate(self.runtime.as_ref(), id, owner).await {
            Ok(Some(container)) => container,
            Ok(None) => return,
            Err(source) => {
                let name = naming::container_name(owner, id);
                report.fail(id, CleanupError::ListContainers { name, source });
                return;
            }
        };

        // Stop first so the process gets its grace period; the forced remove follows regardless
        match self
            .runtime
            .stop_container(&container.id, self.stop_grace)
            .await
        {
            Ok(()) | Err(ContainerError::NotRunning(_)) | Err(ContainerError::NotFound(_)) => {}
            Err(e) => tracing::warn!(
                deployment = %id,
                container = %container.id,
                "stop before removal failed: {}",
                e
            ),
        }

        match self.runtime.remove_container(&container.id, true).await {
            Ok(()) => report.containers_removed += 1,
            Err(ContainerError::NotFound(_)) => {}
            Err(source) => report.fail(
                id,
                CleanupError::RemoveContainer {
                    id: container.id,
                    source,
                },
            ),
        }
    }

    async fn reclaim_image(&self, id: &DeploymentId, report: &mut CleanupReport) {
        let tag = naming::image_tag(id);
        let filters = ImageFilters {
            reference: Some(tag.clone()),
            ..Default::default()
        };

        let images = match self.runtime.list_images(&filters).await {
            Ok(images) => images,
            Err(source) => {
                report.fail(id, CleanupError::ListImages { tag, source });
                return;
            }
        };

        if images.is_empty() {
            return;
        }

        match self.runtime.remove_image(&tag, true).await {
            Ok(()) => report.images_removed += 1,
            Err(ImageError::NotFound(_)) => {}
            Err(source) => report.fail(id, CleanupError::RemoveImage { tag, source }),
        }
    }
}
