// ABOUTME: The image build stage: descriptor, context, and runtime build call.
// ABOUTME: One image per deployment id, tagged deterministically so rebuilds overwrite it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::context::pack_workspace;
use super::descriptor::{DOCKERFILE, DescriptorSpec, synthesize_dockerfile};
use super::BuildError;
use crate::deploy::{Deployment, naming};
use crate::runtime::{BuildConfig, ImageOps};
use crate::types::ImageRef;

pub struct ImageBuilder<R> {
    runtime: Arc<R>,
    base_image: String,
    timeout: Duration,
}

impl<R: ImageOps> ImageBuilder<R> {
    pub fn new(runtime: Arc<R>, base_image: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runtime,
            base_image: base_image.into(),
            timeout,
        }
    }

    /// Build the deployment's image from `workspace` and return its tag.
    pub async fn build(
        &self,
        deployment: &Deployment,
        workspace: &Path,
    ) -> Result<ImageRef, BuildError> {
        let tag = naming::image_tag(&deployment.id);
        let image = ImageRef::parse(&tag).map_err(|e| BuildError::InvalidTag {
            tag: tag.clone(),
            reason: e.to_string(),
        })?;

        let synthesized = self.ensure_descriptor(deployment, workspace).await?;
        tracing::debug!(
            deployment = %deployment.id,
            synthesized,
            "building {}",
            image
        );

        let dir = workspace.to_path_buf();
        let context = tokio::task::spawn_blocking(move || pack_workspace(&dir))
            .await
            .map_err(|e| BuildError::Context(std::io::Error::other(e)))?
            .map_err(BuildError::Context)?;

        let config = BuildConfig {
            tag: image.clone(),
            context,
            dockerfile: DOCKERFILE.to_string(),
            build_args: deployment
                .env_vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>(),
            labels: naming::labels(&deployment.id, &deployment.owner),
        };

        tokio::time::timeout(self.timeout, self.runtime.build_image(&config))
            .await
            .map_err(|_| BuildError::Timeout(self.timeout))??;

        Ok(image)
    }

    /// Write a Dockerfile unless the repository has one. Returns whether
    /// one was synthesized.
    async fn ensure_descriptor(
        &self,
        deployment: &Deployment,
        workspace: &Path,
    ) -> Result<bool, BuildError> {
        let path = workspace.join(DOCKERFILE);
        if tokio::fs::try_exists(&path)
            .await
            .map_err(BuildError::Descriptor)?
        {
            return Ok(false);
        }

        let spec = DescriptorSpec {
            base_image: &self.base_image,
            build_command: &deployment.build_command,
            start_command: &deployment.start_command,
            build_args: deployment.env_vars.keys().map(String::as_str).collect(),
        };
        tokio::fs::write(&path, synthesize_dockerfile(&spec))
            .await
            .map_err(BuildError::Descriptor)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::DeployRequest;
    use crate::runtime::{MockCall, MockOp, MockRuntime};
    use crate::types::OwnerId;

    fn deployment() -> Deployment {
        Deployment::from_new(
            DeployRequest::new(OwnerId::new("alice"), "https://github.com/a/b")
                .build_command("npm install")
                .start_command("npm start")
                .env("PORT", "8080")
                .validate("main")
                .unwrap(),
        )
    }

    fn builder(runtime: &Arc<MockRuntime>) -> ImageBuilder<MockRuntime> {
        ImageBuilder::new(runtime.clone(), "node:20-alpine", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn synthesizes_dockerfile_and_tags_image() {
        let workspace = tempfile::tempdir().unwrap();
        let runtime = Arc::new(MockRuntime::new());
        let deployment = deployment();

        let image = builder(&runtime)
            .build(&deployment, workspace.path())
            .await
            .unwrap();

        assert_eq!(image.to_string(), naming::image_tag(&deployment.id));
        assert_eq!(runtime.image_tags(), vec![image.to_string()]);

        let dockerfile = std::fs::read_to_string(workspace.path().join(DOCKERFILE)).unwrap();
        assert!(dockerfile.starts_with("FROM node:20-alpine\n"));
        assert!(dockerfile.contains("RUN npm install"));

        let build_args = runtime.calls().into_iter().find_map(|c| match c {
            MockCall::Build { build_args, .. } => Some(build_args),
            _ => None,
        });
        assert_eq!(build_args.unwrap()["PORT"], "8080");
    }

    #[tokio::test]
    async fn repository_dockerfile_wins() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::write(workspace.path().join(DOCKERFILE), "FROM scratch\n").unwrap();
        let runtime = Arc::new(MockRuntime::new());

        builder(&runtime)
            .build(&deployment(), workspace.path())
            .await
            .unwrap();

        let dockerfile = std::fs::read_to_string(workspace.path().join(DOCKERFILE)).unwrap();
        assert_eq!(dockerfile, "FROM scratch\n");
    }

    #[tokio::test]
    async fn failed_build_leaves_no_image() {
        let workspace = tempfile::tempdir().unwrap();
        let runtime = Arc::new(MockRuntime::new());
        runtime.fail(MockOp::Build, "npm ERR! missing script");

        let err = builder(&runtime)
            .build(&deployment(), workspace.path())
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Failed(m) if m.contains("missing script")));
        assert!(runtime.image_tags().is_empty());
    }

    #[tokio::test]
    async fn missing_workspace_is_descriptor_error() {
        let root = tempfile::tempdir().unwrap();
        let runtime = Arc::new(MockRuntime::new());

        let err = builder(&runtime)
            .build(&deployment(), &root.path().join("gone"))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Descriptor(_)));
    }
}
