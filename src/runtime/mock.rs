// ABOUTME: In-memory container runtime for tests and dry runs.
// ABOUTME: Records every call and supports per-operation failure and delay injection.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    BuildConfig, ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerSummary,
    ImageError, ImageFilters, ImageOps, ImageSummary,
};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Runtime operations that can be failed or slowed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Build,
    Create,
    Start,
    Stop,
    Restart,
    RemoveContainer,
    RemoveImage,
    List,
}

/// A call the mock received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Build { tag: String, build_args: BTreeMap<String, String> },
    Create { name: String, image: String },
    Start(String),
    Stop(String),
    Restart(String),
    RemoveContainer(String),
    RemoveImage(String),
    ListContainers,
    ListImages,
}

/// A container held by the mock.
#[derive(Debug, Clone)]
pub struct MockContainer {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub running: bool,
}

#[derive(Debug, Clone)]
struct MockImage {
    id: ImageId,
    labels: HashMap<String, String>,
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, MockContainer>,
    images: BTreeMap<String, MockImage>,
    next_id: u64,
    failures: HashMap<MockOp, String>,
    delays: HashMap<MockOp, Duration>,
    calls: Vec<MockCall>,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:064x}", self.next_id)
    }
}

/// Container runtime that keeps containers and images in memory.
#[derive(Default)]
pub struct MockRuntime {
    state: Mutex<State>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `op` fail with `message` until cleared.
    pub fn fail(&self, op: MockOp, message: impl Into<String>) {
        self.state.lock().failures.insert(op, message.into());
    }

    pub fn clear_failure(&self, op: MockOp) {
        self.state.lock().failures.remove(&op);
    }

    /// Sleep for `duration` before completing every subsequent `op`.
    pub fn delay(&self, op: MockOp, duration: Duration) {
        self.state.lock().delays.insert(op, duration);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn containers(&self) -> Vec<MockContainer> {
        self.state.lock().containers.values().cloned().collect()
    }

    pub fn image_tags(&self) -> Vec<String> {
        self.state.lock().images.keys().cloned().collect()
    }

    /// Drop a container without going through the runtime API, as if
    /// someone ran `docker rm` by hand.
    pub fn remove_container_out_of_band(&self, id: &ContainerId) {
        self.state.lock().containers.remove(id.as_str());
    }

    /// Make an image available without building it.
    pub fn insert_image(&self, tag: &str) {
        let mut state = self.state.lock();
        let id = ImageId::new(format!("sha256:{}", state.allocate_id()));
        state.images.insert(
            tag.to_string(),
            MockImage {
                id,
                labels: HashMap::new(),
            },
        );
    }

    async fn enter(&self, op: MockOp, call: MockCall) -> Option<String> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.delays.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().failures.get(&op).cloned()
    }
}

fn labels_match(filter: &HashMap<String, String>, labels: &HashMap<String, String>) -> bool {
    filter.iter().all(|(k, v)| labels.get(k) == Some(v))
}

impl Sealed for MockRuntime {}

#[async_trait]
impl ImageOps for MockRuntime {
    async fn build_image(&self, config: &BuildConfig) -> Result<(), ImageError> {
        let tag = config.tag.to_string();
        let call = MockCall::Build {
            tag: tag.clone(),
            build_args: config.build_args.clone().into_iter().collect(),
        };
        if let Some(message) = self.enter(MockOp::Build, call).await {
            return Err(ImageError::BuildFailed(message));
        }

        let mut state = self.state.lock();
        let id = ImageId::new(format!("sha256:{}", state.allocate_id()));
        state.images.insert(
            tag,
            MockImage {
                id,
                labels: config.labels.clone(),
            },
        );
        Ok(())
    }

    async fn list_images(&self, filters: &ImageFilters) -> Result<Vec<ImageSummary>, ImageError> {
        if let Some(message) = self.enter(MockOp::List, MockCall::ListImages).await {
            return Err(ImageError::Runtime(message));
        }

        let state = self.state.lock();
        Ok(state
            .images
            .iter()
            .filter(|(tag, _)| filters.reference.as_deref().is_none_or(|r| *tag == r))
            .filter(|(_, image)| labels_match(&filters.labels, &image.labels))
            .map(|(tag, image)| ImageSummary {
                id: image.id.clone(),
                tags: vec![tag.clone()],
                labels: image.labels.clone(),
            })
            .collect())
    }

    async fn remove_image(&self, reference: &str, _force: bool) -> Result<(), ImageError> {
        let call = MockCall::RemoveImage(reference.to_string());
        if let Some(message) = self.enter(MockOp::RemoveImage, call).await {
            return Err(ImageError::Runtime(message));
        }

        let mut state = self.state.lock();
        let tag = state
            .images
            .iter()
            .find(|(tag, image)| *tag == reference || image.id.as_str() == reference)
            .map(|(tag, _)| tag.clone())
            .ok_or_else(|| ImageError::NotFound(reference.to_string()))?;
        state.images.remove(&tag);
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for MockRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let image = config.image.to_string();
        let call = MockCall::Create {
            name: config.name.clone(),
            image: image.clone(),
        };
        if let Some(message) = self.enter(MockOp::Create, call).await {
            return Err(ContainerError::Runtime(message));
        }

        let mut state = self.state.lock();
        if state.containers.values().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        if !state.images.contains_key(&image) {
            return Err(ContainerError::ImageNotFound(image));
        }

        let id = ContainerId::new(state.allocate_id());
        state.containers.insert(
            id.as_str().to_string(),
            MockContainer {
                id: id.clone(),
                name: config.name.clone(),
                image,
                env: config.env.clone(),
                labels: config.labels.clone(),
                running: false,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let call = MockCall::Start(id.to_string());
        if let Some(message) = self.enter(MockOp::Start, call).await {
            return Err(ContainerError::Runtime(message));
        }

        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if container.running {
            return Err(ContainerError::AlreadyRunning(id.to_string()));
        }
        container.running = true;
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let call = MockCall::Stop(id.to_string());
        if let Some(message) = self.enter(MockOp::Stop, call).await {
            return Err(ContainerError::Runtime(message));
        }

        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        if !container.running {
            return Err(ContainerError::NotRunning(id.to_string()));
        }
        container.running = false;
        Ok(())
    }

    async fn restart_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let call = MockCall::Restart(id.to_string());
        if let Some(message) = self.enter(MockOp::Restart, call).await {
            return Err(ContainerError::Runtime(message));
        }

        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        container.running = true;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let call = MockCall::RemoveContainer(id.to_string());
        if let Some(message) = self.enter(MockOp::RemoveContainer, call).await {
            return Err(ContainerError::Runtime(message));
        }

        let mut state = self.state.lock();
        match state.containers.get(id.as_str()) {
            None => Err(ContainerError::NotFound(id.to_string())),
            Some(c) if c.running && !force => Err(ContainerError::Runtime(format!(
                "cannot remove running container {}",
                id
            ))),
            Some(_) => {
                state.containers.remove(id.as_str());
                Ok(())
            }
        }
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        if let Some(message) = self.enter(MockOp::List, MockCall::ListContainers).await {
            return Err(ContainerError::Runtime(message));
        }

        let state = self.state.lock();
        Ok(state
            .containers
            .values()
            .filter(|c| filters.all || c.running)
            .filter(|c| {
                filters
                    .name
                    .as_deref()
                    .is_none_or(|name| c.name.contains(name))
            })
            .filter(|c| labels_match(&filters.labels, &c.labels))
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: if c.running { "running" } else { "exited" }.to_string(),
                status: String::new(),
                labels: c.labels.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::traits::RestartPolicyConfig;
    use crate::types::ImageRef;

    fn config(name: &str, image: &str) -> ContainerConfig {
        ContainerConfig {
            name: name.to_string(),
            image: ImageRef::parse(image).unwrap(),
            env: HashMap::new(),
            labels: HashMap::new(),
            command: None,
            restart_policy: RestartPolicyConfig::Always,
        }
    }

    #[tokio::test]
    async fn create_requires_image() {
        let runtime = MockRuntime::new();
        let err = runtime
            .create_container(&config("app", "missing:latest"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContainerError::ImageNotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let runtime = MockRuntime::new();
        runtime.insert_image("app:latest");
        runtime
            .create_container(&config("app", "app:latest"))
            .await
            .unwrap();
        let err = runtime
            .create_container(&config("app", "app:latest"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContainerError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn injected_failure_applies_until_cleared() {
        let runtime = MockRuntime::new();
        runtime.insert_image("app:latest");
        runtime.fail(MockOp::Create, "boom");
        assert!(
            runtime
                .create_container(&config("app", "app:latest"))
                .await
                .is_err()
        );
        runtime.clear_failure(MockOp::Create);
        let id = runtime
            .create_container(&config("app", "app:latest"))
            .await
            .unwrap();
        assert_eq!(id.as_str().len(), 64);
    }

    #[tokio::test]
    async fn list_filters_by_name_substring() {
        let runtime = MockRuntime::new();
        runtime.insert_image("app:latest");
        runtime
            .create_container(&config("skiff-alice-1", "app:latest"))
            .await
            .unwrap();
        runtime
            .create_container(&config("other", "app:latest"))
            .await
            .unwrap();
        let found = runtime
            .list_containers(&ContainerFilters::by_name("skiff-alice"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "skiff-alice-1");
    }
}
