// ABOUTME: Test support utilities.
// ABOUTME: Fake git, recording store and event bus, and a lifecycle harness over MockRuntime.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use skiff::config::Config;
use skiff::deploy::{DeployRequest, Deployment, DeploymentStatus, LifecycleManager, NewDeployment};
use skiff::events::{DeploymentEvent, Envelope, EventBus, EventError};
use skiff::runtime::MockRuntime;
use skiff::source::{FetchError, VersionControl};
use skiff::store::{DeploymentStore, MemoryStore, StoreError};
use skiff::types::{BranchName, DeploymentId, OwnerId, RepoUrl};
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("skiff=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Version control that writes a tiny Node project instead of cloning.
#[derive(Default)]
pub struct FakeVcs {
    failure: Mutex<Option<String>>,
    dockerfile: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    clones: Mutex<Vec<(String, String)>>,
}

impl FakeVcs {
    pub fn fail(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Ship a Dockerfile in every checkout.
    pub fn with_dockerfile(&self, contents: &str) {
        *self.dockerfile.lock() = Some(contents.to_string());
    }

    pub fn delay(&self, duration: Duration) {
        *self.delay.lock() = Some(duration);
    }

    /// `(url, branch)` of every clone attempt.
    pub fn clones(&self) -> Vec<(String, String)> {
        self.clones.lock().clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn shallow_clone(
        &self,
        url: &RepoUrl,
        dest: &Path,
        branch: &BranchName,
    ) -> Result<(), FetchError> {
        self.clones
            .lock()
            .push((url.to_string(), branch.to_string()));

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().clone();
        if let Some(message) = failure {
            return Err(FetchError::CloneFailed {
                url: url.to_string(),
                branch: branch.to_string(),
                message,
            });
        }

        tokio::fs::create_dir_all(dest.join(".git")).await?;
        tokio::fs::write(dest.join("package.json"), r#"{"name":"app"}"#).await?;
        let dockerfile = self.dockerfile.lock().clone();
        if let Some(contents) = dockerfile {
            tokio::fs::write(dest.join("Dockerfile"), contents).await?;
        }
        Ok(())
    }
}

/// Memory store that remembers the status of every write.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(DeploymentId, DeploymentStatus)>>,
}

impl RecordingStore {
    pub fn statuses(&self, id: &DeploymentId) -> Vec<DeploymentStatus> {
        self.writes
            .lock()
            .iter()
            .filter(|(w, _)| w == id)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl DeploymentStore for RecordingStore {
    async fn create(&self, new: NewDeployment) -> Result<Deployment, StoreError> {
        let deployment = self.inner.create(new).await?;
        self.writes
            .lock()
            .push((deployment.id.clone(), deployment.status));
        Ok(deployment)
    }

    async fn find_by_id(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
    ) -> Result<Option<Deployment>, StoreError> {
        self.inner.find_by_id(id, owner).await
    }

    async fn save(&self, deployment: &mut Deployment) -> Result<(), StoreError> {
        self.inner.save(deployment).await?;
        self.writes
            .lock()
            .push((deployment.id.clone(), deployment.status));
        Ok(())
    }

    async fn remove(&self, deployment: &Deployment) -> Result<(), StoreError> {
        self.inner.remove(deployment).await
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Deployment>, StoreError> {
        self.inner.list(owner).await
    }
}

/// Event bus that keeps everything published to it.
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<Envelope>>,
    closed: Mutex<bool>,
}

impl RecordingBus {
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.published.lock().clone()
    }

    /// Statuses of update events for `id`, in publish order.
    pub fn statuses(&self, id: &DeploymentId) -> Vec<DeploymentStatus> {
        self.published
            .lock()
            .iter()
            .filter_map(|e| match &e.event {
                DeploymentEvent::DeploymentUpdate {
                    deployment_id,
                    status,
                    ..
                } if deployment_id == id => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn last_for(&self, id: &DeploymentId) -> Option<DeploymentEvent> {
        self.published
            .lock()
            .iter()
            .rev()
            .find(|e| e.event.deployment_id() == id)
            .map(|e| e.event.clone())
    }

    /// Refuse every later publish.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, channel: &OwnerId, event: DeploymentEvent) -> Result<(), EventError> {
        if *self.closed.lock() {
            return Err(EventError::Closed);
        }
        self.published.lock().push(Envelope {
            channel: channel.clone(),
            event,
        });
        Ok(())
    }
}

/// A lifecycle manager wired to in-memory collaborators under a temp dir.
pub struct Harness {
    pub root: TempDir,
    pub config: Config,
    pub runtime: Arc<MockRuntime>,
    pub store: Arc<RecordingStore>,
    pub bus: Arc<RecordingBus>,
    pub vcs: Arc<FakeVcs>,
    pub manager: LifecycleManager<MockRuntime>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        init_tracing();
        let root = tempfile::tempdir().unwrap();
        let mut config = Config {
            repos_root: root.path().join("repos"),
            state_dir: root.path().join("state"),
            domain: "apps.example.com".to_string(),
            ..Config::default()
        };
        adjust(&mut config);

        let runtime = Arc::new(MockRuntime::new());
        let store = Arc::new(RecordingStore::default());
        let bus = Arc::new(RecordingBus::default());
        let vcs = Arc::new(FakeVcs::default());
        let manager = LifecycleManager::new(
            &config,
            runtime.clone(),
            store.clone(),
            bus.clone(),
            vcs.clone(),
        );

        Self {
            root,
            config,
            runtime,
            store,
            bus,
            vcs,
            manager,
        }
    }

    pub fn workspace(&self, id: &DeploymentId) -> std::path::PathBuf {
        self.config.repos_root.join(id.as_str())
    }
}

pub fn owner() -> OwnerId {
    OwnerId::new("alice")
}

/// The request from the README walkthrough.
pub fn request() -> DeployRequest {
    DeployRequest::new(owner(), "https://github.com/a/b")
        .branch("main")
        .build_command("npm install")
        .start_command("npm start")
        .env("PORT", "8080")
}
