// ABOUTME: Deployment record persistence.
// ABOUTME: The DeploymentStore seam plus in-memory and JSON-file implementations.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::Utc;

use crate::deploy::{Deployment, NewDeployment};
use crate::types::{DeploymentId, OwnerId};

/// Errors from the deployment store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("deployment already exists: {0}")]
    AlreadyExists(DeploymentId),

    #[error("deployment not found: {0}")]
    NotFound(DeploymentId),

    #[error("invalid deployment id: {0:?}")]
    InvalidId(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt deployment record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where deployment records live.
///
/// Records are scoped by owner: a record looked up under another owner is
/// reported as absent.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Persist a new `initializing` record.
    async fn create(&self, new: NewDeployment) -> Result<Deployment, StoreError>;

    async fn find_by_id(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
    ) -> Result<Option<Deployment>, StoreError>;

    /// Overwrite an existing record, stamping `updated_at`.
    async fn save(&self, deployment: &mut Deployment) -> Result<(), StoreError>;

    async fn remove(&self, deployment: &Deployment) -> Result<(), StoreError>;

    /// All of an owner's records, oldest first.
    async fn list(&self, owner: &OwnerId) -> Result<Vec<Deployment>, StoreError>;
}

/// Advance `updated_at` to now, never backwards.
pub(crate) fn touch(deployment: &mut Deployment) {
    deployment.updated_at = Utc::now().max(deployment.updated_at);
}
