// ABOUTME: In-memory deployment store.
// ABOUTME: For embedding and tests; records vanish with the process.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{DeploymentStore, StoreError, touch};
use crate::deploy::{Deployment, NewDeployment};
use crate::types::{DeploymentId, OwnerId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<DeploymentId, Deployment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn create(&self, new: NewDeployment) -> Result<Deployment, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&new.id) {
            return Err(StoreError::AlreadyExists(new.id));
        }
        let deployment = Deployment::from_new(new);
        records.insert(deployment.id.clone(), deployment.clone());
        Ok(deployment)
    }

    async fn find_by_id(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
    ) -> Result<Option<Deployment>, StoreError> {
        Ok(self
            .records
            .read()
            .get(id)
            .filter(|d| &d.owner == owner)
            .cloned())
    }

    async fn save(&self, deployment: &mut Deployment) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let slot = records
            .get_mut(&deployment.id)
            .ok_or_else(|| StoreError::NotFound(deployment.id.clone()))?;
        touch(deployment);
        *slot = deployment.clone();
        Ok(())
    }

    async fn remove(&self, deployment: &Deployment) -> Result<(), StoreError> {
        self.records.write().remove(&deployment.id);
        Ok(())
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Deployment>, StoreError> {
        let mut found: Vec<Deployment> = self
            .records
            .read()
            .values()
            .filter(|d| &d.owner == owner)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(found)
    }
}
