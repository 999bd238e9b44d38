// ABOUTME: Deployment store backed by one pretty-printed JSON file per record.
// ABOUTME: Writes go through a temp file and rename so readers never see partial records.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{DeploymentStore, StoreError, touch};
use crate::deploy::{Deployment, NewDeployment};
use crate::types::{DeploymentId, OwnerId};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Keep records in `dir`, creating it on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record path for `id`, or `None` if the id could escape the directory.
    fn path_for(&self, id: &DeploymentId) -> Option<PathBuf> {
        let raw = id.as_str();
        let safe = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        safe.then(|| self.dir.join(format!("{raw}.json")))
    }

    fn require_path(&self, id: &DeploymentId) -> Result<PathBuf, StoreError> {
        self.path_for(id)
            .ok_or_else(|| StoreError::InvalidId(id.to_string()))
    }

    async fn read(path: &Path) -> Result<Option<Deployment>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, deployment: &Deployment) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(deployment)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl DeploymentStore for JsonFileStore {
    async fn create(&self, new: NewDeployment) -> Result<Deployment, StoreError> {
        let path = self.require_path(&new.id)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(StoreError::AlreadyExists(new.id));
        }
        let deployment = Deployment::from_new(new);
        self.write(&path, &deployment).await?;
        Ok(deployment)
    }

    async fn find_by_id(
        &self,
        id: &DeploymentId,
        owner: &OwnerId,
    ) -> Result<Option<Deployment>, StoreError> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        Ok(Self::read(&path).await?.filter(|d| &d.owner == owner))
    }

    async fn save(&self, deployment: &mut Deployment) -> Result<(), StoreError> {
        let path = self.require_path(&deployment.id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(deployment.id.clone()));
        }
        touch(deployment);
        self.write(&path, deployment).await
    }

    async fn remove(&self, deployment: &Deployment) -> Result<(), StoreError> {
        let path = self.require_path(&deployment.id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Deployment>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read(&path).await {
                Ok(Some(deployment)) if &deployment.owner == owner => found.push(deployment),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("skipping unreadable record {}: {}", path.display(), e);
                }
            }
        }

        found.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(found)
    }
}
