// ABOUTME: Source fetching: shallow clones of a repository branch into a workspace.
// ABOUTME: Defines the VersionControl seam and the SourceFetcher that owns workspace layout.

mod git;

pub use git::GitCli;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::deploy::naming;
use crate::types::{BranchName, DeploymentId, RepoUrl};

/// Errors from fetching source code.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("workspace already exists: {0}")]
    WorkspaceExists(PathBuf),

    #[error("failed to clone {url} (branch {branch}): {message}")]
    CloneFailed {
        url: String,
        branch: String,
        message: String,
    },

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clone timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// A version control client able to make single-commit checkouts.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `branch` of `url` into `dest` with a history depth of one.
    ///
    /// `dest` does not exist yet; the client creates it.
    async fn shallow_clone(
        &self,
        url: &RepoUrl,
        dest: &Path,
        branch: &BranchName,
    ) -> Result<(), FetchError>;
}

/// Places shallow checkouts under the repos root, one directory per deployment.
pub struct SourceFetcher {
    vcs: Arc<dyn VersionControl>,
    repos_root: PathBuf,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        repos_root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            vcs,
            repos_root: repos_root.into(),
            timeout,
        }
    }

    pub fn repos_root(&self) -> &Path {
        &self.repos_root
    }

    /// Workspace path for a deployment, whether or not it exists.
    pub fn workspace(&self, id: &DeploymentId) -> PathBuf {
        naming::workspace_dir(&self.repos_root, id)
    }

    /// Clone the deployment's source into a fresh workspace.
    ///
    /// Never reuses an existing workspace. A clone that fails or times out
    /// leaves whatever git already wrote in place.
    pub async fn fetch(
        &self,
        id: &DeploymentId,
        url: &RepoUrl,
        branch: &BranchName,
    ) -> Result<PathBuf, FetchError> {
        tokio::fs::create_dir_all(&self.repos_root).await?;

        let dest = self.workspace(id);
        if tokio::fs::try_exists(&dest).await? {
            return Err(FetchError::WorkspaceExists(dest));
        }

        tracing::debug!(
            deployment = %id,
            url = %url,
            branch = %branch,
            "cloning into {}",
            dest.display()
        );

        tokio::time::timeout(self.timeout, self.vcs.shallow_clone(url, &dest, branch))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        Ok(dest)
    }

    /// Remove a deployment's workspace. Returns whether one existed.
    pub async fn remove_workspace(&self, id: &DeploymentId) -> Result<bool, FetchError> {
        let dest = self.workspace(id);
        match tokio::fs::remove_dir_all(&dest).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DirOnly {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VersionControl for DirOnly {
        async fn shallow_clone(
            &self,
            _url: &RepoUrl,
            dest: &Path,
            _branch: &BranchName,
        ) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::create_dir_all(dest).await?;
            Ok(())
        }
    }

    struct Slow;

    #[async_trait]
    impl VersionControl for Slow {
        async fn shallow_clone(
            &self,
            _url: &RepoUrl,
            _dest: &Path,
            _branch: &BranchName,
        ) -> Result<(), FetchError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    fn inputs() -> (DeploymentId, RepoUrl, BranchName) {
        (
            DeploymentId::new("d1"),
            RepoUrl::parse("https://github.com/a/b").unwrap(),
            BranchName::new("main").unwrap(),
        )
    }

    #[tokio::test]
    async fn fetch_refuses_existing_workspace() {
        let root = tempfile::tempdir().unwrap();
        let vcs = Arc::new(DirOnly {
            calls: AtomicUsize::new(0),
        });
        let fetcher = SourceFetcher::new(vcs.clone(), root.path(), Duration::from_secs(5));
        let (id, url, branch) = inputs();

        let dir = fetcher.fetch(&id, &url, &branch).await.unwrap();
        assert!(dir.is_dir());

        let err = fetcher.fetch(&id, &url, &branch).await.unwrap_err();
        assert!(matches!(err, FetchError::WorkspaceExists(p) if p == dir));
        assert_eq!(vcs.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_times_out() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(Arc::new(Slow), root.path(), Duration::from_millis(20));
        let (id, url, branch) = inputs();

        let err = fetcher.fetch(&id, &url, &branch).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn remove_workspace_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(
            Arc::new(DirOnly {
                calls: AtomicUsize::new(0),
            }),
            root.path(),
            Duration::from_secs(5),
        );
        let (id, url, branch) = inputs();
        fetcher.fetch(&id, &url, &branch).await.unwrap();

        assert!(fetcher.remove_workspace(&id).await.unwrap());
        assert!(!fetcher.remove_workspace(&id).await.unwrap());
    }
}
