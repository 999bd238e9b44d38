// ABOUTME: VersionControl implementation that shells out to the git binary.
// ABOUTME: Runs non-interactive shallow single-branch clones.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{FetchError, VersionControl};
use crate::types::{BranchName, RepoUrl};

/// Clones through the `git` command line client.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn shallow_clone(
        &self,
        url: &RepoUrl,
        dest: &Path,
        branch: &BranchName,
    ) -> Result<(), FetchError> {
        let output = Command::new(&self.binary)
            .args(["clone", "--depth", "1", "--single-branch", "--branch"])
            .arg(branch.as_str())
            .arg("--")
            .arg(url.as_str())
            .arg(dest)
            // Credentials prompts would hang the pipeline; fail instead.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("git exited with {}", output.status),
            trimmed => trimmed.to_string(),
        };

        tracing::warn!(url = %url, branch = %branch, "git clone failed: {}", message);

        Err(FetchError::CloneFailed {
            url: url.to_string(),
            branch: branch.to_string(),
            message,
        })
    }
}
