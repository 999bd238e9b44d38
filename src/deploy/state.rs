// ABOUTME: Deployment status values and the legal transitions between them.
// ABOUTME: The pipeline runs initializing -> cloning -> building -> starting -> running.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a deployment is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Record created, pipeline not started.
    Initializing,
    /// Shallow clone in progress.
    Cloning,
    /// Image build in progress.
    Building,
    /// Container being created and started.
    Starting,
    /// Container started and reachable.
    Running,
    /// Restart of the existing container in progress.
    Restarting,
    /// A stage failed. Only an explicit start, restart, redeploy or delete leaves it.
    Failed,
    /// Deleted. Nothing leaves it.
    Removed,
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Removed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use DeploymentStatus::*;
        match (self, next) {
            (Removed, _) => false,
            (_, Removed) => true,
            (Failed, Failed) => false,
            (_, Failed) => true,

            (Initializing, Cloning)
            | (Cloning, Building)
            | (Building, Starting)
            | (Starting, Running)
            | (Running, Restarting)
            | (Restarting, Running) => true,

            // Explicit requests that re-arm a settled deployment
            (Failed, Restarting) | (Failed, Initializing) | (Running, Initializing) => true,

            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Cloning => "cloning",
            Self::Building => "building",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::Failed => "failed",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
