// ABOUTME: Error types for deployment operations.
// ABOUTME: Per-stage errors plus DeployError and its programmatic kind.

use std::path::PathBuf;
use std::time::Duration;

use super::state::DeploymentStatus;
use crate::build::BuildError;
use crate::runtime::{ContainerError, ImageError};
use crate::source::FetchError;
use crate::store::StoreError;
use crate::types::{ContainerId, DeploymentId, ValidationError};

/// Failures of the container runtime controller.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("failed to create container: {0}")]
    Create(ContainerError),

    #[error("failed to start container: {0}")]
    Start(ContainerError),

    #[error("failed to restart container: {0}")]
    Restart(ContainerError),

    #[error("failed to stop container: {0}")]
    Stop(ContainerError),

    #[error("failed to remove container: {0}")]
    Remove(ContainerError),

    #[error("failed to remove image: {0}")]
    RemoveImage(ImageError),

    #[error("invalid image reference: {0}")]
    InvalidImage(String),

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// A single resource Cleanup could not release. Logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("failed to list containers named {name}: {source}")]
    ListContainers {
        name: String,
        source: ContainerError,
    },

    #[error("failed to remove container {id}: {source}")]
    RemoveContainer {
        id: ContainerId,
        source: ContainerError,
    },

    #[error("failed to list images tagged {tag}: {source}")]
    ListImages { tag: String, source: ImageError },

    #[error("failed to remove image {tag}: {source}")]
    RemoveImage { tag: String, source: ImageError },

    #[error("failed to remove workspace {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        source: FetchError,
    },
}

/// Errors surfaced by the lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid deployment request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("deployment store error: {0}")]
    Store(#[from] StoreError),

    #[error("deployment not found: {0}")]
    NotFound(DeploymentId),

    #[error("deployment {id} cannot move from {from} to {to}")]
    InvalidState {
        id: DeploymentId,
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
}

/// Coarse classification of a `DeployError` for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Validation,
    Fetch,
    Build,
    Runtime,
    ContainerNotFound,
    Store,
    NotFound,
    InvalidState,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Validation(_) => DeployErrorKind::Validation,
            DeployError::Fetch(_) => DeployErrorKind::Fetch,
            DeployError::Build(_) => DeployErrorKind::Build,
            DeployError::Runtime(RuntimeError::ContainerNotFound(_)) => {
                DeployErrorKind::ContainerNotFound
            }
            DeployError::Runtime(_) => DeployErrorKind::Runtime,
            DeployError::Store(_) => DeployErrorKind::Store,
            DeployError::NotFound(_) => DeployErrorKind::NotFound,
            DeployError::InvalidState { .. } => DeployErrorKind::InvalidState,
        }
    }
}
