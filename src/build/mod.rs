// ABOUTME: Image building from a cloned workspace.
// ABOUTME: Dockerfile synthesis, build context packing, and the ImageBuilder stage.

mod builder;
mod context;
mod descriptor;

pub use builder::ImageBuilder;
pub use context::pack_workspace;
pub use descriptor::{DOCKERFILE, DescriptorSpec, synthesize_dockerfile};

use std::time::Duration;

use crate::runtime::ImageError;

/// Errors from building a deployment image.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to write build descriptor: {0}")]
    Descriptor(std::io::Error),

    #[error("failed to pack build context: {0}")]
    Context(std::io::Error),

    #[error("invalid image tag {tag}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("image build failed: {0}")]
    Failed(String),

    #[error("image build error: {0}")]
    Runtime(ImageError),

    #[error("image build timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<ImageError> for BuildError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::BuildFailed(message) => BuildError::Failed(message),
            other => BuildError::Runtime(other),
        }
    }
}
