// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Build from a tar context, list, and remove images.

use super::sealed::Sealed;
use super::shared_types::BuildConfig;
use crate::types::ImageId;
use async_trait::async_trait;
use std::collections::HashMap;

/// Image operations: build, list, remove.
#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Build an image from a tar build context and tag it.
    ///
    /// Resolves only when the build has finished; a failing build step
    /// is reported as `ImageError::BuildFailed`.
    async fn build_image(&self, config: &BuildConfig) -> Result<(), ImageError>;

    /// List images matching the given filters.
    async fn list_images(&self, filters: &ImageFilters) -> Result<Vec<ImageSummary>, ImageError>;

    /// Remove an image by tag or id.
    async fn remove_image(&self, reference: &str, force: bool) -> Result<(), ImageError>;
}

/// Filters for listing images.
#[derive(Debug, Clone, Default)]
pub struct ImageFilters {
    /// Match by `repository[:tag]`.
    pub reference: Option<String>,
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
}

/// Summary information about an image.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub id: ImageId,
    pub tags: Vec<String>,
    pub labels: HashMap<String, String>,
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
