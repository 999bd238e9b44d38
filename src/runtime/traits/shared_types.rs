// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, RestartPolicyConfig, and BuildConfig.

use crate::types::ImageRef;
use std::collections::HashMap;

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Name for the container.
    pub name: String,
    /// Image to run.
    pub image: ImageRef,
    /// Environment variables.
    pub env: HashMap<String, String>,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
    /// Restart policy.
    pub restart_policy: RestartPolicyConfig,
}

/// Restart policy configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicyConfig {
    /// Never restart.
    No,
    /// Always restart.
    #[default]
    Always,
    /// Restart unless explicitly stopped.
    UnlessStopped,
    /// Restart on failure with optional max retries.
    OnFailure { max_retries: Option<u32> },
}

/// Input for an image build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Tag applied to the built image.
    pub tag: ImageRef,
    /// Tar archive of the build context.
    pub context: Vec<u8>,
    /// Path of the Dockerfile inside the context.
    pub dockerfile: String,
    /// Values for `ARG` instructions.
    pub build_args: HashMap<String, String>,
    /// Labels applied to the image.
    pub labels: HashMap<String, String>,
}
