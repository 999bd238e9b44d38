// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod branch;
mod env_key;
mod id;
mod image_ref;
mod repo_url;
mod validation;

pub use branch::BranchName;
pub use env_key::{parse_env_pair, validate_env, validate_env_key};
pub use id::{ContainerId, DeploymentId, Id, ImageId, OwnerId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use repo_url::RepoUrl;
pub use validation::ValidationError;
