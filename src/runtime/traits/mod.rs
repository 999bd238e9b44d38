// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ContainerOps, and RuntimeInfo.

mod container;
mod image;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use image::{ImageError, ImageFilters, ImageOps, ImageSummary};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the deployment pipeline needs from a runtime.
pub trait DeployRuntime: ImageOps + ContainerOps {}

impl<T: ImageOps + ContainerOps> DeployRuntime for T {}
