// ABOUTME: Deployment orchestration: records, status machine, and the lifecycle manager.
// ABOUTME: Also hosts the container controller, cleanup, naming, and per-id locks.

mod cleanup;
mod controller;
mod deployment;
mod error;
mod lifecycle;
mod lock;
pub mod naming;
mod state;

pub use cleanup::{Cleanup, CleanupReport};
pub use controller::{ContainerController, ControllerSettings, StopOutcome};
pub use deployment::{DeployRequest, DeployUpdate, Deployment, NewDeployment};
pub use error::{CleanupError, DeployError, DeployErrorKind, RuntimeError};
pub use lifecycle::{LifecycleManager, Teardown};
pub use lock::{DeployGuard, DeployLocks};
pub use state::DeploymentStatus;
