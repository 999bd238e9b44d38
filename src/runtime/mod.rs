// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Capability traits, local socket detection, and the bollard and mock runtimes.

mod bollard;
mod detection;
mod error;
pub mod mock;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, HostProbe, detect_runtime, detect_with};
pub use error::{ConnectError, ConnectErrorKind};
pub use mock::{MockCall, MockContainer, MockOp, MockRuntime};
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeSocket, RuntimeType};
