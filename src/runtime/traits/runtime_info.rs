// ABOUTME: Runtime info trait for container runtimes.
// ABOUTME: Connectivity check against the connected daemon.

use super::sealed::Sealed;
use async_trait::async_trait;
use std::time::Duration;

/// Runtime connectivity operations.
#[async_trait]
pub trait RuntimeInfo: Sealed + Send + Sync {
    /// Ping the runtime, returning the round-trip time.
    async fn ping(&self) -> Result<Duration, RuntimeInfoError>;
}

/// Errors from runtime info operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
