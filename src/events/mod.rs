// ABOUTME: Progress notifications for deployments, published per owner channel.
// ABOUTME: The EventBus seam plus broadcast and tracing implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::deploy::{Deployment, DeploymentStatus};
use crate::types::{DeploymentId, OwnerId};

/// A notification about one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeploymentEvent {
    #[serde(rename_all = "camelCase")]
    DeploymentUpdate {
        deployment_id: DeploymentId,
        status: DeploymentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        logs: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    DeploymentRemoved { deployment_id: DeploymentId },
}

impl DeploymentEvent {
    /// Status update for `deployment`. Logs are attached only on failure.
    pub fn update(deployment: &Deployment) -> Self {
        let logs = match deployment.status {
            DeploymentStatus::Failed => deployment.logs.clone(),
            _ => None,
        };
        DeploymentEvent::DeploymentUpdate {
            deployment_id: deployment.id.clone(),
            status: deployment.status,
            logs,
            updated_at: Some(deployment.updated_at),
        }
    }

    pub fn removed(id: &DeploymentId) -> Self {
        DeploymentEvent::DeploymentRemoved {
            deployment_id: id.clone(),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            DeploymentEvent::DeploymentUpdate { .. } => "deployment_update",
            DeploymentEvent::DeploymentRemoved { .. } => "deployment_removed",
        }
    }

    pub fn deployment_id(&self) -> &DeploymentId {
        match self {
            DeploymentEvent::DeploymentUpdate { deployment_id, .. }
            | DeploymentEvent::DeploymentRemoved { deployment_id } => deployment_id,
        }
    }
}

/// Errors from publishing an event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event channel closed")]
    Closed,

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Delivers events to whoever listens on an owner's channel.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, channel: &OwnerId, event: DeploymentEvent) -> Result<(), EventError>;
}

/// An event together with the channel it was published on.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub channel: OwnerId,
    pub event: DeploymentEvent,
}

/// In-process fan-out over a tokio broadcast channel.
///
/// Publishing with no subscribers succeeds; slow subscribers may lag and
/// miss events.
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for BroadcastBus {
    async fn publish(&self, channel: &OwnerId, event: DeploymentEvent) -> Result<(), EventError> {
        // An error only means nobody is subscribed right now
        let _ = self.tx.send(Envelope {
            channel: channel.clone(),
            event,
        });
        Ok(())
    }
}

/// Writes every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBus;

#[async_trait]
impl EventBus for TracingBus {
    async fn publish(&self, channel: &OwnerId, event: DeploymentEvent) -> Result<(), EventError> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(
            target: "skiff::events",
            channel = %channel,
            event = event.name(),
            deployment = %event.deployment_id(),
            "{}",
            payload
        );
        Ok(())
    }
}
