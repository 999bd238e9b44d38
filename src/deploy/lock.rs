// ABOUTME: Per-deployment locks serializing operations on the same deployment id.
// ABOUTME: Different ids proceed in parallel; idle entries are pruned on release.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::DeploymentId;

type LockTable = Arc<Mutex<HashMap<DeploymentId, Arc<AsyncMutex<()>>>>>;

/// Hands out one exclusive guard per deployment id at a time.
#[derive(Debug, Clone, Default)]
pub struct DeployLocks {
    table: LockTable,
}

/// Exclusive hold on one deployment id; released on drop.
pub struct DeployGuard {
    id: DeploymentId,
    acquired_at: Instant,
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl std::fmt::Debug for DeployGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployGuard")
            .field("id", &self.id)
            .field("held_for", &self.acquired_at.elapsed())
            .finish()
    }
}

impl DeployLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &DeploymentId) -> Arc<AsyncMutex<()>> {
        self.table
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait until no other operation holds `id`, then hold it.
    pub async fn acquire(&self, id: &DeploymentId) -> DeployGuard {
        let mutex = self.entry(id);
        if mutex.try_lock().is_err() {
            tracing::debug!(deployment = %id, "waiting for in-flight operation");
        }
        let guard = mutex.lock_owned().await;
        self.guard(id, guard)
    }

    /// Hold `id` only if nothing else does right now.
    pub fn try_acquire(&self, id: &DeploymentId) -> Option<DeployGuard> {
        let guard = self.entry(id).try_lock_owned().ok()?;
        Some(self.guard(id, guard))
    }

    pub fn is_locked(&self, id: &DeploymentId) -> bool {
        self.table
            .lock()
            .get(id)
            .is_some_and(|m| m.try_lock().is_err())
    }

    /// Number of ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(&self, id: &DeploymentId, guard: OwnedMutexGuard<()>) -> DeployGuard {
        DeployGuard {
            id: id.clone(),
            acquired_at: Instant::now(),
            guard: Some(guard),
            table: self.table.clone(),
        }
    }
}

impl DeployGuard {
    pub fn id(&self) -> &DeploymentId {
        &self.id
    }
}

impl Drop for DeployGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.table.lock();
        // Only the table still references the mutex: nobody holds or waits.
        if let Some(mutex) = table.get(&self.id)
            && Arc::strong_count(mutex) == 1
        {
            table.remove(&self.id);
        }
    }
}
