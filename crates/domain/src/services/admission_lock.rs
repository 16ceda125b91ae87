//! Per-event admission locks.
//!
//! One async mutex per event id, created on first use and dropped again once
//! no submission holds or waits on it. Different events never contend.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::EventId;

/// Lock acquisition did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Timed out waiting for admission lock on event {0}")]
pub struct LockTimeout(pub EventId);

#[derive(Debug, Default, Clone)]
pub struct AdmissionLocks {
    locks: Arc<DashMap<EventId, Arc<Mutex<()>>>>,
}

impl AdmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `timeout` for exclusive admission rights on `event_id`.
    pub async fn acquire(
        &self,
        event_id: EventId,
        timeout: Duration,
    ) -> Result<AdmissionGuard, LockTimeout> {
        let mutex = self.locks.entry(event_id).or_default().clone();
        match tokio::time::timeout(timeout, mutex.lock_owned()).await {
            Ok(guard) => Ok(AdmissionGuard {
                guard: Some(guard),
                event_id,
                locks: Arc::clone(&self.locks),
            }),
            Err(_) => {
                self.prune(event_id);
                Err(LockTimeout(event_id))
            }
        }
    }

    /// Number of events with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn prune(&self, event_id: EventId) {
        prune_idle(&self.locks, event_id);
    }
}

// The map's own Arc is the only reference left once nobody holds or waits.
fn prune_idle(locks: &DashMap<EventId, Arc<Mutex<()>>>, event_id: EventId) {
    locks.remove_if(&event_id, |_, mutex| Arc::strong_count(mutex) == 1);
}

/// Held for the duration of one admission critical section.
#[derive(Debug)]
pub struct AdmissionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    event_id: EventId,
    locks: Arc<DashMap<EventId, Arc<Mutex<()>>>>,
}

impl AdmissionGuard {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        // Release the mutex before checking for idleness.
        drop(self.guard.take());
        prune_idle(&self.locks, self.event_id);
    }
}
