//! Per-entity mutual exclusion for read-modify-write cycles.
#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use heatmap_core::{EntityId, EntityKind};

use crate::MetricError;

type LockKey = (EntityKind, EntityId);

/// Table of entities currently being updated.
///
/// Only held keys are stored; releasing a key removes it, so the table never
/// grows beyond the number of in-flight updates.
#[derive(Debug, Default)]
pub(crate) struct EntityLocks {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
}

impl EntityLocks {
    /// Block until no other caller holds `(kind, id)`, then claim it.
    pub(crate) fn acquire(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<EntityLockGuard<'_>, MetricError> {
        let key = (kind, id.clone());
        let mut held = self.held.lock().map_err(|_| MetricError::LockPoisoned)?;
        while held.contains(&key) {
            held = self
                .released
                .wait(held)
                .map_err(|_| MetricError::LockPoisoned)?;
        }
        held.insert(key.clone());
        Ok(EntityLockGuard { locks: self, key })
    }

    fn release(&self, key: &LockKey) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(key);
        drop(held);
        self.released.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn held_count(&self) -> usize {
        self.held
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().len(), |held| held.len())
    }
}

/// Releases its entity when dropped.
#[derive(Debug)]
pub(crate) struct EntityLockGuard<'a> {
    locks: &'a EntityLocks,
    key: LockKey,
}

impl Drop for EntityLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}
