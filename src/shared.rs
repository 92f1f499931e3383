//! Lock-guarded engine for ingestion from several threads.
//!
//! Lookup and merge must happen in one critical section, otherwise two
//! concurrent records carrying the same unclaimed signal would both create
//! an entity. Every operation here takes the single engine lock once.

use std::sync::{Mutex, MutexGuard};

use crate::config::DedupConfig;
use crate::engine::{AddOutcome, DedupStats, Deduplicator};
use crate::entity::{Entity, EntityId};
use crate::error::{DedupResult, ExecutionError};

fn lock_err(context: &'static str) -> ExecutionError {
    ExecutionError::PoisonedLock { context }
}

/// Thread-safe wrapper around [`Deduplicator`].
#[derive(Debug, Default)]
pub struct SharedDeduplicator {
    inner: Mutex<Deduplicator>,
}

impl SharedDeduplicator {
    /// Create a shared engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared engine with a custom configuration.
    ///
    /// # Errors
    /// Returns a validation error if the configuration is invalid.
    pub fn with_config(config: DedupConfig) -> DedupResult<Self> {
        Ok(Self::from_engine(Deduplicator::with_config(config)?))
    }

    /// Wrap an existing engine.
    #[must_use]
    pub fn from_engine(engine: Deduplicator) -> Self {
        Self {
            inner: Mutex::new(engine),
        }
    }

    fn lock(&self, context: &'static str) -> Result<MutexGuard<'_, Deduplicator>, ExecutionError> {
        self.inner.lock().map_err(|_| lock_err(context))
    }

    /// Adds one record atomically and returns a copy of the resulting entity.
    ///
    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn add(&self, record: Entity) -> DedupResult<Entity> {
        let mut engine = self.lock("shared.add")?;
        Ok(engine.add(record).clone())
    }

    /// Like [`add`](Self::add), also reporting how the record was absorbed.
    ///
    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn add_with_outcome(&self, record: Entity) -> DedupResult<(AddOutcome, Entity)> {
        let mut engine = self.lock("shared.add_with_outcome")?;
        let (outcome, entity) = engine.add_with_outcome(record);
        Ok((outcome, entity.clone()))
    }

    /// Snapshot of all tracked entities.
    ///
    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn get_all(&self) -> DedupResult<Vec<Entity>> {
        Ok(self.lock("shared.get_all")?.get_all())
    }

    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn get(&self, id: &EntityId) -> DedupResult<Option<Entity>> {
        Ok(self.lock("shared.get")?.get(id).cloned())
    }

    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn count(&self) -> DedupResult<usize> {
        Ok(self.lock("shared.count")?.count())
    }

    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn stats(&self) -> DedupResult<DedupStats> {
        Ok(*self.lock("shared.stats")?.stats())
    }

    /// Runs the offline reconciliation pass under the lock.
    ///
    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn reconcile(&self) -> DedupResult<usize> {
        Ok(self.lock("shared.reconcile")?.reconcile())
    }

    /// Unwraps the engine.
    ///
    /// # Errors
    /// Returns `PoisonedLock` if another thread panicked while holding the lock.
    pub fn into_inner(self) -> DedupResult<Deduplicator> {
        self.inner
            .into_inner()
            .map_err(|_| lock_err("shared.into_inner").into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_concurrent_adds_share_one_entity_per_signal() {
        let shared = Arc::new(SharedDeduplicator::new());
        let mut handles = Vec::new();
        for t in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    let record = Entity::builder()
                        .github_username(format!("user{i}"))
                        .source(format!("connector{t}"))
                        .build();
                    shared.add(record).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(shared.count().unwrap(), 50);
        let stats = shared.stats().unwrap();
        assert_eq!(stats.records_added, 400);
        assert_eq!(stats.entities_created, 50);
        assert_eq!(stats.strong_merges, 350);

        let user0 = shared.get(&EntityId::from("gh:user0")).unwrap().unwrap();
        assert_eq!(user0.sources.len(), 8);
    }

    #[test]
    fn test_add_with_outcome_returns_copy() {
        let shared = SharedDeduplicator::new();
        let (outcome, entity) = shared
            .add_with_outcome(Entity::builder().hn_username("pg").build())
            .unwrap();
        assert_eq!(outcome, AddOutcome::Created);
        assert_eq!(entity.id().as_str(), "hn:pg");

        let engine = shared.into_inner().unwrap();
        assert_eq!(engine.count(), 1);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = DedupConfig::default().with_cross_reference_threshold(7.0);
        assert!(SharedDeduplicator::with_config(config).is_err());
    }
}
