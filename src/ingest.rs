//! Bounded ingestion pipeline.
//!
//! Source connectors run on their own threads and push records into a
//! bounded queue. A single consumer thread drains the queue through the
//! shared engine, so records are still resolved one at a time and a slow
//! engine applies backpressure to the connectors.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{info, warn};

use crate::engine::DedupStats;
use crate::entity::Entity;
use crate::error::{DedupResult, ExecutionError};
use crate::shared::SharedDeduplicator;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum number of queued records.
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

/// Cloneable handle a connector uses to submit records.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: Sender<Entity>,
}

impl RecordSender {
    /// Queues a record, blocking while the queue is full.
    ///
    /// # Errors
    /// Returns `PipelineClosed` if the consumer has stopped.
    pub fn send(&self, record: Entity) -> Result<(), ExecutionError> {
        self.tx.send(record).map_err(|_| ExecutionError::PipelineClosed)
    }

    /// Queues a record without blocking.
    ///
    /// Returns the record back if the queue is full.
    ///
    /// # Errors
    /// Returns `PipelineClosed` if the consumer has stopped.
    pub fn try_send(&self, record: Entity) -> Result<Option<Entity>, ExecutionError> {
        match self.tx.try_send(record) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(record)) => Ok(Some(record)),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::PipelineClosed),
        }
    }
}

/// Running ingestion pipeline feeding one shared engine.
pub struct Ingestor {
    tx: Sender<Entity>,
    worker: JoinHandle<DedupResult<u64>>,
    engine: Arc<SharedDeduplicator>,
}

impl Ingestor {
    /// Starts the consumer thread.
    ///
    /// # Errors
    /// Returns `WorkerFailed` if the consumer thread cannot be spawned.
    pub fn start(engine: Arc<SharedDeduplicator>, config: &IngestConfig) -> DedupResult<Self> {
        let (tx, rx) = bounded::<Entity>(config.queue_capacity.max(1));
        let consumer = Arc::clone(&engine);
        let worker = thread::Builder::new()
            .name("candidate-dedup-ingest".to_string())
            .spawn(move || drain(&rx, &consumer))
            .map_err(|e| ExecutionError::WorkerFailed {
                message: e.to_string(),
            })?;
        Ok(Self { tx, worker, engine })
    }

    /// A new sender handle for one connector.
    #[must_use]
    pub fn sender(&self) -> RecordSender {
        RecordSender {
            tx: self.tx.clone(),
        }
    }

    /// The engine records are drained into.
    #[must_use]
    pub fn engine(&self) -> &Arc<SharedDeduplicator> {
        &self.engine
    }

    /// Closes the queue, waits for queued records to drain and returns stats.
    ///
    /// Connector threads must drop their senders first, or this blocks.
    ///
    /// # Errors
    /// Returns the consumer's error, or `WorkerFailed` if it panicked.
    pub fn finish(self) -> DedupResult<DedupStats> {
        drop(self.tx);
        let drained = self
            .worker
            .join()
            .map_err(|_| ExecutionError::WorkerFailed {
                message: "ingest worker panicked".to_string(),
            })??;
        let stats = self.engine.stats()?;
        info!(
            drained,
            entities = stats.entities_created,
            merges = stats.merges(),
            "ingestion finished"
        );
        Ok(stats)
    }
}

fn drain(rx: &Receiver<Entity>, engine: &SharedDeduplicator) -> DedupResult<u64> {
    let mut drained = 0u64;
    for record in rx {
        if let Err(err) = engine.add(record) {
            warn!(error = %err, drained, "ingest worker stopping");
            return Err(err);
        }
        drained += 1;
    }
    Ok(drained)
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("queued", &self.tx.len())
            .finish_non_exhaustive()
    }
}
