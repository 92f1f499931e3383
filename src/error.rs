//! Error types for candidate deduplication.
//!
//! Matching and merging are total over their inputs and never fail. Errors
//! only surface at the edges: configuration, location confidence values,
//! lock-guarded shared access, and the ingestion pipeline.

use thiserror::Error;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        value: f32,
    },

    #[error("Threshold '{name}' has value {value}, expected a value in [0.0, 1.0]")]
    ThresholdOutOfRange {
        name: &'static str,
        value: f64,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors that occur while driving a shared engine.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Poisoned lock: {context}")]
    PoisonedLock {
        context: &'static str,
    },

    #[error("Ingestion pipeline is closed")]
    PipelineClosed,

    #[error("Ingestion worker failed: {message}")]
    WorkerFailed {
        message: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DedupError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

/// Result type alias for deduplication operations.
pub type DedupResult<T> = Result<T, DedupError>;
