//! # candidate-dedup - online identity resolution for candidate records
//!
//! Candidate records arrive one at a time from many independent sources
//! (code-hosting profiles, forum posts, search results, social posts). This
//! crate decides, incrementally and without a global view, which records
//! describe the same person and merges them into one authoritative entity.
//!
//! ## Core Concepts
//!
//! - **Entity**: one candidate; both a single observation and the merged view
//! - **Strong signal**: a handle, email, profile slug or website host treated
//!   as a near-unique identifier and indexed for O(1) lookup
//! - **Fuzzy match**: a similar display name, accepted only with a
//!   corroborating shared identifier or cross-reference signal
//! - **Merge**: the deterministic, field-level combination of two records
//!
//! ## Usage
//!
//! ```
//! use candidate_dedup::{Deduplicator, Entity};
//!
//! let mut dedup = Deduplicator::new();
//! dedup.add(
//!     Entity::builder()
//!         .github_username("alexk")
//!         .name("Alex Kim")
//!         .website("alexkim.dev")
//!         .build(),
//! );
//! dedup.add(Entity::builder().name("Alex Kim").website("alexkim.dev").build());
//!
//! assert_eq!(dedup.count(), 1);
//! let alex = &dedup.get_all()[0];
//! assert_eq!(alex.github_username.as_deref(), Some("alexk"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Records and signals
pub mod config;
pub mod entity;
pub mod error;
pub mod location;
pub mod signal;
pub mod similarity;

// Resolution
pub mod engine;
pub mod index;
pub mod matcher;
pub mod merge;

// Concurrent ingestion
pub mod ingest;
pub mod shared;

// Re-export primary types at crate root for convenience
pub use config::{default_platform_domains, DedupConfig};
pub use engine::{AddOutcome, DedupStats, Deduplicator};
pub use entity::{Entity, EntityBuilder, EntityId, Evidence};
pub use error::{DedupError, DedupResult, ExecutionError, ValidationError};
pub use index::SignalIndex;
pub use ingest::{IngestConfig, Ingestor, RecordSender};
pub use location::{resolve_location, CountryBucket, Location, LocationClassifier, MetroBucket};
pub use matcher::{has_common_identifier, likely_same_person, FuzzyMatch, FuzzyMatcher, MatchReason};
pub use merge::{merge_into, MergeReport};
pub use shared::SharedDeduplicator;
pub use signal::{Signal, SignalKind};
pub use similarity::name_similarity;
