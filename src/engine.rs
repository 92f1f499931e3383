//! Online deduplication engine.
//!
//! The [`Deduplicator`] owns the tracked entities, the strong-signal
//! indices and the configuration. Each [`Deduplicator::add`] call either
//! merges the record into exactly one tracked entity or starts tracking it
//! as a new one. Decisions are never revisited: two tracked entities are
//! only ever combined by the explicit, offline [`Deduplicator::reconcile`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::DedupConfig;
use crate::entity::{Entity, EntityId};
use crate::error::DedupResult;
use crate::index::SignalIndex;
use crate::matcher::{FuzzyMatcher, MatchReason};
use crate::merge::merge_into;
use crate::signal::{strong_signals, SignalKind};

/// Counters describing what the engine has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    /// Records passed to `add`.
    pub records_added: u64,
    /// Merges decided by a strong-signal index hit.
    pub strong_merges: u64,
    /// Name matches corroborated by a same-kind identifier.
    pub fuzzy_merges: u64,
    /// Near-identical names corroborated by a cross-reference signal.
    pub cross_reference_merges: u64,
    /// Records that started a new entity.
    pub entities_created: u64,
    /// Derived ids that clashed with another live entity and got a suffix.
    pub id_collisions: u64,
}

impl DedupStats {
    /// Total number of records merged into an existing entity.
    #[must_use]
    pub const fn merges(&self) -> u64 {
        self.strong_merges + self.fuzzy_merges + self.cross_reference_merges
    }
}

/// How a record was absorbed by [`Deduplicator::add_with_outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// No match; the record is now tracked as a new entity.
    Created,
    /// Merged on a strong-signal index hit of the given kind.
    MergedBySignal(SignalKind),
    /// Merged on a corroborated name match.
    MergedByName(MatchReason),
}

impl AddOutcome {
    /// Returns true unless the record created a new entity.
    #[must_use]
    pub const fn is_merge(&self) -> bool {
        !matches!(self, Self::Created)
    }
}

/// Incremental, order-dependent identity resolution over candidate records.
///
/// Entities are kept in first-observation order, which is also the order
/// fuzzy matching scans them in.
///
/// # Examples
///
/// ```
/// use candidate_dedup::{Deduplicator, Entity};
///
/// let mut dedup = Deduplicator::new();
/// dedup.add(Entity::builder().github_username("alexk").name("Alex Kim").build());
/// dedup.add(Entity::builder().github_username("AlexK").source("hn").build());
/// assert_eq!(dedup.count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DedupConfig,
    entities: Vec<Entity>,
    slots: HashMap<EntityId, usize>,
    index: SignalIndex,
    stats: DedupStats,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(DedupConfig::default())
    }

    /// Creates an engine with a custom configuration.
    ///
    /// # Errors
    /// Returns a validation error if the configuration is invalid.
    pub fn with_config(config: DedupConfig) -> DedupResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config))
    }

    fn from_parts(config: DedupConfig) -> Self {
        Self {
            config,
            entities: Vec::new(),
            slots: HashMap::new(),
            index: SignalIndex::new(),
            stats: DedupStats::default(),
        }
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub const fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Adds one observation and returns the entity it ended up in.
    pub fn add(&mut self, record: Entity) -> &Entity {
        self.add_with_outcome(record).1
    }

    /// Adds one observation and reports how it was absorbed.
    pub fn add_with_outcome(&mut self, mut record: Entity) -> (AddOutcome, &Entity) {
        record.normalize_fields();
        record.refresh_id(&self.config.platform_domains);
        self.stats.records_added += 1;

        if let Some((slot, kind)) = self.find_by_signal(&record) {
            self.stats.strong_merges += 1;
            self.merge_at(slot, record, AddOutcome::MergedBySignal(kind));
            return (AddOutcome::MergedBySignal(kind), &self.entities[slot]);
        }

        if let Some(found) = FuzzyMatcher::new(&self.config).find(&record, &self.entities) {
            match found.reason {
                MatchReason::CommonIdentifier => self.stats.fuzzy_merges += 1,
                MatchReason::CrossReference => self.stats.cross_reference_merges += 1,
            }
            trace!(similarity = found.similarity, reason = %found.reason, "fuzzy name match");
            let outcome = AddOutcome::MergedByName(found.reason);
            self.merge_at(found.position, record, outcome);
            return (outcome, &self.entities[found.position]);
        }

        let slot = self.insert_new(record);
        (AddOutcome::Created, &self.entities[slot])
    }

    /// Snapshot of all tracked entities in first-observation order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    /// Borrowing iterator over tracked entities in first-observation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing is tracked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks up a tracked entity by its current id.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.slots.get(id).map(|&slot| &self.entities[slot])
    }

    /// Counters since construction.
    #[must_use]
    pub const fn stats(&self) -> &DedupStats {
        &self.stats
    }

    /// Read access to the strong-signal indices.
    #[must_use]
    pub const fn signal_index(&self) -> &SignalIndex {
        &self.index
    }

    /// Consumes the engine and returns the tracked entities.
    #[must_use]
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }

    /// First live index hit, skipping entries whose id is no longer tracked.
    fn find_by_signal(&self, record: &Entity) -> Option<(usize, SignalKind)> {
        for (kind, id) in self.index.probe(record, &self.config.platform_domains) {
            match self.slots.get(&id) {
                Some(&slot) => return Some((slot, kind)),
                None => trace!(kind = %kind, entity = %id, "stale index entry"),
            }
        }
        None
    }

    fn merge_at(&mut self, slot: usize, record: Entity, outcome: AddOutcome) {
        let old_id = self.entities[slot].id().clone();
        let incoming_id = record.id().clone();
        let report = merge_into(&mut self.entities[slot], record);
        if report.filled_identity() {
            self.reassign_id(slot, &old_id);
        }
        self.index
            .index(&self.entities[slot], &self.config.platform_domains);

        let entity = &self.entities[slot];
        debug!(
            outcome = ?outcome,
            incoming = %incoming_id,
            previous = %old_id,
            entity = %entity.id(),
            filled = ?report.filled,
            evidence_added = report.evidence_added,
            "merged record"
        );
    }

    fn insert_new(&mut self, mut record: Entity) -> usize {
        let slot = self.entities.len();
        let id = self.unique_id(record.id().clone(), None);
        if &id != record.id() {
            record.set_id(id.clone());
        }
        self.index.index(&record, &self.config.platform_domains);
        self.slots.insert(id, slot);
        self.stats.entities_created += 1;
        debug!(entity = %record.id(), slot, "tracking new entity");
        self.entities.push(record);
        slot
    }

    /// Recomputes the id of the entity at `slot` after its fields changed.
    fn reassign_id(&mut self, slot: usize, old_id: &EntityId) {
        let Some(derived) = self.entities[slot].derive_id(&self.config.platform_domains) else {
            return;
        };
        let id = self.unique_id(derived, Some(slot));
        if &id == old_id {
            return;
        }
        self.slots.remove(old_id);
        self.slots.insert(id.clone(), slot);
        self.entities[slot].set_id(id);
    }

    /// Returns `candidate`, or the first `candidate~N` not held by another entity.
    fn unique_id(&mut self, candidate: EntityId, owner: Option<usize>) -> EntityId {
        let free = |slots: &HashMap<EntityId, usize>, id: &EntityId| {
            slots.get(id).map_or(true, |&held| Some(held) == owner)
        };
        if free(&self.slots, &candidate) {
            return candidate;
        }

        self.stats.id_collisions += 1;
        let mut n = 2;
        loop {
            let next = candidate.with_suffix(n);
            if free(&self.slots, &next) {
                warn!(id = %candidate, assigned = %next, "entity id collision");
                return next;
            }
            n += 1;
        }
    }

    /// Offline pass merging tracked entities that share a strong signal.
    ///
    /// Later entities are folded into the earliest one they share a signal
    /// with, then ids and indices are rebuilt. This is never run by
    /// [`add`](Self::add); online resolution does not bridge entities
    /// retroactively. Returns the number of entities absorbed.
    pub fn reconcile(&mut self) -> usize {
        let platforms = self.config.platform_domains.clone();
        let mut absorbed = 0;

        let mut i = 0;
        while i < self.entities.len() {
            let mut j = i + 1;
            while j < self.entities.len() {
                if shares_strong_signal(&self.entities[i], &self.entities[j], &platforms) {
                    let other = self.entities.remove(j);
                    debug!(into = %self.entities[i].id(), from = %other.id(), "reconciling entities");
                    merge_into(&mut self.entities[i], other);
                    absorbed += 1;
                    // The survivor may have gained signals; rescan.
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        if absorbed > 0 {
            self.rebuild();
        }
        absorbed
    }

    fn rebuild(&mut self) {
        self.slots.clear();
        self.index = SignalIndex::new();
        for slot in 0..self.entities.len() {
            let derived = self.entities[slot]
                .derive_id(&self.config.platform_domains)
                .unwrap_or_else(|| self.entities[slot].id().clone());
            let id = self.unique_id(derived, Some(slot));
            self.entities[slot].set_id(id.clone());
            self.slots.insert(id, slot);
            self.index
                .index(&self.entities[slot], &self.config.platform_domains);
        }
    }
}

fn shares_strong_signal(a: &Entity, b: &Entity, platform_domains: &[String]) -> bool {
    let left: HashSet<_> = strong_signals(a, platform_domains).into_iter().collect();
    strong_signals(b, platform_domains)
        .iter()
        .any(|signal| left.contains(signal))
}
