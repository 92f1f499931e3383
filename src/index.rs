//! Strong-signal indices.
//!
//! One hash map per [`SignalKind`], from normalized signal value to the id
//! of the entity currently holding it. A hit is treated as an assertion of
//! identity; there is no threshold at this stage.

use std::collections::HashMap;

use tracing::trace;

use crate::entity::{Entity, EntityId};
use crate::signal::{strong_signals, SignalKind};

/// Per-kind lookup tables owned by one engine.
#[derive(Debug, Default, Clone)]
pub struct SignalIndex {
    maps: HashMap<SignalKind, HashMap<String, EntityId>>,
}

impl SignalIndex {
    /// Create an empty index set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity currently holding `key` for `kind`.
    #[must_use]
    pub fn get(&self, kind: SignalKind, key: &str) -> Option<&EntityId> {
        self.maps.get(&kind).and_then(|m| m.get(key))
    }

    /// All index hits for a record's strong signals, in lookup priority order.
    ///
    /// Callers that can observe stale ids should take the first live hit.
    #[must_use]
    pub fn probe(&self, record: &Entity, platform_domains: &[String]) -> Vec<(SignalKind, EntityId)> {
        strong_signals(record, platform_domains)
            .into_iter()
            .filter_map(|signal| {
                let hit = self.get(signal.kind, &signal.key)?;
                trace!(kind = %signal.kind, key = %signal.key, entity = %hit, "signal index hit");
                Some((signal.kind, hit.clone()))
            })
            .collect()
    }

    /// First index hit for a record, probing in lookup priority order.
    #[must_use]
    pub fn lookup(&self, record: &Entity, platform_domains: &[String]) -> Option<(SignalKind, EntityId)> {
        strong_signals(record, platform_domains)
            .into_iter()
            .find_map(|signal| {
                self.get(signal.kind, &signal.key)
                    .map(|id| (signal.kind, id.clone()))
            })
    }

    /// Points every strong signal on `entity` at its current id.
    ///
    /// Existing mappings for those values are overwritten. Returns the number
    /// of signals written.
    pub fn index(&mut self, entity: &Entity, platform_domains: &[String]) -> usize {
        let signals = strong_signals(entity, platform_domains);
        let written = signals.len();
        for signal in signals {
            self.maps
                .entry(signal.kind)
                .or_default()
                .insert(signal.key, entity.id().clone());
        }
        written
    }

    /// Number of signal values indexed for one kind.
    #[must_use]
    pub fn len_of(&self, kind: SignalKind) -> usize {
        self.maps.get(&kind).map_or(0, HashMap::len)
    }

    /// Total number of indexed signal values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.values().map(HashMap::len).sum()
    }

    /// Returns true if no signal is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_platform_domains;

    fn platforms() -> &'static [String] {
        default_platform_domains()
    }

    #[test]
    fn test_index_and_lookup_case_insensitive() {
        let mut index = SignalIndex::new();
        let entity = Entity::builder().github_username("AlexK").email("Alex@Example.com").build();
        assert_eq!(index.index(&entity, platforms()), 2);

        let probe = Entity::builder().github_username("alexk").build();
        let (kind, id) = index.lookup(&probe, platforms()).unwrap();
        assert_eq!(kind, SignalKind::GithubUsername);
        assert_eq!(id.as_str(), "gh:alexk");

        let probe = Entity::builder().email("ALEX@example.com").build();
        assert_eq!(index.lookup(&probe, platforms()).unwrap().0, SignalKind::Email);
    }

    #[test]
    fn test_lookup_priority_order() {
        let mut index = SignalIndex::new();
        let by_email = Entity::builder().email("alex@example.com").build();
        let by_handle = Entity::builder().github_username("alexk").build();
        index.index(&by_email, platforms());
        index.index(&by_handle, platforms());

        let probe = Entity::builder().email("alex@example.com").github_username("alexk").build();
        let (kind, id) = index.lookup(&probe, platforms()).unwrap();
        assert_eq!(kind, SignalKind::GithubUsername);
        assert_eq!(id, *by_handle.id());

        let hits = index.probe(&probe, platforms());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].1, *by_email.id());
    }

    #[test]
    fn test_platform_domains_are_not_indexed() {
        let mut index = SignalIndex::new();
        let entity = Entity::builder().github_username("a").website("https://medium.com/@a").build();
        index.index(&entity, platforms());
        assert_eq!(index.len_of(SignalKind::WebsiteDomain), 0);

        let entity = Entity::builder().github_username("b").website("https://b.dev").build();
        index.index(&entity, platforms());
        assert_eq!(index.len_of(SignalKind::WebsiteDomain), 1);
    }

    #[test]
    fn test_linkedin_is_indexed_by_profile_slug() {
        let mut index = SignalIndex::new();
        let entity = Entity::builder().linkedin_url("https://www.linkedin.com/in/Alex-Kim").build();
        index.index(&entity, platforms());
        assert!(index.get(SignalKind::LinkedinProfile, "alex-kim").is_some());
    }

    #[test]
    fn test_last_write_wins() {
        let mut index = SignalIndex::new();
        let mut entity = Entity::builder().email("alex@example.com").build();
        index.index(&entity, platforms());

        entity.github_username = Some("alexk".to_string());
        entity.refresh_id(platforms());
        index.index(&entity, platforms());

        assert_eq!(
            index.get(SignalKind::Email, "alex@example.com").unwrap().as_str(),
            "gh:alexk"
        );
    }
}
