//! Fuzzy matching over display names.
//!
//! Used only when no strong signal matched. A similar name alone is never
//! enough: every fuzzy match must be corroborated, either by a shared
//! identifier of the same kind or, for near-identical names, by a
//! cross-reference signal (shared website, shared demo host, or a handle
//! reused across platforms).

use std::collections::HashSet;
use std::fmt;

use crate::config::DedupConfig;
use crate::entity::Entity;
use crate::signal::{identity_domain, linkedin_profile, normalize_handle};
use crate::similarity::name_similarity;

/// Why a fuzzy match was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchReason {
    /// Similar name plus a shared identifier of the same kind.
    CommonIdentifier,
    /// Near-identical name plus a cross-reference signal.
    CrossReference,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommonIdentifier => write!(f, "common_identifier"),
            Self::CrossReference => write!(f, "cross_reference"),
        }
    }
}

/// A fuzzy match against the entity at `position` in the scanned slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    /// Index of the matched entity in the scanned slice.
    pub position: usize,
    /// Name similarity ratio of the match.
    pub similarity: f64,
    /// Which corroboration accepted it.
    pub reason: MatchReason,
}

fn same_handle(a: Option<&String>, b: Option<&String>) -> bool {
    match (a.and_then(|v| normalize_handle(v)), b.and_then(|v| normalize_handle(v))) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Returns true if both records carry the same identifier of the same kind.
///
/// Compares code-host, forum and social handles, email, and the
/// professional-network profile slug, case-insensitively.
#[must_use]
pub fn has_common_identifier(a: &Entity, b: &Entity) -> bool {
    if same_handle(a.github_username.as_ref(), b.github_username.as_ref())
        || same_handle(a.hn_username.as_ref(), b.hn_username.as_ref())
        || same_handle(a.twitter_handle.as_ref(), b.twitter_handle.as_ref())
        || same_handle(a.email.as_ref(), b.email.as_ref())
    {
        return true;
    }

    match (
        a.linkedin_url.as_deref().and_then(linkedin_profile),
        b.linkedin_url.as_deref().and_then(linkedin_profile),
    ) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn demo_domains(entity: &Entity, platform_domains: &[String]) -> HashSet<String> {
    entity
        .demo_urls
        .iter()
        .filter_map(|u| identity_domain(u, platform_domains))
        .collect()
}

fn cross_platform_handles(entity: &Entity) -> HashSet<String> {
    [&entity.github_username, &entity.hn_username, &entity.twitter_handle]
        .into_iter()
        .filter_map(|h| h.as_deref().and_then(normalize_handle))
        .collect()
}

/// Returns true if any cross-reference signal links the two records.
///
/// Signals: the same non-platform website host, overlapping demo hosts, or
/// a code-host / forum / social handle appearing on both records under any
/// of those platforms. One positive signal is sufficient.
#[must_use]
pub fn likely_same_person(a: &Entity, b: &Entity, platform_domains: &[String]) -> bool {
    let website = |e: &Entity| {
        e.website
            .as_deref()
            .and_then(|w| identity_domain(w, platform_domains))
    };
    if let (Some(x), Some(y)) = (website(a), website(b)) {
        if x == y {
            return true;
        }
    }

    let demos_a = demo_domains(a, platform_domains);
    if !demos_a.is_empty() && !demos_a.is_disjoint(&demo_domains(b, platform_domains)) {
        return true;
    }

    !cross_platform_handles(a).is_disjoint(&cross_platform_handles(b))
}

/// Name-based matcher configured by [`DedupConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher<'a> {
    config: &'a DedupConfig,
}

impl<'a> FuzzyMatcher<'a> {
    /// Creates a matcher over `config` thresholds.
    #[must_use]
    pub const fn new(config: &'a DedupConfig) -> Self {
        Self { config }
    }

    /// Finds the first entity in `entities` that `record` fuzzily matches.
    ///
    /// Scans in slice order, so the earliest-inserted candidate wins ties.
    /// The corroborated pass runs over every entity before the
    /// cross-reference pass starts. Records without a name never match.
    #[must_use]
    pub fn find(&self, record: &Entity, entities: &[Entity]) -> Option<FuzzyMatch> {
        let name = record.name.as_deref().filter(|n| !n.trim().is_empty())?;

        let scored: Vec<(usize, f64)> = entities
            .iter()
            .enumerate()
            .filter_map(|(position, existing)| {
                existing
                    .name
                    .as_deref()
                    .map(|other| (position, name_similarity(name, other)))
            })
            .collect();

        let corroborated = scored.iter().find(|&&(position, similarity)| {
            similarity > self.config.similarity_threshold
                && has_common_identifier(record, &entities[position])
        });
        if let Some(&(position, similarity)) = corroborated {
            return Some(FuzzyMatch {
                position,
                similarity,
                reason: MatchReason::CommonIdentifier,
            });
        }

        if name.trim().chars().count() <= self.config.cross_reference_min_name_len {
            return None;
        }

        scored
            .iter()
            .find(|&&(position, similarity)| {
                similarity > self.config.cross_reference_threshold
                    && likely_same_person(record, &entities[position], &self.config.platform_domains)
            })
            .map(|&(position, similarity)| FuzzyMatch {
                position,
                similarity,
                reason: MatchReason::CrossReference,
            })
    }
}
