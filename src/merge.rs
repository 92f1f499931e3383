//! Field-level merge policy.
//!
//! Merging is total: every pair of records combines without error. The
//! rules per field group are:
//! - single-valued fields keep the existing value and only fill gaps; the
//!   bio also takes a strictly longer incoming text
//! - the location group is replaced whole, and only on strictly greater
//!   confidence
//! - URL sets and source tags are unioned; evidence is appended
//! - counters take the max; `last_activity` takes the later timestamp
//!
//! The entity id is not touched here. The engine recomputes it after the
//! merge because keeping ids unique needs the live entity set.

use crate::entity::Entity;

/// What a merge changed on the target entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Single-valued fields that were empty and got filled.
    pub filled: Vec<&'static str>,
    /// The bio was replaced by longer text.
    pub bio_replaced: bool,
    /// The location group was replaced.
    pub location_replaced: bool,
    /// Evidence snippets appended.
    pub evidence_added: usize,
    /// Source tags not seen before.
    pub sources_added: usize,
}

impl MergeReport {
    /// Returns true if the merge filled a field the entity id derives from.
    ///
    /// When false, the merged entity keeps its current id.
    #[must_use]
    pub fn filled_identity(&self) -> bool {
        self.filled.iter().any(|f| {
            matches!(
                *f,
                "github_username" | "hn_username" | "reddit_username" | "email" | "website" | "name"
            )
        })
    }
}

fn fill(
    report: &mut MergeReport,
    name: &'static str,
    target: &mut Option<String>,
    incoming: Option<String>,
) {
    if target.is_none() {
        if let Some(value) = incoming {
            *target = Some(value);
            report.filled.push(name);
        }
    }
}

/// Later of two optional ISO-8601 timestamps; `None` sorts first.
fn later(current: Option<String>, incoming: Option<String>) -> Option<String> {
    match (current, incoming) {
        (Some(a), Some(b)) => Some(if b > a { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Merges `incoming` into `existing` and bumps the existing entity's version.
pub fn merge_into(existing: &mut Entity, mut incoming: Entity) -> MergeReport {
    incoming.normalize_fields();
    let mut report = MergeReport::default();

    fill(&mut report, "name", &mut existing.name, incoming.name);
    fill(&mut report, "github_username", &mut existing.github_username, incoming.github_username);
    fill(&mut report, "hn_username", &mut existing.hn_username, incoming.hn_username);
    fill(&mut report, "reddit_username", &mut existing.reddit_username, incoming.reddit_username);
    fill(&mut report, "email", &mut existing.email, incoming.email);
    fill(&mut report, "linkedin_url", &mut existing.linkedin_url, incoming.linkedin_url);
    fill(&mut report, "twitter_handle", &mut existing.twitter_handle, incoming.twitter_handle);
    fill(&mut report, "github_url", &mut existing.github_url, incoming.github_url);
    fill(&mut report, "website", &mut existing.website, incoming.website);

    if let Some(bio) = incoming.bio {
        let richer = existing
            .bio
            .as_ref()
            .map_or(true, |current| bio.chars().count() > current.chars().count());
        if richer {
            existing.bio = Some(bio);
            report.bio_replaced = true;
        }
    }

    if let Some(location) = incoming.location {
        if location.supersedes(existing.location.as_ref()) {
            existing.location = Some(location);
            report.location_replaced = true;
        }
    }

    existing.demo_urls.extend(incoming.demo_urls);
    existing.source_urls.extend(incoming.source_urls);

    let before = existing.sources.len();
    existing.sources.extend(incoming.sources);
    report.sources_added = existing.sources.len() - before;

    report.evidence_added = incoming.evidence.len();
    existing.evidence.extend(incoming.evidence);

    existing.stars_total = existing.stars_total.max(incoming.stars_total);
    existing.repo_count = existing.repo_count.max(incoming.repo_count);

    existing.last_activity = later(existing.last_activity.take(), incoming.last_activity);
    existing.created_at = existing.created_at.min(incoming.created_at);

    existing.touch();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Evidence;
    use crate::location::{Location, MetroBucket};

    #[test]
    fn test_single_valued_fields_fill_gaps_only() {
        let mut existing = Entity::builder().github_username("alexk").name("Alex Kim").build();
        let incoming = Entity::builder()
            .github_username("someone-else")
            .name("A. Kim")
            .email("alex@example.com")
            .build();

        let report = merge_into(&mut existing, incoming);
        assert_eq!(existing.github_username.as_deref(), Some("alexk"));
        assert_eq!(existing.name.as_deref(), Some("Alex Kim"));
        assert_eq!(existing.email.as_deref(), Some("alex@example.com"));
        assert_eq!(report.filled, vec!["email"]);
        assert!(report.filled_identity());
    }

    #[test]
    fn test_social_fields_do_not_count_as_identity() {
        let mut existing = Entity::builder().github_username("alexk").build();
        let report = merge_into(
            &mut existing,
            Entity::builder()
                .twitter_handle("alexk")
                .linkedin_url("https://linkedin.com/in/alexk")
                .build(),
        );
        assert_eq!(report.filled, vec!["linkedin_url", "twitter_handle"]);
        assert!(!report.filled_identity());
    }

    #[test]
    fn test_bio_prefers_longer_text() {
        let mut existing = Entity::builder().bio("builder").build();
        merge_into(&mut existing, Entity::builder().bio("short").build());
        assert_eq!(existing.bio.as_deref(), Some("builder"));

        let report = merge_into(&mut existing, Entity::builder().bio("builder of agents").build());
        assert!(report.bio_replaced);
        assert_eq!(existing.bio.as_deref(), Some("builder of agents"));

        let mut empty = Entity::new();
        merge_into(&mut empty, Entity::builder().bio("x").build());
        assert_eq!(empty.bio.as_deref(), Some("x"));
    }

    #[test]
    fn test_location_replaced_only_on_higher_confidence() {
        let sf = Location::new(MetroBucket::SfBayArea, 0.7)
            .unwrap()
            .with_raw("SF")
            .with_evidence_url("https://a.dev");
        let mut existing = Entity::builder().location(sf.clone()).build();

        let same = Location::new(MetroBucket::NonUs, 0.7).unwrap().with_raw("Berlin");
        let report = merge_into(&mut existing, Entity::builder().location(same).build());
        assert!(!report.location_replaced);
        assert_eq!(existing.location.as_ref(), Some(&sf));

        let better = Location::new(MetroBucket::OtherUs, 0.9).unwrap().with_raw("NYC");
        merge_into(&mut existing, Entity::builder().location(better.clone()).build());
        assert_eq!(existing.location.as_ref(), Some(&better));
        assert!(existing.location.as_ref().unwrap().evidence_url.is_none());
    }

    #[test]
    fn test_sets_union_and_evidence_appends() {
        let mut existing = Entity::builder()
            .source("github")
            .demo_url("https://a.app")
            .evidence(Evidence::new("shipped", "https://github.com/a", "github"))
            .build();
        let incoming = Entity::builder()
            .source("hn")
            .source("github")
            .demo_url("https://a.app")
            .demo_url("https://b.app")
            .evidence(Evidence::new("shipped", "https://github.com/a", "github"))
            .build();

        let report = merge_into(&mut existing, incoming);
        assert_eq!(
            existing.sources.iter().cloned().collect::<Vec<_>>(),
            vec!["github".to_string(), "hn".to_string()]
        );
        assert_eq!(report.sources_added, 1);
        assert_eq!(existing.demo_urls.len(), 2);
        assert_eq!(existing.evidence.len(), 2);
    }

    #[test]
    fn test_counters_take_max() {
        let mut existing = Entity::builder().stars_total(50).repo_count(3).build();
        merge_into(&mut existing, Entity::builder().stars_total(10).repo_count(9).build());
        assert_eq!(existing.stars_total, 50);
        assert_eq!(existing.repo_count, 9);

        merge_into(&mut existing, Entity::builder().stars_total(80).build());
        assert_eq!(existing.stars_total, 80);
    }

    #[test]
    fn test_last_activity_keeps_latest() {
        let mut existing = Entity::builder().last_activity("2024-03-01T00:00:00Z").build();
        merge_into(&mut existing, Entity::builder().last_activity("2023-12-31T23:59:59Z").build());
        assert_eq!(existing.last_activity.as_deref(), Some("2024-03-01T00:00:00Z"));

        merge_into(&mut existing, Entity::builder().last_activity("2024-06-01T00:00:00Z").build());
        assert_eq!(existing.last_activity.as_deref(), Some("2024-06-01T00:00:00Z"));

        merge_into(&mut existing, Entity::new());
        assert_eq!(existing.last_activity.as_deref(), Some("2024-06-01T00:00:00Z"));

        let mut empty = Entity::new();
        merge_into(&mut empty, Entity::builder().last_activity("2024-01-01").build());
        assert_eq!(empty.last_activity.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_merge_bumps_version_and_keeps_id() {
        let mut existing = Entity::builder().email("alex@example.com").build();
        let id = existing.id().clone();
        merge_into(&mut existing, Entity::builder().github_username("alexk").build());
        assert_eq!(existing.version, 2);
        assert_eq!(existing.id(), &id);
    }
}
