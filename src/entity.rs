//! Entity records and identity derivation.
//!
//! An [`Entity`] is both the unit that connectors hand to the engine (one
//! observation of a candidate) and the merged, authoritative view the
//! engine keeps for one real-world person. Its [`EntityId`] is derived from
//! the most reliable identity field it carries and is recomputed whenever a
//! merge fills in a better field.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::default_platform_domains;
use crate::location::Location;
use crate::signal::{identity_domain, normalize_handle};

/// Identifier of a tracked entity.
///
/// The value carries a kind prefix naming the field it was derived from
/// (`gh:`, `hn:`, `reddit:`, `email:`, `web:`, `name:`), or `unknown:` for
/// records that carry no identity field at all.
///
/// # Examples
///
/// ```
/// use candidate_dedup::Entity;
///
/// let entity = Entity::builder().github_username("AlexK").build();
/// assert_eq!(entity.id().as_str(), "gh:alexk");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    const FALLBACK_PREFIX: &'static str = "unknown:";

    /// Creates a fresh fallback identifier.
    #[must_use]
    pub fn fallback() -> Self {
        Self(format!("{}{}", Self::FALLBACK_PREFIX, Uuid::new_v4()))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the kind prefix (`gh`, `email`, `unknown`, ...).
    #[must_use]
    pub fn kind(&self) -> &str {
        self.0.split_once(':').map_or("", |(kind, _)| kind)
    }

    /// Returns true if this id was not derived from any identity field.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.0.starts_with(Self::FALLBACK_PREFIX)
    }

    /// Appends a disambiguation suffix.
    #[must_use]
    pub(crate) fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}~{n}", self.0))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A snippet of text supporting the candidate, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// The snippet itself.
    pub text: String,
    /// Page the snippet was taken from.
    pub source_url: String,
    /// Connector that produced it.
    pub source_name: String,
}

impl Evidence {
    /// Creates an evidence snippet.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        source_url: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
            source_name: source_name.into(),
        }
    }
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"))
}

fn name_slug(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    let slug = slug_regex().replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

fn blank_to_none(field: &mut Option<String>) {
    if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
        *field = None;
    }
}

/// One candidate: identity fields, evidence and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Code-host handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
    /// Forum handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hn_username: Option<String>,
    /// Secondary-forum handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_username: Option<String>,
    /// Public email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Professional-network profile URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    /// Social handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,

    /// Canonical code-host profile URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    /// Personal website, with or without a scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Links to shipped demos or products.
    #[serde(default)]
    pub demo_urls: BTreeSet<String>,
    /// Pages this candidate was observed on.
    #[serde(default)]
    pub source_urls: BTreeSet<String>,

    /// Short self-description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Supporting snippets, in arrival order.
    #[serde(default)]
    pub evidence: Vec<Evidence>,

    /// Best location classification seen so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Connectors that contributed to this entity.
    #[serde(default)]
    pub sources: BTreeSet<String>,
    /// ISO-8601 timestamp of the most recent observed activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    /// Total stars across the code-host repositories.
    #[serde(default)]
    pub stars_total: u64,
    /// Number of public repositories.
    #[serde(default)]
    pub repo_count: u64,

    /// Earliest construction time of any merged record.
    pub created_at: DateTime<Utc>,
    /// Time of the last merge.
    pub updated_at: DateTime<Utc>,
    /// Starts at 1; incremented by every merge.
    pub version: u64,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    /// Creates an empty record identified by a fallback id.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::fallback(),
            name: None,
            github_username: None,
            hn_username: None,
            reddit_username: None,
            email: None,
            linkedin_url: None,
            twitter_handle: None,
            github_url: None,
            website: None,
            demo_urls: BTreeSet::new(),
            source_urls: BTreeSet::new(),
            bio: None,
            evidence: Vec::new(),
            location: None,
            sources: BTreeSet::new(),
            last_activity: None,
            stars_total: 0,
            repo_count: 0,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Starts a fluent builder.
    #[must_use]
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// Current id.
    #[must_use]
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Derives the id from the highest-priority identity field present.
    ///
    /// Priority: code-host handle, forum handle, secondary-forum handle,
    /// email, website domain (platform hosts excluded), name slug.
    #[must_use]
    pub fn derive_id(&self, platform_domains: &[String]) -> Option<EntityId> {
        let handle = |prefix: &str, field: &Option<String>| {
            field
                .as_deref()
                .and_then(normalize_handle)
                .map(|key| EntityId(format!("{prefix}:{key}")))
        };

        handle("gh", &self.github_username)
            .or_else(|| handle("hn", &self.hn_username))
            .or_else(|| handle("reddit", &self.reddit_username))
            .or_else(|| handle("email", &self.email))
            .or_else(|| {
                self.website
                    .as_deref()
                    .and_then(|w| identity_domain(w, platform_domains))
                    .map(|domain| EntityId(format!("web:{domain}")))
            })
            .or_else(|| {
                self.name
                    .as_deref()
                    .and_then(name_slug)
                    .map(|slug| EntityId(format!("name:{slug}")))
            })
    }

    /// Recomputes the id from the current fields.
    ///
    /// A record without any identity field under `platform_domains` gets a
    /// fallback id; an existing fallback id is kept. Returns true if the id
    /// changed.
    pub fn refresh_id(&mut self, platform_domains: &[String]) -> bool {
        match self.derive_id(platform_domains) {
            Some(id) if id != self.id => {
                self.id = id;
                true
            }
            Some(_) => false,
            None if self.id.is_fallback() => false,
            None => {
                self.id = EntityId::fallback();
                true
            }
        }
    }

    /// Turns blank optional strings into `None`.
    pub fn normalize_fields(&mut self) {
        for field in [
            &mut self.name,
            &mut self.github_username,
            &mut self.hn_username,
            &mut self.reddit_username,
            &mut self.email,
            &mut self.linkedin_url,
            &mut self.twitter_handle,
            &mut self.github_url,
            &mut self.website,
            &mut self.bio,
            &mut self.last_activity,
        ] {
            blank_to_none(field);
        }
        self.demo_urls.retain(|u| !u.trim().is_empty());
        self.source_urls.retain(|u| !u.trim().is_empty());
    }

    /// Updates the `updated_at` timestamp and increments the version.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

/// Fluent builder for [`Entity`].
#[derive(Debug, Default)]
pub struct EntityBuilder {
    entity: Entity,
}

macro_rules! optional_setters {
    ($($(#[$doc:meta])* $field:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $field(mut self, value: impl Into<String>) -> Self {
                self.entity.$field = Some(value.into());
                self
            }
        )*
    };
}

impl EntityBuilder {
    optional_setters!(
        /// Display name.
        name,
        /// Code-host handle.
        github_username,
        /// Forum handle.
        hn_username,
        /// Secondary-forum handle.
        reddit_username,
        /// Public email address.
        email,
        /// Professional-network profile URL.
        linkedin_url,
        /// Social handle.
        twitter_handle,
        /// Canonical code-host profile URL.
        github_url,
        /// Personal website.
        website,
        /// Short self-description.
        bio,
        /// ISO-8601 timestamp of the latest observed activity.
        last_activity,
    );

    /// Adds a demo link.
    #[must_use]
    pub fn demo_url(mut self, url: impl Into<String>) -> Self {
        self.entity.demo_urls.insert(url.into());
        self
    }

    /// Adds a page the record was observed on.
    #[must_use]
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.entity.source_urls.insert(url.into());
        self
    }

    /// Tags the record with the connector that produced it.
    #[must_use]
    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.entity.sources.insert(name.into());
        self
    }

    /// Appends an evidence snippet.
    #[must_use]
    pub fn evidence(mut self, evidence: Evidence) -> Self {
        self.entity.evidence.push(evidence);
        self
    }

    /// Sets the location classification.
    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.entity.location = Some(location);
        self
    }

    /// Sets the star count.
    #[must_use]
    pub const fn stars_total(mut self, stars: u64) -> Self {
        self.entity.stars_total = stars;
        self
    }

    /// Sets the repository count.
    #[must_use]
    pub const fn repo_count(mut self, repos: u64) -> Self {
        self.entity.repo_count = repos;
        self
    }

    /// Finishes the record and derives its id with the default platform list.
    #[must_use]
    pub fn build(mut self) -> Entity {
        self.entity.normalize_fields();
        self.entity.refresh_id(default_platform_domains());
        self.entity
    }
}
