//! Strong identity signals and their normalization.
//!
//! A strong signal is a field value that is treated as a near-unique
//! identifier for one person: a platform handle, an email address, a
//! professional-network profile slug, or the host of a personal website.
//! Every signal is reduced to a canonical key before it is compared or
//! indexed, so `AlexK`, ` alexk ` and `alexk` are the same handle.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// The kind of a strong identity signal.
///
/// Each kind has its own index; a value is only ever compared against
/// values of the same kind during strong-signal lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Code-hosting handle (GitHub).
    GithubUsername,
    /// Forum handle (Hacker News).
    HnUsername,
    /// Secondary-forum handle (Reddit).
    RedditUsername,
    /// Public email address.
    Email,
    /// Social handle (Twitter / X).
    TwitterHandle,
    /// Professional-network profile slug (the path segment after `/in/`).
    LinkedinProfile,
    /// Host of a non-platform personal website.
    WebsiteDomain,
}

impl SignalKind {
    /// Probe order used by strong-signal lookup, most reliable first.
    pub const LOOKUP_ORDER: [Self; 7] = [
        Self::GithubUsername,
        Self::HnUsername,
        Self::RedditUsername,
        Self::Email,
        Self::TwitterHandle,
        Self::LinkedinProfile,
        Self::WebsiteDomain,
    ];
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GithubUsername => write!(f, "github"),
            Self::HnUsername => write!(f, "hn"),
            Self::RedditUsername => write!(f, "reddit"),
            Self::Email => write!(f, "email"),
            Self::TwitterHandle => write!(f, "twitter"),
            Self::LinkedinProfile => write!(f, "linkedin"),
            Self::WebsiteDomain => write!(f, "website"),
        }
    }
}

/// A normalized strong signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signal {
    /// Which index this signal belongs to.
    pub kind: SignalKind,
    /// Normalized value.
    pub key: String,
}

fn linkedin_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)linkedin\.com/in/([a-z0-9_-]+)").expect("valid linkedin regex")
    })
}

fn host_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Scheme is optional: connectors hand over both `https://a.dev/x` and `a.dev`.
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*://)?(?:[^@/\s]*@)?(?:www\.)?([^/?#:\s]+)")
            .expect("valid host regex")
    })
}

/// Case-folds and trims a handle or email. Blank input yields `None`.
#[must_use]
pub fn normalize_handle(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_start_matches('@');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Extracts the lower-cased profile slug from a professional-network URL.
#[must_use]
pub fn linkedin_profile(url: &str) -> Option<String> {
    linkedin_regex()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Extracts the lower-cased host of a URL with any leading `www.` removed.
///
/// Accepts URLs with or without a scheme.
#[must_use]
pub fn url_host(url: &str) -> Option<String> {
    let host = host_regex()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_lowercase())?;
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(host)
}

/// Extracts the identifying host of a URL, refusing multi-tenant platform hosts.
///
/// A platform host (`medium.com`, `github.com`, ...) says nothing about who
/// owns the page, so it must never act as an identity signal.
#[must_use]
pub fn identity_domain(url: &str, platform_domains: &[String]) -> Option<String> {
    let host = url_host(url)?;
    if platform_domains.iter().any(|p| p.eq_ignore_ascii_case(&host)) {
        return None;
    }
    Some(host)
}

/// Returns the normalized key for one signal kind on an entity, if present.
#[must_use]
pub fn signal_key(entity: &Entity, kind: SignalKind, platform_domains: &[String]) -> Option<String> {
    match kind {
        SignalKind::GithubUsername => entity.github_username.as_deref().and_then(normalize_handle),
        SignalKind::HnUsername => entity.hn_username.as_deref().and_then(normalize_handle),
        SignalKind::RedditUsername => entity.reddit_username.as_deref().and_then(normalize_handle),
        SignalKind::Email => entity.email.as_deref().and_then(normalize_handle),
        SignalKind::TwitterHandle => entity.twitter_handle.as_deref().and_then(normalize_handle),
        SignalKind::LinkedinProfile => entity.linkedin_url.as_deref().and_then(linkedin_profile),
        SignalKind::WebsiteDomain => entity
            .website
            .as_deref()
            .and_then(|w| identity_domain(w, platform_domains)),
    }
}

/// Collects every strong signal present on an entity, in lookup order.
#[must_use]
pub fn strong_signals(entity: &Entity, platform_domains: &[String]) -> Vec<Signal> {
    SignalKind::LOOKUP_ORDER
        .iter()
        .filter_map(|&kind| {
            signal_key(entity, kind, platform_domains).map(|key| Signal { kind, key })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupConfig;

    fn platforms() -> Vec<String> {
        DedupConfig::default().platform_domains
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("  AlexK "), Some("alexk".to_string()));
        assert_eq!(normalize_handle("@AlexK"), Some("alexk".to_string()));
        assert_eq!(normalize_handle("   "), None);
        assert_eq!(normalize_handle(""), None);
    }

    #[test]
    fn test_linkedin_profile() {
        assert_eq!(
            linkedin_profile("https://www.LinkedIn.com/in/Alex-Kim_01/"),
            Some("alex-kim_01".to_string())
        );
        assert_eq!(linkedin_profile("https://linkedin.com/company/acme"), None);
        assert_eq!(linkedin_profile("not a url"), None);
    }

    #[test]
    fn test_url_host_with_and_without_scheme() {
        assert_eq!(url_host("https://www.AlexKim.dev/about"), Some("alexkim.dev".to_string()));
        assert_eq!(url_host("alexkim.dev"), Some("alexkim.dev".to_string()));
        assert_eq!(url_host("http://alexkim.dev:8080/x?y=1"), Some("alexkim.dev".to_string()));
        assert_eq!(url_host("www.blog.example.com"), Some("blog.example.com".to_string()));
        assert_eq!(url_host("localhost"), None);
        assert_eq!(url_host(""), None);
    }

    #[test]
    fn test_identity_domain_skips_platforms() {
        let p = platforms();
        assert_eq!(identity_domain("https://medium.com/@alex", &p), None);
        assert_eq!(identity_domain("https://www.github.com/alexk", &p), None);
        assert_eq!(identity_domain("x.com/alexk", &p), None);
        assert_eq!(
            identity_domain("https://alex.substack.com", &p),
            Some("alex.substack.com".to_string())
        );
    }

    #[test]
    fn test_strong_signals_in_lookup_order() {
        let entity = Entity::builder()
            .website("https://alexkim.dev")
            .email("Alex@Example.com")
            .github_username("AlexK")
            .linkedin_url("https://linkedin.com/in/alexkim")
            .build();

        let signals = strong_signals(&entity, &platforms());
        let kinds: Vec<SignalKind> = signals.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SignalKind::GithubUsername,
                SignalKind::Email,
                SignalKind::LinkedinProfile,
                SignalKind::WebsiteDomain,
            ]
        );
        assert_eq!(signals[0].key, "alexk");
        assert_eq!(signals[1].key, "alex@example.com");
    }

    #[test]
    fn test_signal_kind_display() {
        assert_eq!(format!("{}", SignalKind::GithubUsername), "github");
        assert_eq!(format!("{}", SignalKind::WebsiteDomain), "website");
    }
}
