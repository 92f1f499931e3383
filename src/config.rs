//! Engine configuration.

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{DedupResult, ValidationError};

/// Multi-tenant hosts that never identify a single person.
const PLATFORM_DOMAINS: [&str; 7] = [
    "github.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "medium.com",
    "substack.com",
    "youtube.com",
];

/// The built-in platform host list.
#[must_use]
pub fn default_platform_domains() -> &'static [String] {
    static DOMAINS: OnceLock<Vec<String>> = OnceLock::new();
    DOMAINS.get_or_init(|| PLATFORM_DOMAINS.iter().map(|d| (*d).to_string()).collect())
}

/// Deduplication engine configuration.
///
/// # Examples
///
/// ```
/// use candidate_dedup::DedupConfig;
///
/// let config = DedupConfig::from_json_str(r#"{ "similarity_threshold": 0.9 }"#).unwrap();
/// assert_eq!(config.similarity_threshold, 0.9);
/// assert_eq!(config.cross_reference_threshold, 0.9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Name similarity a fuzzy candidate must exceed before corroboration is checked.
    pub similarity_threshold: f64,

    /// Name similarity the cross-reference pass must exceed.
    pub cross_reference_threshold: f64,

    /// Names must be longer than this (in characters) for the cross-reference pass.
    pub cross_reference_min_name_len: usize,

    /// Hosts excluded from the website-domain index.
    pub platform_domains: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            cross_reference_threshold: 0.9,
            cross_reference_min_name_len: 5,
            platform_domains: default_platform_domains().to_vec(),
        }
    }
}

impl DedupConfig {
    /// Sets the fuzzy-match similarity threshold.
    #[must_use]
    pub const fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets the cross-reference similarity threshold.
    #[must_use]
    pub const fn with_cross_reference_threshold(mut self, threshold: f64) -> Self {
        self.cross_reference_threshold = threshold;
        self
    }

    /// Adds a host to the platform exclusion list.
    #[must_use]
    pub fn with_platform_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into().trim().to_lowercase();
        if !self.platform_domains.contains(&domain) {
            self.platform_domains.push(domain);
        }
        self
    }

    /// Validates thresholds and normalizes the platform list.
    ///
    /// # Errors
    /// Returns `ThresholdOutOfRange` for thresholds outside [0.0, 1.0] and
    /// `InvalidConfig` for blank platform hosts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("cross_reference_threshold", self.cross_reference_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ValidationError::ThresholdOutOfRange { name, value });
            }
        }
        if self.platform_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(ValidationError::InvalidConfig {
                reason: "platform_domains contains a blank host".to_string(),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing keys take defaults.
    ///
    /// # Errors
    /// Returns a validation error for malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> DedupResult<Self> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
                reason: e.to_string(),
            })?;
        for domain in &mut config.platform_domains {
            *domain = domain.trim().to_lowercase();
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a validation error.
    pub fn from_json_file(path: impl AsRef<Path>) -> DedupResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DedupConfig::default();
        assert!((config.similarity_threshold - 0.85).abs() < f64::EPSILON);
        assert!((config.cross_reference_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.cross_reference_min_name_len, 5);
        assert!(config.platform_domains.iter().any(|d| d == "medium.com"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = DedupConfig::default().with_similarity_threshold(1.5);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ThresholdOutOfRange { name: "similarity_threshold", .. }
        ));

        let config = DedupConfig::default().with_cross_reference_threshold(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_platform_domain_normalizes() {
        let config = DedupConfig::default()
            .with_platform_domain(" Dev.To ")
            .with_platform_domain("dev.to");
        assert_eq!(config.platform_domains.iter().filter(|d| *d == "dev.to").count(), 1);
    }

    #[test]
    fn test_from_json_str_partial() {
        let config =
            DedupConfig::from_json_str(r#"{ "platform_domains": ["Hashnode.dev"] }"#).unwrap();
        assert_eq!(config.platform_domains, vec!["hashnode.dev".to_string()]);
        assert!((config.similarity_threshold - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_from_json_str_invalid() {
        let err = DedupConfig::from_json_str("{ not json").unwrap_err();
        assert!(err.is_validation());

        let err = DedupConfig::from_json_str(r#"{ "similarity_threshold": 3.0 }"#).unwrap_err();
        assert!(err.is_validation());

        let err = DedupConfig::from_json_str(r#"{ "platform_domains": [" "] }"#).unwrap_err();
        assert!(err.is_validation());
    }
}
