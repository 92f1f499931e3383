//! Location classification consumed by the merge policy.
//!
//! The text classifier itself lives outside this crate and is plugged in
//! through [`LocationClassifier`]. This module owns the classification
//! types and the rule that picks one classification out of the explicit
//! location field, the short bio and the longer about-page text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Confidence above which an explicit location field is accepted outright.
pub const EXPLICIT_ACCEPT_THRESHOLD: f32 = 0.5;

/// Boost applied to an accepted explicit location field.
pub const EXPLICIT_BOOST: f32 = 0.2;

/// Coarse metro classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetroBucket {
    /// San Francisco Bay Area.
    SfBayArea,
    /// Any other US metro.
    OtherUs,
    /// Outside the US.
    NonUs,
    /// No usable signal.
    #[default]
    Unknown,
}

impl MetroBucket {
    /// Country bucket implied by this metro bucket.
    #[must_use]
    pub const fn country(self) -> CountryBucket {
        match self {
            Self::SfBayArea | Self::OtherUs => CountryBucket::Us,
            Self::NonUs => CountryBucket::NonUs,
            Self::Unknown => CountryBucket::Unknown,
        }
    }
}

impl fmt::Display for MetroBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SfBayArea => write!(f, "SF_BAY_AREA"),
            Self::OtherUs => write!(f, "OTHER_US"),
            Self::NonUs => write!(f, "NON_US"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Coarse country classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountryBucket {
    /// United States.
    #[serde(rename = "US")]
    Us,
    /// Any other country.
    #[serde(rename = "non-US")]
    NonUs,
    /// No usable signal.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl fmt::Display for CountryBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Us => write!(f, "US"),
            Self::NonUs => write!(f, "non-US"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One location classification, replaced only as a whole.
///
/// Deserialization goes through [`Location::new`], so a stored confidence
/// outside [0.0, 1.0] is rejected and the country is re-derived from the
/// metro bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationFields")]
pub struct Location {
    /// Location text the classification was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    /// Country bucket implied by `metro`.
    pub country: CountryBucket,

    /// Metro bucket.
    pub metro: MetroBucket,

    /// Classification confidence (0.0 to 1.0, inclusive).
    confidence: f32,

    /// Page the location was found on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_url: Option<String>,
}

/// Unchecked wire form of [`Location`].
#[derive(Deserialize)]
struct LocationFields {
    #[serde(default)]
    raw: Option<String>,
    metro: MetroBucket,
    confidence: f32,
    #[serde(default)]
    evidence_url: Option<String>,
}

impl TryFrom<LocationFields> for Location {
    type Error = ValidationError;

    fn try_from(fields: LocationFields) -> Result<Self, Self::Error> {
        let mut location = Self::new(fields.metro, fields.confidence)?;
        location.raw = fields.raw;
        location.evidence_url = fields.evidence_url;
        Ok(location)
    }
}

impl Location {
    /// Creates a classification for a metro bucket.
    ///
    /// # Errors
    /// Returns `ConfidenceOutOfRange` if `confidence` is not within [0.0, 1.0].
    ///
    /// # Examples
    ///
    /// ```
    /// use candidate_dedup::{CountryBucket, Location, MetroBucket};
    ///
    /// let loc = Location::new(MetroBucket::SfBayArea, 0.8).unwrap();
    /// assert_eq!(loc.country, CountryBucket::Us);
    /// ```
    pub fn new(metro: MetroBucket, confidence: f32) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(ValidationError::ConfidenceOutOfRange { value: confidence });
        }
        Ok(Self {
            raw: None,
            country: metro.country(),
            metro,
            confidence,
            evidence_url: None,
        })
    }

    /// Sets the raw location text.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Sets the URL the location was read from.
    #[must_use]
    pub fn with_evidence_url(mut self, url: impl Into<String>) -> Self {
        self.evidence_url = Some(url.into());
        self
    }

    /// Classification confidence in [0.0, 1.0].
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns true if this classification should replace `current`.
    ///
    /// Replacement requires strictly greater confidence; a missing current
    /// classification counts as confidence 0.0.
    #[must_use]
    pub fn supersedes(&self, current: Option<&Self>) -> bool {
        self.confidence > current.map_or(0.0, Self::confidence)
    }
}

/// External text classifier.
pub trait LocationClassifier {
    /// Classifies free text into a metro bucket with a confidence in [0, 1].
    ///
    /// Returns `None` when the text carries no location signal.
    fn classify(&self, text: &str) -> Option<(MetroBucket, f32)>;

    /// Extracts the location phrase a classification was based on.
    fn location_phrase(&self, _text: &str) -> Option<String> {
        None
    }
}

/// Picks the best classification from the explicit field, bio and about text.
///
/// The explicit field wins outright when its confidence exceeds
/// [`EXPLICIT_ACCEPT_THRESHOLD`] and is boosted by [`EXPLICIT_BOOST`]
/// (capped at 1.0). Otherwise bio and then about text are tried, each
/// replacing the running result only on strictly greater confidence.
pub fn resolve_location<C: LocationClassifier + ?Sized>(
    classifier: &C,
    explicit: Option<&str>,
    bio: Option<&str>,
    about: Option<&str>,
    evidence_url: Option<&str>,
) -> Option<Location> {
    let finish = |mut loc: Location| {
        loc.evidence_url = evidence_url.map(str::to_string);
        loc
    };

    if let Some(field) = explicit.filter(|s| !s.trim().is_empty()) {
        if let Some((metro, conf)) = classifier.classify(field) {
            let conf = conf.clamp(0.0, 1.0);
            if conf > EXPLICIT_ACCEPT_THRESHOLD {
                let boosted = (conf + EXPLICIT_BOOST).min(1.0);
                let loc = Location::new(metro, boosted).ok()?.with_raw(field);
                return Some(finish(loc));
            }
        }
    }

    let mut best: Option<Location> = None;
    for text in [bio, about].into_iter().flatten() {
        if text.trim().is_empty() {
            continue;
        }
        let Some((metro, conf)) = classifier.classify(text) else {
            continue;
        };
        let Ok(mut candidate) = Location::new(metro, conf.clamp(0.0, 1.0)) else {
            continue;
        };
        if candidate.supersedes(best.as_ref()) {
            candidate.raw = classifier.location_phrase(text);
            best = Some(candidate);
        }
    }

    best.map(finish)
}
