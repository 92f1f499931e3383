//! Display-name similarity.
//!
//! Ratcliff/Obershelp ratio `2 * M / T` over characters, where `M` counts
//! characters in matching blocks and `T` is the combined length.

use difflib::sequencematcher::SequenceMatcher;

/// Similarity ratio in [0.0, 1.0] between two display names.
///
/// Names are case-folded and trimmed before comparison. If either side is
/// empty after trimming the ratio is 0.0, so a blank name never matches.
///
/// # Examples
///
/// ```
/// use candidate_dedup::name_similarity;
///
/// assert_eq!(name_similarity("Alex Kim", "  alex kim "), 1.0);
/// assert_eq!(name_similarity("", ""), 0.0);
/// ```
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matcher: SequenceMatcher<'_, char> = SequenceMatcher::new(a.as_slice(), b.as_slice());
    f64::from(matcher.ratio())
}
