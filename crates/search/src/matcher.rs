//! Tiered fuzzy scoring of a query against a candidate name.
//!
//! Both sides are folded (lower-case, trimmed, accents removed), then the
//! ladder below is walked top-down and the first tier that holds wins:
//!
//! | Tier | Condition | Score |
//! |------|-----------|-------|
//! | [`MatchTier::Exact`] | text equals query | 1.00 |
//! | [`MatchTier::Prefix`] | text starts with query | 0.95 |
//! | [`MatchTier::Substring`] | text contains query | 0.92 |
//! | [`MatchTier::TokenPrefix`] | a word of text starts with query | 0.90 |
//! | [`MatchTier::TokenSubstring`] | a word of text contains query | 0.85 |
//! | [`MatchTier::Phonetic`] | phonetic keys are equal | 0.82 |
//! | [`MatchTier::EditDistance`] | Levenshtein similarity >= 0.75 | 0.72 - 0.78 |
//! | [`MatchTier::NoMatch`] | otherwise | 0.00 |
//!
//! Queries shorter than three characters only ever match exactly.

use crate::fuzzy::levenshtein_similarity;
use crate::normalize::{char_len, fold};
use crate::phonetic::phonetic_key;
use std::fmt;

/// Shortest folded query that is scored against anything but itself.
pub const MIN_SCORED_QUERY_CHARS: usize = 3;

/// Below this similarity a name pair is more often a false positive than a typo.
const EDIT_SIMILARITY_FLOOR: f64 = 0.75;

/// Outcome of matching one query against one candidate text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchTier {
    /// Identical after folding
    Exact,
    /// Text starts with the query
    Prefix,
    /// Text contains the query past its first character
    Substring,
    /// Some whitespace-delimited word starts with the query
    TokenPrefix,
    /// Some word contains the query
    TokenSubstring,
    /// Same Spanish phonetic key
    Phonetic,
    /// Close enough by normalized Levenshtein similarity (carried here)
    EditDistance(f64),
    /// Nothing matched
    NoMatch,
}

impl MatchTier {
    /// Map the tier to its fixed confidence score.
    pub fn score(self) -> f64 {
        match self {
            Self::Exact => 1.0,
            Self::Prefix => 0.95,
            Self::Substring => 0.92,
            Self::TokenPrefix => 0.90,
            Self::TokenSubstring => 0.85,
            Self::Phonetic => 0.82,
            Self::EditDistance(similarity) if similarity >= 0.85 => 0.78,
            Self::EditDistance(similarity) if similarity >= 0.80 => 0.75,
            Self::EditDistance(similarity) if similarity >= EDIT_SIMILARITY_FLOOR => 0.72,
            Self::EditDistance(_) | Self::NoMatch => 0.0,
        }
    }

    /// Short stable name, used in CLI and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Substring => "substring",
            Self::TokenPrefix => "token-prefix",
            Self::TokenSubstring => "token-substring",
            Self::Phonetic => "phonetic",
            Self::EditDistance(_) => "edit-distance",
            Self::NoMatch => "no-match",
        }
    }

    /// Whether the tier carries a non-zero score.
    pub fn is_match(self) -> bool {
        self.score() > 0.0
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EditDistance(similarity) => write!(f, "{} ({similarity:.2})", self.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Classify how `text` matches `query`.
///
/// Not symmetric: prefix, substring and token tiers look for the query
/// inside the text, never the other way round.
pub fn classify(query: &str, text: &str) -> MatchTier {
    let query = fold(query);
    let text = fold(text);
    classify_folded(&query, &text)
}

/// Score how well `text` matches `query`, in `[0, 1]`.
pub fn score(query: &str, text: &str) -> f64 {
    classify(query, text).score()
}

/// Walk the ladder on already folded input.
pub(crate) fn classify_folded(query: &str, text: &str) -> MatchTier {
    if char_len(query) < MIN_SCORED_QUERY_CHARS && query != text {
        return MatchTier::NoMatch;
    }

    if text == query {
        return MatchTier::Exact;
    }
    if text.starts_with(query) {
        return MatchTier::Prefix;
    }
    if text.contains(query) {
        return MatchTier::Substring;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.iter().any(|token| token.starts_with(query)) {
        return MatchTier::TokenPrefix;
    }
    if tokens.iter().any(|token| token.contains(query)) {
        return MatchTier::TokenSubstring;
    }

    let query_key = phonetic_key(query);
    if !query_key.is_empty() && query_key == phonetic_key(text) {
        return MatchTier::Phonetic;
    }

    let similarity = levenshtein_similarity(query, text);
    if similarity >= EDIT_SIMILARITY_FLOOR {
        return MatchTier::EditDistance(similarity);
    }

    MatchTier::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(classify("Maria Lopez", "maria lopez"), MatchTier::Exact);
        assert!(approx(score("María", "maria"), 1.0));
    }

    #[test]
    fn test_prefix() {
        assert_eq!(classify("carlos", "Carlos Pérez"), MatchTier::Prefix);
        assert!(approx(score("carlos", "Carlos Pérez"), 0.95));
    }

    #[test]
    fn test_inner_word_is_substring() {
        // Any word containing the query also puts the query inside the
        // whole text, so the substring tier is reached first.
        assert_eq!(classify("garcia", "Maria Garcia Lopez"), MatchTier::Substring);
        assert!(approx(score("garcia", "Maria Garcia Lopez"), 0.92));
        assert_eq!(classify("ard", "leonardo"), MatchTier::Substring);
    }

    #[test]
    fn test_prefix_wins_over_token_prefix() {
        assert_eq!(classify("maria", "Maria Lopez"), MatchTier::Prefix);
        assert!(approx(score("maria", "Maria Lopez"), 0.95));
    }

    #[test]
    fn test_token_tier_scores() {
        assert!(approx(MatchTier::TokenPrefix.score(), 0.90));
        assert!(approx(MatchTier::TokenSubstring.score(), 0.85));
    }

    #[test]
    fn test_phonetic() {
        assert_eq!(classify("gonzales", "Gonzalez"), MatchTier::Phonetic);
        assert!(approx(score("gonzales", "Gonzalez"), 0.82));
    }

    #[test]
    fn test_edit_distance_bands() {
        // One edit over seven chars, different phonetic heads
        let tier = classify("penitez", "Benitez");
        assert!(matches!(tier, MatchTier::EditDistance(sim) if sim > 0.85));
        assert!(approx(tier.score(), 0.78));

        // One edit over five chars
        assert!(approx(score("tedro", "Pedro"), 0.75));

        // One edit over four chars
        assert!(approx(score("suan", "Juan"), 0.72));
    }

    #[test]
    fn test_edit_distance_scores() {
        assert!(approx(MatchTier::EditDistance(0.90).score(), 0.78));
        assert!(approx(MatchTier::EditDistance(0.85).score(), 0.78));
        assert!(approx(MatchTier::EditDistance(0.82).score(), 0.75));
        assert!(approx(MatchTier::EditDistance(0.80).score(), 0.75));
        assert!(approx(MatchTier::EditDistance(0.75).score(), 0.72));
        assert!(approx(MatchTier::EditDistance(0.70).score(), 0.0));
    }

    #[test]
    fn test_juan_bruno_is_rejected() {
        assert_eq!(classify("juan", "bruno"), MatchTier::NoMatch);
        assert!(approx(score("juan", "bruno"), 0.0));
    }

    #[test]
    fn test_short_query_guard() {
        assert!(approx(score("ma", "Maria"), 0.0));
        assert!(approx(score("ma", "MA"), 1.0));
        assert!(approx(score("a", "ana"), 0.0));
    }

    #[test]
    fn test_asymmetry_is_allowed() {
        assert!(approx(score("ana", "Ana Diaz"), 0.95));
        assert!(approx(score("Ana Diaz", "ana"), 0.0));
    }

    #[test]
    fn test_ana_diaz_family() {
        assert_eq!(classify("ana diaz", "Ana Díaz"), MatchTier::Exact);
        assert_eq!(classify("ana diaz", "Ana Diaz Ruiz"), MatchTier::Prefix);
        assert_eq!(classify("ana diaz", "Ane Diaz"), MatchTier::Phonetic);
    }

    #[test]
    fn test_display() {
        assert_eq!(MatchTier::Prefix.to_string(), "prefix");
        assert_eq!(MatchTier::EditDistance(0.8).to_string(), "edit-distance (0.80)");
    }

    proptest! {
        #[test]
        fn prop_exactness_dominance(s in "\\PC{0,24}") {
            prop_assert!(approx(score(&s, &s), 1.0));
        }

        #[test]
        fn prop_prefix_scores_at_least_095(q in "[a-z]{3,8}", rest in "[a-z ]{0,12}") {
            let text = format!("{q}{rest}");
            prop_assert!(score(&q, &text) >= 0.95);
        }

        #[test]
        fn prop_short_query_guard(q in "[a-z]{0,2}", text in "[a-z ]{0,12}") {
            prop_assume!(fold(&q) != fold(&text));
            prop_assert!(approx(score(&q, &text), 0.0));
        }

        #[test]
        fn prop_score_is_bounded(q in "\\PC{0,12}", text in "\\PC{0,24}") {
            let s = score(&q, &text);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
