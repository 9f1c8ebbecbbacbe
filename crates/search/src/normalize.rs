//! Text normalization shared by the matcher and the cache.

use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks block stripped after NFD decomposition.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Fold text for comparison: lower-case, trim, decompose and drop accents.
///
/// `"  María "` and `"maria"` fold to the same string.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .trim()
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .collect()
}

/// Build the cache key for a query.
///
/// Folds the query and collapses every whitespace run into a single `_`,
/// so token boundaries survive: `"ana  diaz"` keys as `ana_diaz`, which
/// stays distinct from `anadiaz`.
pub fn query_key(query: &str) -> String {
    fold(query).split_whitespace().collect::<Vec<_>>().join("_")
}

/// Number of characters (not bytes) in a string.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents() {
        assert_eq!(fold("María"), "maria");
        assert_eq!(fold("  JOSÉ Núñez "), "jose nunez");
    }

    #[test]
    fn test_fold_keeps_inner_spacing() {
        assert_eq!(fold("ana   diaz"), "ana   diaz");
    }

    #[test]
    fn test_query_key_collapses_whitespace() {
        assert_eq!(query_key("  maría  lópez "), "maria_lopez");
        assert_eq!(query_key("maria_lopez"), "maria_lopez");
        assert_ne!(query_key("maria lopez"), query_key("marialopez"));
    }

    #[test]
    fn test_query_key_tabs_and_newlines() {
        assert_eq!(query_key("ana\t\n diaz"), "ana_diaz");
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(char_len("ñu"), 2);
    }
}
