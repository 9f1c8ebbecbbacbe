//! Edit-distance primitives.

/// Calculate Levenshtein edit distance between two strings.
///
/// Unit cost for insert, delete and substitute, computed over `char`s.
///
/// # Arguments
/// * `a` - First string
/// * `b` - Second string
///
/// # Returns
/// Number of single-character edits needed to transform a into b
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Two rows are enough for the DP table
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Normalized Levenshtein similarity in `[0, 1]`.
///
/// `1 - distance / max(len(a), len(b))`. Two empty strings are identical.
#[allow(clippy::cast_precision_loss)]
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_same() {
        assert_eq!(levenshtein_distance("gomez", "gomez"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein_distance("gomez", "gomes"), 1);
    }

    #[test]
    fn test_levenshtein_insert() {
        assert_eq!(levenshtein_distance("benites", "benitez "), 2);
        assert_eq!(levenshtein_distance("rui", "ruiz"), 1);
    }

    #[test]
    fn test_levenshtein_delete() {
        assert_eq!(levenshtein_distance("ortizz", "ortiz"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
    }

    #[test]
    fn test_levenshtein_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("ñandu", "nandu"), 1);
    }

    #[test]
    fn test_similarity_juan_bruno() {
        // juan -> bruno takes 4 edits over 5 chars
        assert_eq!(levenshtein_distance("juan", "bruno"), 4);
        let sim = levenshtein_similarity("juan", "bruno");
        assert!((sim - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_bounds() {
        assert!((levenshtein_similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!(levenshtein_similarity("abc", "xyz").abs() < f64::EPSILON);
    }
}
