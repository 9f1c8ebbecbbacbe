//! Soundex-style phonetic keys for Spanish names.
//!
//! Letters that sound alike in Latin American Spanish collapse into one
//! class, then the key keeps the first letter and up to three of the
//! following non-vowel characters. "Gonzales" and "Gonzalez" share a key,
//! "Juan" and "Bruno" do not.

use crate::normalize::fold;

/// Maximum characters kept after the leading letter.
const KEY_TAIL: usize = 3;

/// Compute the phonetic key of a name.
///
/// Collapses, in order: `g,j -> j`, `c,s,z -> s`, `b,v -> b`, `ll -> y`,
/// `ñ -> n`, `q,k -> k`, `h ->` (dropped), `x -> ks`, `w -> u`.
/// Returns an empty string for empty input.
pub fn phonetic_key(text: &str) -> String {
    let collapsed: String = fold(text)
        .chars()
        .map(|c| match c {
            'g' | 'j' => 'j',
            'c' | 's' | 'z' => 's',
            'b' | 'v' => 'b',
            other => other,
        })
        .collect();

    let collapsed = collapsed.replace("ll", "y");

    let mut spelled = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        match c {
            'ñ' => spelled.push('n'),
            'q' | 'k' => spelled.push('k'),
            'h' => {}
            'x' => spelled.push_str("ks"),
            'w' => spelled.push('u'),
            other => spelled.push(other),
        }
    }

    let mut chars = spelled.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    std::iter::once(first)
        .chain(chars.filter(|c| !is_vowel(*c)).take(KEY_TAIL))
        .collect()
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gonzales_gonzalez() {
        assert_eq!(phonetic_key("Gonzales"), "jnsl");
        assert_eq!(phonetic_key("Gonzalez"), phonetic_key("Gonzales"));
    }

    #[test]
    fn test_b_and_v_merge() {
        assert_eq!(phonetic_key("Valdez"), phonetic_key("Baldes"));
    }

    #[test]
    fn test_silent_h() {
        assert_eq!(phonetic_key("Hernandez"), phonetic_key("Ernandes"));
    }

    #[test]
    fn test_ll_becomes_y() {
        assert_eq!(phonetic_key("Olla"), "oy");
        assert_eq!(phonetic_key("Villalba"), phonetic_key("Biyalba"));
    }

    #[test]
    fn test_x_and_q() {
        assert_eq!(phonetic_key("Ximena"), "ksmn");
        assert_eq!(phonetic_key("Quique"), "kk");
    }

    #[test]
    fn test_accents_ignored() {
        assert_eq!(phonetic_key("Núñez"), phonetic_key("Nunes"));
    }

    #[test]
    fn test_juan_bruno_differ() {
        assert_eq!(phonetic_key("juan"), "jn");
        assert_eq!(phonetic_key("bruno"), "brn");
    }

    #[test]
    fn test_empty() {
        assert_eq!(phonetic_key(""), "");
        assert_eq!(phonetic_key("   "), "");
    }

    #[test]
    fn test_whitespace_is_kept_in_tail() {
        // Only vowels are removed from the tail, separators stay.
        assert_eq!(phonetic_key("ana diaz"), "an d");
        assert_eq!(phonetic_key("ane diaz"), "an d");
    }
}
