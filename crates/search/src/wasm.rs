//! WASM bindings for search utilities.

use crate::{Candidate, SearchResult};
use wasm_bindgen::prelude::*;

/// Score how well `text` matches `query`.
///
/// # Returns
/// Confidence in `[0, 1]`, 0 when nothing matched
#[wasm_bindgen]
pub fn fuzzy_score(query: &str, text: &str) -> f64 {
    crate::score(query, text)
}

/// Name of the match tier reached, e.g. `"prefix"` or `"phonetic"`.
#[wasm_bindgen]
pub fn match_tier(query: &str, text: &str) -> String {
    crate::classify(query, text).as_str().to_string()
}

/// Spanish phonetic key of a name.
#[wasm_bindgen]
pub fn phonetic_key(text: &str) -> String {
    crate::phonetic_key(text)
}

/// Rank candidates and return sorted results as JSON.
///
/// # Arguments
/// * `query` - Search query
/// * `candidates_json` - JSON array of `{name, externalRef}` (or `{asegurado, numero}`)
/// * `threshold` - Minimum score to keep
/// * `max_results` - Maximum results to return (0 for all)
///
/// # Returns
/// JSON array of `{name, externalRef, score}`, highest score first
#[wasm_bindgen]
pub fn rank_candidates(
    query: &str,
    candidates_json: &str,
    threshold: f64,
    max_results: usize,
) -> String {
    let candidates: Vec<Candidate> = match serde_json::from_str(candidates_json) {
        Ok(candidates) => candidates,
        Err(_) => return "[]".to_string(),
    };

    let mut results: Vec<SearchResult<Candidate>> =
        crate::rank_candidates(query, &candidates, threshold);

    if max_results > 0 {
        results.truncate(max_results);
    }

    serde_json::to_string(&results).unwrap_or_else(|_| "[]".to_string())
}
