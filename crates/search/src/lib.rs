//! Fuzzy policy-holder search for Aseguradora Tajy.
//!
//! This crate provides:
//! - Tiered name matching with accent folding and Spanish phonetic keys
//! - Levenshtein edit distance
//! - A TTL cache for the candidate list and per-query rankings
//! - A ranker that degrades to stale or empty results instead of failing

mod cache;
mod error;
mod fuzzy;
mod matcher;
mod normalize;
mod phonetic;
mod ranker;
mod source;

#[cfg(feature = "wasm")]
mod wasm;

pub use cache::{
    CacheEntry, CacheStats, Clock, InvalidationHook, ManualClock, SearchCache, SystemClock,
    DEFAULT_TTL,
};
pub use error::{Result, SearchError};
pub use fuzzy::{levenshtein_distance, levenshtein_similarity};
pub use matcher::{classify, score, MatchTier, MIN_SCORED_QUERY_CHARS};
pub use normalize::{fold, query_key};
pub use phonetic::phonetic_key;
pub use ranker::{
    rank_by, rank_candidates, Ranker, RankerConfig, FALLBACK_THRESHOLD, MIN_QUERY_CHARS,
    PRIMARY_THRESHOLD,
};
pub use source::{Candidate, CandidateSource, InMemorySource};

/// Search result with confidence score.
///
/// Serializes flat: a candidate result reads `{name, externalRef, score}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchResult<T> {
    /// The matched item
    #[serde(flatten)]
    pub item: T,
    /// Match confidence in `[0, 1]` (higher is better)
    pub score: f64,
}

/// A ranked candidate.
pub type ScoredResult = SearchResult<Candidate>;
