//! Error types for the search crate.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur at the edges of the search core.
///
/// None of these escape [`crate::Ranker::search`]; they are produced by
/// candidate sources and by cache validation, then logged and absorbed.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The candidate source could not be reached or returned an error
    #[error("Candidate source unavailable: {0}")]
    SourceUnavailable(String),

    /// A cache entry did not hold the value its namespace expects
    #[error("Corrupt cache entry for key {0}")]
    CacheCorruption(String),

    /// Query too short to score
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    /// Create a source error from anything displayable
    pub fn source_unavailable(reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable(reason.to_string())
    }
}
