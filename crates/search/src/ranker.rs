//! Query ranking over the cached candidate list.

use crate::cache::{InvalidationHook, SearchCache};
use crate::error::{Result, SearchError};
use crate::matcher::classify_folded;
use crate::normalize::{char_len, fold, query_key};
use crate::source::{Candidate, CandidateSource};
use crate::{ScoredResult, SearchResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum score for the interactive, cached search path.
pub const PRIMARY_THRESHOLD: f64 = 0.35;

/// Minimum score for the direct fallback used by the claims listing.
pub const FALLBACK_THRESHOLD: f64 = 0.40;

/// Queries shorter than this (after trimming) return nothing.
pub const MIN_QUERY_CHARS: usize = 2;

/// Ranker tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerConfig {
    /// Threshold for [`Ranker::search`]
    pub primary_threshold: f64,
    /// Threshold for [`Ranker::search_fallback`]
    pub fallback_threshold: f64,
    /// Shortest trimmed query that is searched at all
    pub min_query_chars: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            primary_threshold: PRIMARY_THRESHOLD,
            fallback_threshold: FALLBACK_THRESHOLD,
            min_query_chars: MIN_QUERY_CHARS,
        }
    }
}

/// Score every item against `query` and keep those at or above `threshold`.
///
/// `key` picks the text each item is matched on. Results are sorted by
/// score, highest first; equal scores keep their input order.
pub fn rank_by<T, F>(query: &str, items: Vec<T>, key: F, threshold: f64) -> Vec<SearchResult<T>>
where
    T: Send,
    F: Fn(&T) -> &str + Sync,
{
    let folded_query = fold(query);
    let score_item = |item: T| {
        let score = classify_folded(&folded_query, &fold(key(&item))).score();
        (score >= threshold).then_some(SearchResult { item, score })
    };

    #[cfg(feature = "parallel")]
    let mut results: Vec<SearchResult<T>> = items.into_par_iter().filter_map(score_item).collect();

    #[cfg(not(feature = "parallel"))]
    let mut results: Vec<SearchResult<T>> = items.into_iter().filter_map(score_item).collect();

    // sort_by is stable, so ties stay in input order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results
}

/// Rank candidates by name.
pub fn rank_candidates(query: &str, candidates: &[Candidate], threshold: f64) -> Vec<ScoredResult> {
    rank_by(query, candidates.iter().collect(), |c| c.name.as_str(), threshold)
        .into_iter()
        .map(|r| SearchResult {
            item: r.item.clone(),
            score: r.score,
        })
        .collect()
}

/// Fuzzy policy-holder search backed by a [`SearchCache`].
///
/// `search` never fails: source outages degrade to the last known
/// candidates or to no results.
#[derive(Debug)]
pub struct Ranker<S> {
    cache: SearchCache<S>,
    config: RankerConfig,
}

impl<S: CandidateSource> Ranker<S> {
    /// Ranker with default thresholds and a default cache over `source`
    pub fn new(source: S) -> Self {
        Self::with_cache(SearchCache::new(source), RankerConfig::default())
    }

    /// Ranker over a preconfigured cache
    pub fn with_cache(cache: SearchCache<S>, config: RankerConfig) -> Self {
        Self { cache, config }
    }

    /// The underlying cache
    pub fn cache(&self) -> &SearchCache<S> {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Ranked candidates for `query` at the primary threshold.
    ///
    /// Short queries and source failures yield an empty list.
    pub async fn search(&self, query: &str) -> Vec<ScoredResult> {
        match self.try_search(query).await {
            Ok(results) => results,
            Err(e) => {
                debug!(error = %e, "Search skipped");
                Vec::new()
            }
        }
    }

    /// Like [`search`](Self::search), but reports a too-short query.
    #[instrument(skip(self), fields(key = tracing::field::Empty))]
    pub async fn try_search(&self, query: &str) -> Result<Vec<ScoredResult>> {
        self.check_query(query)?;

        let key = query_key(query);
        tracing::Span::current().record("key", key.as_str());

        if let Some(hit) = self.cache.get_query_result(&key) {
            debug!(results = hit.len(), "Query cache hit");
            return Ok(hit.to_vec());
        }

        let load = self.cache.load_candidates().await;
        let ranked: Arc<[ScoredResult]> =
            rank_candidates(query, &load.candidates, self.config.primary_threshold).into();

        if !load.fresh {
            debug!("Candidates degraded, ranking not cached");
        } else if !self
            .cache
            .set_query_result_if_current(&key, Arc::clone(&ranked), load.generation)
        {
            debug!("Invalidated during search, ranking not cached");
        }

        debug!(
            candidates = load.candidates.len(),
            results = ranked.len(),
            "Query ranked"
        );
        Ok(ranked.to_vec())
    }

    /// Rank a fresh fetch from the source at the fallback threshold.
    ///
    /// Bypasses the cache in both directions; a failing source yields an
    /// empty list.
    #[instrument(skip(self))]
    pub async fn search_fallback(&self, query: &str) -> Vec<ScoredResult> {
        if let Err(e) = self.check_query(query) {
            debug!(error = %e, "Fallback search skipped");
            return Vec::new();
        }

        match self.cache.source().fetch_candidates().await {
            Ok(candidates) => {
                rank_candidates(query, &candidates, self.config.fallback_threshold)
            }
            Err(e) => {
                warn!(error = %e, "Fallback search failed");
                Vec::new()
            }
        }
    }

    /// Drop cached candidates and rankings.
    pub fn invalidate_candidates(&self) {
        self.cache.invalidate_candidates();
    }

    fn check_query(&self, query: &str) -> Result<()> {
        let len = char_len(query.trim());
        if len < self.config.min_query_chars {
            return Err(SearchError::InvalidQuery(format!(
                "need at least {} characters, got {len}",
                self.config.min_query_chars
            )));
        }
        Ok(())
    }
}

impl<S: CandidateSource> InvalidationHook for Ranker<S> {
    fn records_changed(&self) {
        self.invalidate_candidates();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn people() -> Vec<Candidate> {
        vec![
            Candidate::new("Juan Pérez", "S-1"),
            Candidate::new("Bruno Díaz", "S-2"),
            Candidate::new("Juana Gómez", "S-3"),
            Candidate::new("Juan", "S-4"),
        ]
    }

    #[test]
    fn test_rank_by_orders_descending() {
        let ranked = rank_candidates("juan", &people(), PRIMARY_THRESHOLD);
        let names: Vec<&str> = ranked.iter().map(|r| r.item.name.as_str()).collect();

        assert_eq!(names, vec!["Juan", "Juan Pérez", "Juana Gómez"]);
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_by_ties_keep_input_order() {
        let items = vec!["Ana Ruiz", "Ana Benítez", "Ana Ortiz"];
        let ranked = rank_by("ana", items, |s| *s, 0.35);

        let order: Vec<&str> = ranked.iter().map(|r| r.item).collect();
        assert_eq!(order, vec!["Ana Ruiz", "Ana Benítez", "Ana Ortiz"]);
    }

    #[test]
    fn test_rank_by_threshold_is_inclusive() {
        let ranked = rank_by("gonzales", vec!["Gonzalez"], |s| *s, 0.82);
        assert_eq!(ranked.len(), 1);

        let ranked = rank_by("gonzales", vec!["Gonzalez"], |s| *s, 0.83);
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_short_query_is_empty() {
        let source = Arc::new(InMemorySource::new(people()));
        let ranker = Ranker::new(Arc::clone(&source));

        assert!(ranker.search("j").await.is_empty());
        assert!(ranker.search("   ").await.is_empty());
        assert!(matches!(
            ranker.try_search(" j ").await,
            Err(SearchError::InvalidQuery(_))
        ));
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_search_is_cached() {
        let source = Arc::new(InMemorySource::new(people()));
        let ranker = Ranker::new(Arc::clone(&source));

        let first = ranker.search("juan").await;
        let second = ranker.search("  JUAN ").await;

        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(ranker.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_degraded_search_not_cached() {
        let source = Arc::new(InMemorySource::new(people()));
        source.set_failing(true);
        let ranker = Ranker::new(Arc::clone(&source));

        assert!(ranker.search("juan").await.is_empty());

        source.set_failing(false);
        assert_eq!(ranker.search("juan").await.len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_bypasses_cache() {
        let source = Arc::new(InMemorySource::new(people()));
        let ranker = Ranker::new(Arc::clone(&source));

        ranker.search_fallback("bruno").await;
        ranker.search_fallback("bruno").await;

        assert_eq!(source.fetch_count(), 2);
        assert_eq!(ranker.cache().entry_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_empty() {
        let source = Arc::new(InMemorySource::new(people()));
        source.set_failing(true);
        let ranker = Ranker::new(source);

        assert!(ranker.search_fallback("bruno").await.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_uses_stricter_threshold() {
        let source = Arc::new(InMemorySource::new(people()));
        let config = RankerConfig {
            primary_threshold: 0.0,
            fallback_threshold: 0.99,
            ..RankerConfig::default()
        };
        let ranker = Ranker::with_cache(SearchCache::new(source), config);

        let fallback = ranker.search_fallback("juan").await;
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].item.external_ref, "S-4");

        assert_eq!(ranker.search("juan").await.len(), 4);
    }

    proptest::proptest! {
        #[test]
        fn prop_ranked_sorted_and_above_threshold(
            query in "[a-z ]{2,8}",
            names in proptest::collection::vec("[a-zA-Záéíóúñ ]{0,16}", 0..40),
            threshold in 0.0f64..1.0,
        ) {
            let ranked = rank_by(&query, names.clone(), |s| s.as_str(), threshold);

            proptest::prop_assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
            proptest::prop_assert!(ranked.iter().all(|r| r.score >= threshold));
            proptest::prop_assert!(ranked.len() <= names.len());
        }
    }
}
