//! In-memory TTL cache for candidates and per-query rankings
//!
//! One keyed store holds two namespaces:
//! - `candidates`: the whole candidate list, refreshed from the source
//! - `query:<key>`: the ranked results for one normalized query
//!
//! Entries older than the TTL are purged when read. Any write to the
//! underlying records must call [`SearchCache::invalidate_candidates`],
//! which also drops every cached ranking.
//!
//! # Example
//!
//! ```rust,ignore
//! use tajy_search::{Candidate, InMemorySource, SearchCache};
//!
//! let cache = SearchCache::new(InMemorySource::new(vec![Candidate::new("Ana Díaz", "S-1")]));
//! let candidates = cache.get_candidates().await;
//! cache.invalidate_candidates();
//! ```

use crate::error::SearchError;
use crate::source::{Candidate, CandidateSource};
use crate::ScoredResult;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Default time-to-live for every entry: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

const CANDIDATES_KEY: &str = "candidates";
const QUERY_PREFIX: &str = "query:";

/// Source of "now" for entry timestamps
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start at `millis` since the epoch
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Move forward
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> i64 {
        self.as_ref().now_millis()
    }
}

/// A cached value and the time it was stored.
///
/// Value and timestamp are always written together under the cache lock.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When the value was stored
    pub stored_at_epoch_millis: i64,
}

impl<T> CacheEntry<T> {
    /// Wrap a value stored at `now`
    pub fn new(value: T, now: i64) -> Self {
        Self {
            value,
            stored_at_epoch_millis: now,
        }
    }

    /// Age at `now`, never negative
    pub fn age_millis(&self, now: i64) -> i64 {
        now.saturating_sub(self.stored_at_epoch_millis).max(0)
    }

    /// Older than `ttl_millis` at `now`
    pub fn is_expired(&self, now: i64, ttl_millis: i64) -> bool {
        self.age_millis(now) > ttl_millis
    }
}

/// Something that must hear about writes to the underlying claim records.
pub trait InvalidationHook: Send + Sync {
    /// A claim was created, renamed or deleted
    fn records_changed(&self);
}

/// Cache activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Successful candidate fetches
    pub fetches: u64,
    /// Candidate fetches that failed
    pub fetch_failures: u64,
    /// Entries purged for being older than the TTL
    pub evictions: u64,
    /// Explicit invalidation calls
    pub invalidations: u64,
    /// Entries discarded because they held the wrong kind of value
    pub corruptions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    corruptions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            corruptions: self.corruptions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Candidates(Arc<[Candidate]>),
    Results(Arc<[ScoredResult]>),
}

enum Lookup {
    Absent,
    Expired(Cached),
    Fresh(Cached),
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry<Cached>>,
    /// Bumped by every invalidation; fetches and rankings started under an
    /// older generation must not be stored.
    generation: u64,
}

impl CacheState {
    fn lookup(&mut self, key: &str, now: i64, ttl_millis: i64) -> Lookup {
        let expired = match self.entries.get(key) {
            None => return Lookup::Absent,
            Some(entry) => entry.is_expired(now, ttl_millis),
        };

        if expired {
            return match self.entries.remove(key) {
                Some(entry) => Lookup::Expired(entry.value),
                None => Lookup::Absent,
            };
        }

        match self.entries.get(key) {
            Some(entry) => Lookup::Fresh(entry.value.clone()),
            None => Lookup::Absent,
        }
    }

    fn purge_queries(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(QUERY_PREFIX));
        before - self.entries.len()
    }
}

/// Candidate list as seen by one caller.
#[derive(Debug, Clone)]
pub(crate) struct CandidateLoad {
    pub(crate) candidates: Arc<[Candidate]>,
    /// False when the source failed and stale or empty data was returned
    pub(crate) fresh: bool,
    /// Cache generation observed when the load started
    pub(crate) generation: u64,
}

/// TTL cache in front of a [`CandidateSource`].
pub struct SearchCache<S> {
    source: S,
    state: Mutex<CacheState>,
    ttl_millis: i64,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<S: CandidateSource> SearchCache<S> {
    /// Create an empty cache with the default TTL and the system clock
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::default()),
            ttl_millis: duration_millis(DEFAULT_TTL),
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        }
    }

    /// Builder-style method to set the TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_millis = duration_millis(ttl);
        self
    }

    /// Builder-style method to set the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.ttl_millis).unwrap_or(0))
    }

    /// The wrapped source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the cached candidate list, refetching it when stale or absent.
    ///
    /// Never fails: if the source errors, the last list is returned (even
    /// if it just expired) or an empty one.
    pub async fn get_candidates(&self) -> Arc<[Candidate]> {
        self.load_candidates().await.candidates
    }

    pub(crate) async fn load_candidates(&self) -> CandidateLoad {
        let now = self.clock.now_millis();
        let (stale, generation) = {
            let mut state = self.lock();
            let generation = state.generation;
            match state.lookup(CANDIDATES_KEY, now, self.ttl_millis) {
                Lookup::Fresh(Cached::Candidates(candidates)) => {
                    Counters::bump(&self.counters.hits);
                    return CandidateLoad {
                        candidates,
                        fresh: true,
                        generation,
                    };
                }
                Lookup::Expired(Cached::Candidates(candidates)) => {
                    Counters::bump(&self.counters.evictions);
                    debug!(count = candidates.len(), "Candidate cache expired");
                    (Some(candidates), generation)
                }
                Lookup::Fresh(Cached::Results(_)) | Lookup::Expired(Cached::Results(_)) => {
                    self.discard_corrupt(&mut state, CANDIDATES_KEY);
                    (None, generation)
                }
                Lookup::Absent => (None, generation),
            }
        };
        Counters::bump(&self.counters.misses);

        match self.source.fetch_candidates().await {
            Ok(candidates) => {
                Counters::bump(&self.counters.fetches);
                let candidates: Arc<[Candidate]> = candidates.into();

                let mut state = self.lock();
                if state.generation == generation {
                    state.entries.insert(
                        CANDIDATES_KEY.to_string(),
                        CacheEntry::new(
                            Cached::Candidates(Arc::clone(&candidates)),
                            self.clock.now_millis(),
                        ),
                    );
                    let dropped = state.purge_queries();
                    debug!(
                        count = candidates.len(),
                        dropped_queries = dropped,
                        "Candidate cache refreshed"
                    );
                } else {
                    debug!("Candidates invalidated during fetch, not storing");
                }

                CandidateLoad {
                    candidates,
                    fresh: true,
                    generation,
                }
            }
            Err(e) => {
                Counters::bump(&self.counters.fetch_failures);
                let candidates = stale.unwrap_or_else(|| Arc::from(Vec::new()));
                warn!(
                    error = %e,
                    fallback = candidates.len(),
                    "Candidate fetch failed, serving stale list"
                );
                CandidateLoad {
                    candidates,
                    fresh: false,
                    generation,
                }
            }
        }
    }

    /// Cached ranking for an already normalized query, if present and fresh.
    pub fn get_query_result(&self, normalized_query: &str) -> Option<Arc<[ScoredResult]>> {
        let key = query_cache_key(normalized_query);
        let now = self.clock.now_millis();
        let mut state = self.lock();

        match state.lookup(&key, now, self.ttl_millis) {
            Lookup::Fresh(Cached::Results(results)) => {
                Counters::bump(&self.counters.hits);
                Some(results)
            }
            Lookup::Expired(Cached::Results(_)) => {
                Counters::bump(&self.counters.evictions);
                Counters::bump(&self.counters.misses);
                None
            }
            Lookup::Fresh(Cached::Candidates(_)) | Lookup::Expired(Cached::Candidates(_)) => {
                self.discard_corrupt(&mut state, &key);
                Counters::bump(&self.counters.misses);
                None
            }
            Lookup::Absent => {
                Counters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Store a ranking for an already normalized query, stamped now.
    pub fn set_query_result(&self, normalized_query: &str, results: Arc<[ScoredResult]>) {
        let entry = CacheEntry::new(Cached::Results(results), self.clock.now_millis());
        self.lock()
            .entries
            .insert(query_cache_key(normalized_query), entry);
    }

    /// Store a ranking only if no invalidation happened since `generation`.
    pub(crate) fn set_query_result_if_current(
        &self,
        normalized_query: &str,
        results: Arc<[ScoredResult]>,
        generation: u64,
    ) -> bool {
        let now = self.clock.now_millis();
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.entries.insert(
            query_cache_key(normalized_query),
            CacheEntry::new(Cached::Results(results), now),
        );
        true
    }

    /// Drop the candidate list and every cached ranking.
    pub fn invalidate_candidates(&self) {
        let mut state = self.lock();
        let had_candidates = state.entries.remove(CANDIDATES_KEY).is_some();
        let dropped = state.purge_queries();
        state.generation = state.generation.wrapping_add(1);
        Counters::bump(&self.counters.invalidations);
        info!(
            had_candidates,
            dropped_queries = dropped,
            "Candidate cache invalidated"
        );
    }

    /// Drop every cached ranking, keeping the candidate list.
    pub fn invalidate_query_results(&self) {
        let mut state = self.lock();
        let dropped = state.purge_queries();
        state.generation = state.generation.wrapping_add(1);
        Counters::bump(&self.counters.invalidations);
        debug!(dropped_queries = dropped, "Query results invalidated");
    }

    /// Number of live entries across both namespaces
    pub fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Snapshot of the activity counters
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn discard_corrupt(&self, state: &mut CacheState, key: &str) {
        state.entries.remove(key);
        Counters::bump(&self.counters.corruptions);
        let err = SearchError::CacheCorruption(key.to_string());
        warn!(error = %err, "Discarding cache entry");
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock still guards valid state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: CandidateSource> InvalidationHook for SearchCache<S> {
    fn records_changed(&self) {
        self.invalidate_candidates();
    }
}

impl<S> fmt::Debug for SearchCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCache")
            .field("ttl_millis", &self.ttl_millis)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

fn query_cache_key(normalized_query: &str) -> String {
    format!("{QUERY_PREFIX}{normalized_query}")
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
