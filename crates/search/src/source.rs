//! Candidates and the sources that supply them.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Searchable projection of a claim: the policy holder and the claim number.
///
/// Deserializes from either `{name, externalRef}` or the backend's
/// `{asegurado, numero}` column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Policy holder name
    #[serde(alias = "asegurado")]
    pub name: String,
    /// Claim number in the backend
    #[serde(alias = "numero", default)]
    pub external_ref: String,
}

impl Candidate {
    /// Create a candidate
    pub fn new(name: impl Into<String>, external_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_ref: external_ref.into(),
        }
    }
}

/// Supplies the complete, current candidate set for the active user.
///
/// Implementations do their own I/O and report any failure as
/// [`SearchError::SourceUnavailable`]; the cache decides how to degrade.
pub trait CandidateSource: Send + Sync {
    /// Fetch every searchable candidate.
    fn fetch_candidates(&self) -> impl Future<Output = Result<Vec<Candidate>>> + Send;
}

impl<T: CandidateSource> CandidateSource for Arc<T> {
    fn fetch_candidates(&self) -> impl Future<Output = Result<Vec<Candidate>>> + Send {
        self.as_ref().fetch_candidates()
    }
}

/// In-process candidate list.
///
/// Backs the CLI's `--file` mode and tests. Counts fetches and can be told
/// to fail, which makes refresh and degradation behaviour observable.
#[derive(Debug, Default)]
pub struct InMemorySource {
    candidates: RwLock<Vec<Candidate>>,
    fetches: AtomicUsize,
    failing: AtomicBool,
}

impl InMemorySource {
    /// Create a source holding `candidates`
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: RwLock::new(candidates),
            ..Default::default()
        }
    }

    /// Parse a JSON array of candidates
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Append a candidate
    pub fn insert(&self, candidate: Candidate) {
        self.write().push(candidate);
    }

    /// Rename every candidate carrying `external_ref`; returns how many changed
    pub fn rename(&self, external_ref: &str, name: &str) -> usize {
        let mut guard = self.write();
        let mut changed = 0;
        for candidate in guard.iter_mut().filter(|c| c.external_ref == external_ref) {
            candidate.name = name.to_string();
            changed += 1;
        }
        changed
    }

    /// Remove every candidate carrying `external_ref`; returns how many were removed
    pub fn remove(&self, external_ref: &str) -> usize {
        let mut guard = self.write();
        let before = guard.len();
        guard.retain(|c| c.external_ref != external_ref);
        before - guard.len()
    }

    /// Replace the whole list
    pub fn replace(&self, candidates: Vec<Candidate>) {
        *self.write() = candidates;
    }

    /// Make subsequent fetches fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches served or attempted so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Current number of candidates
    pub fn len(&self) -> usize {
        self.candidates.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the source is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Candidate>> {
        self.candidates.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CandidateSource for InMemorySource {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::source_unavailable("in-memory source set to fail"));
        }

        Ok(self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
