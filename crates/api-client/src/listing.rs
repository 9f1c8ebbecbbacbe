//! Paged claim listing with a fuzzy fallback on the policy holder name
//!
//! The listing filters server-side with `ilike`. When a name filter finds
//! nothing, the whole table is ranked locally so typos and missing accents
//! still surface the claim.

use crate::endpoints::{local_date, Claim, ClaimsApi};
use crate::error::ApiResult;
use crate::query::RestQuery;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tajy_search::{rank_by, FALLBACK_THRESHOLD, MIN_QUERY_CHARS};
use tracing::{debug, info, instrument, warn};

/// Listing filters; blank values are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFilter {
    /// Substring of the policy holder name
    pub asegurado: Option<String>,
    /// Substring of the claim number
    pub numero: Option<String>,
    /// Exact processing state
    pub estado: Option<String>,
}

impl ClaimFilter {
    fn value(field: Option<&String>) -> Option<&str> {
        field.map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    /// Name filter, if set
    #[must_use]
    pub fn asegurado(&self) -> Option<&str> {
        Self::value(self.asegurado.as_ref())
    }

    /// Number filter, if set
    #[must_use]
    pub fn numero(&self) -> Option<&str> {
        Self::value(self.numero.as_ref())
    }

    /// State filter, if set
    #[must_use]
    pub fn estado(&self) -> Option<&str> {
        Self::value(self.estado.as_ref())
    }

    /// No filter set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.asegurado().is_none() && self.numero().is_none() && self.estado().is_none()
    }

    /// Name filter long enough to try fuzzy matching
    #[must_use]
    pub fn fuzzy_query(&self) -> Option<&str> {
        self.asegurado()
            .filter(|q| q.chars().count() >= MIN_QUERY_CHARS)
    }
}

/// Listing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Column to sort by
    pub column: String,
    /// Ascending when true
    pub ascending: bool,
}

impl Default for SortOrder {
    /// Newest first
    fn default() -> Self {
        Self {
            column: "created_at".to_string(),
            ascending: false,
        }
    }
}

impl SortOrder {
    /// Flip direction on the same column, or sort a new column ascending
    pub fn toggle(&mut self, column: &str) {
        if self.column == column {
            self.ascending = !self.ascending;
        } else {
            self.column = column.to_string();
            self.ascending = true;
        }
    }
}

/// A listed claim with its follow-up status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedClaim {
    /// The row itself
    #[serde(flatten)]
    pub claim: Claim,
    /// Days since the claim was filed
    pub days_elapsed: Option<i64>,
    /// Open and older than the follow-up window
    pub needs_follow_up: bool,
}

impl ListedClaim {
    /// Derive follow-up fields as of `today`
    #[must_use]
    pub fn new(claim: Claim, today: NaiveDate, follow_up_days: u32) -> Self {
        Self {
            days_elapsed: claim.days_elapsed(today),
            needs_follow_up: claim.needs_follow_up(today, follow_up_days),
            claim,
        }
    }
}

/// One listing page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClaimPage {
    /// Claims on this page
    pub claims: Vec<ListedClaim>,
    /// Matching claims across all pages
    pub total: u64,
    /// Zero-based page index
    pub page: usize,
    /// Whether `claims` came from the fuzzy fallback
    pub fuzzy_used: bool,
    /// Name the fallback matched against
    pub fuzzy_query: Option<String>,
    /// Claims on this page needing follow-up; only counted on the
    /// unfiltered first page
    pub pending_follow_up: usize,
}

/// Claim listing over [`ClaimsApi`]
#[derive(Debug, Clone)]
pub struct ClaimSearch {
    claims: ClaimsApi,
    fallback_threshold: f64,
}

impl ClaimSearch {
    /// Listing with the default fallback threshold
    #[must_use]
    pub fn new(claims: ClaimsApi) -> Self {
        Self {
            claims,
            fallback_threshold: FALLBACK_THRESHOLD,
        }
    }

    /// Builder-style method to set the fallback threshold
    #[must_use]
    pub fn with_fallback_threshold(mut self, threshold: f64) -> Self {
        self.fallback_threshold = threshold;
        self
    }

    /// Load page `page` (zero-based) of claims matching `filter`
    ///
    /// Backend errors on the main query are returned; errors in the
    /// fallback only mean the fallback found nothing.
    pub async fn load_page(
        &self,
        page: usize,
        filter: &ClaimFilter,
        order: &SortOrder,
    ) -> ApiResult<ClaimPage> {
        self.load_page_at(page, filter, order, local_date(Utc::now())).await
    }

    /// [`load_page`](Self::load_page) with follow-up computed as of `today`
    #[instrument(
        skip(self, filter, order),
        fields(column = %order.column, ascending = order.ascending)
    )]
    pub async fn load_page_at(
        &self,
        page: usize,
        filter: &ClaimFilter,
        order: &SortOrder,
        today: NaiveDate,
    ) -> ApiResult<ClaimPage> {
        let mut query = RestQuery::new();
        if let Some(name) = filter.asegurado() {
            query = query.ilike(&self.claims.settings().name_column, name);
        }
        if let Some(numero) = filter.numero() {
            query = query.ilike(&self.claims.settings().ref_column, numero);
        }
        if let Some(estado) = filter.estado() {
            query = query.eq("estado", estado);
        }
        let query = query.order(&order.column, order.ascending);

        let follow_up_days = self.claims.settings().follow_up_days;
        let listed = |rows: Vec<Claim>| -> Vec<ListedClaim> {
            rows.into_iter()
                .map(|claim| ListedClaim::new(claim, today, follow_up_days))
                .collect()
        };

        let result = self.claims.page(query, page).await?;
        let mut listing = ClaimPage {
            total: result.total.unwrap_or(result.rows.len() as u64),
            claims: listed(result.rows),
            page,
            ..ClaimPage::default()
        };

        if listing.claims.is_empty() {
            if let Some(name) = filter.fuzzy_query() {
                let matches = self.fuzzy_claims(name, filter.estado()).await;
                if !matches.is_empty() {
                    info!(
                        query = name,
                        matches = matches.len(),
                        "Listing fell back to fuzzy match"
                    );
                    listing.total = matches.len() as u64;
                    listing.claims = listed(matches);
                    listing.fuzzy_used = true;
                    listing.fuzzy_query = Some(name.to_string());
                }
            }
        }

        if page == 0 && filter.is_empty() {
            listing.pending_follow_up =
                listing.claims.iter().filter(|c| c.needs_follow_up).count();
        }

        debug!(
            rows = listing.claims.len(),
            total = listing.total,
            fuzzy = listing.fuzzy_used,
            pending_follow_up = listing.pending_follow_up,
            "Listing page loaded"
        );
        Ok(listing)
    }

    /// Every claim (optionally in `estado`) whose name matches `query`, best first
    pub async fn fuzzy_claims(&self, query: &str, estado: Option<&str>) -> Vec<Claim> {
        let all = match self.claims.all(estado).await {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "Fuzzy fallback failed");
                return Vec::new();
            }
        };

        rank_by(query, all, |c| c.asegurado.as_str(), self.fallback_threshold)
            .into_iter()
            .map(|r| r.item)
            .collect()
    }
}
