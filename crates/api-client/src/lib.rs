//! Supabase client for Aseguradora Tajy claims
//!
//! This crate talks to the claims table through PostgREST and feeds the
//! fuzzy search in `tajy-search`.
//!
//! # Features
//!
//! - **Environment-based configuration**: Project URL, keys and user from environment variables
//! - **Retry with exponential backoff**: Automatic retry for transient failures
//! - **Circuit breaker**: Stop calling a backend that keeps failing
//! - **Request correlation**: Track requests with unique IDs for debugging
//! - **Search integration**: Claims act as a `CandidateSource` and notify caches on writes
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tajy_api_client::TajyClient;
//! use tajy_search::{InvalidationHook, Ranker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TajyClient::new()?;
//!
//!     // The ranker reads through one handle, writes notify it through another
//!     let ranker = Arc::new(Ranker::new(client.claims()));
//!     let claims = client
//!         .claims()
//!         .with_hook(Arc::clone(&ranker) as Arc<dyn InvalidationHook>);
//!
//!     for hit in ranker.search("gonzales").await {
//!         println!("{:.2} {}", hit.score, hit.item.name);
//!     }
//!
//!     claims.delete(42).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod listing;
pub mod query;

pub use client::{Page, TajyClient};
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, ApiResult};
pub use listing::{ClaimFilter, ClaimPage, ClaimSearch, ListedClaim, SortOrder};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::TajyClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::{Claim, ClaimUpdate, ClaimsApi, NewClaim};
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::listing::{ClaimFilter, ClaimPage, ClaimSearch, ListedClaim, SortOrder};
}
