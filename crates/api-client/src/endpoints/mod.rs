//! Table-specific API implementations
//!
//! Each module provides a typed interface over one PostgREST table.
//!
//! | Module | Table | Description |
//! |--------|-------|-------------|
//! | `claims` | `siniestros` | Claim CRUD and the search candidate projection |

pub mod claims;

pub use claims::{
    local_date, Claim, ClaimUpdate, ClaimsApi, NewClaim, DEFAULT_AMOUNT, FOLLOW_UP_STATES,
    INITIAL_STATE,
};
