//! Configuration loading and schema definitions
//!
//! Search tuning, backend table mapping and logging options shared by
//! the library crates and the CLI.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
