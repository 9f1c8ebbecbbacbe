//! Terminal output helpers for the Tajy search tools
//!
//! Provides shared CLI functionality:
//! - Status messages and error reports
//! - Ranked result tables
//! - Progress spinners that stay quiet when output is piped

#![warn(missing_docs)]

pub mod output;
pub mod progress;

pub use output::OutputFormat;
