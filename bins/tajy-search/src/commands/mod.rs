//! CLI command implementations

use serde::Serialize;
use tajy_cli::OutputFormat;
use tajy_core::config::Config;
use tajy_core::Result;

pub mod claims;
pub mod phonetic;
pub mod score;
pub mod search;

/// Settings shared by every command
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
