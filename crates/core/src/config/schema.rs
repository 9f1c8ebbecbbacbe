//! Configuration schema definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    /// Matching thresholds and cache lifetime
    #[serde(default)]
    pub search: SearchSettings,

    /// Claim table mapping on the hosted backend
    #[serde(default)]
    pub backend: BackendSettings,

    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ConfigSchema {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.backend.validate()
    }
}

/// Search tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    /// Cache entry lifetime in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Minimum score for interactive search
    #[serde(default = "default_primary_threshold")]
    pub primary_threshold: f64,

    /// Minimum score for the claim listing fallback
    #[serde(default = "default_fallback_threshold")]
    pub fallback_threshold: f64,

    /// Shortest trimmed query that is searched
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            primary_threshold: default_primary_threshold(),
            fallback_threshold: default_fallback_threshold(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

impl SearchSettings {
    fn validate(&self) -> Result<()> {
        if self.ttl_ms == 0 {
            return Err(Error::invalid_config_value("search.ttl_ms", "must be greater than 0"));
        }
        check_unit_interval("search.primary_threshold", self.primary_threshold)?;
        check_unit_interval("search.fallback_threshold", self.fallback_threshold)
    }
}

fn check_unit_interval(key: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_config_value(key, format!("{value} is outside [0, 1]")))
    }
}

fn default_ttl_ms() -> u64 {
    300_000
}

fn default_primary_threshold() -> f64 {
    0.35
}

fn default_fallback_threshold() -> f64 {
    0.40
}

fn default_min_query_chars() -> usize {
    2
}

/// Where claims live on the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendSettings {
    /// Claims table
    #[serde(default = "default_table")]
    pub table: String,

    /// Column holding the policy holder name
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Column holding the claim number
    #[serde(default = "default_ref_column")]
    pub ref_column: String,

    /// Rows per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Days after filing before an open claim is flagged for follow-up
    #[serde(default = "default_follow_up_days")]
    pub follow_up_days: u32,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            table: default_table(),
            name_column: default_name_column(),
            ref_column: default_ref_column(),
            page_size: default_page_size(),
            follow_up_days: default_follow_up_days(),
        }
    }
}

impl BackendSettings {
    fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::invalid_config_value("backend.table", "cannot be empty"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_config_value("backend.page_size", "must be greater than 0"));
        }
        Ok(())
    }
}

fn default_table() -> String {
    "siniestros".to_string()
}

fn default_name_column() -> String {
    "asegurado".to_string()
}

fn default_ref_column() -> String {
    "numero".to_string()
}

fn default_page_size() -> usize {
    50
}

fn default_follow_up_days() -> u32 {
    3
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
