//! Core utilities for the Aseguradora Tajy claim search tools
//!
//! Shared by the search library, the backend client and the CLI:
//!
//! - **Error handling**: Coded errors with context and recovery suggestions
//! - **Configuration**: TOML-based configuration with validation
//! - **Resilience**: Retry backoff policy and circuit breaker for backend calls
//!
//! # Example
//!
//! ```rust,no_run
//! use tajy_core::config::Config;
//!
//! let config = Config::load(None)?;
//! println!("cache ttl: {} ms", config.schema.search.ttl_ms);
//! # Ok::<(), tajy_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod resilience;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryPolicy};
}
