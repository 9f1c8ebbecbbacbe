//! Configuration for the Tajy backend client
//!
//! Connection details come from the environment; tuning has sensible
//! defaults per environment.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tajy_core::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Path of the PostgREST API under a Supabase project URL
const REST_PATH: &str = "rest/v1";

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local Supabase
    Development,
    /// Staging project
    Staging,
    /// Production project
    #[default]
    Production,
}

impl Environment {
    /// Parse from `TAJY_ENV`
    pub fn from_env() -> Self {
        Self::parse(&env::var("TAJY_ENV").unwrap_or_default())
    }

    /// Parse a name, defaulting to production
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    /// Retry policy suited to this environment
    pub fn retry_policy(self) -> RetryPolicy {
        match self {
            Self::Development => RetryPolicy::quick(),
            Self::Staging => RetryPolicy::default(),
            Self::Production => RetryPolicy::patient(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Supabase project URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Project anon key, sent as `apikey`
    pub anon_key: Option<String>,
    /// User session token; the anon key is used as bearer when absent
    pub access_token: Option<String>,
    /// Authenticated user every claim query is scoped to
    pub user_id: Option<String>,
    /// Request timeout
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryPolicy,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
    /// Current environment
    pub environment: Environment,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl ClientConfig {
    /// Configuration for a project URL with default tuning
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: None,
            access_token: None,
            user_id: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            environment: Environment::default(),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `TAJY_SUPABASE_URL` or `SUPABASE_URL`: project URL (required)
    /// - `SUPABASE_ANON_KEY`: anon key
    /// - `TAJY_ACCESS_TOKEN`: user session token
    /// - `TAJY_USER_ID`: user the claims belong to
    /// - `TAJY_ENV`: environment (development/staging/production)
    /// - `TAJY_TIMEOUT_SECS`: request timeout in seconds
    pub fn from_env() -> ApiResult<Self> {
        let environment = Environment::from_env();

        let base_url = env::var("TAJY_SUPABASE_URL")
            .or_else(|_| env::var("SUPABASE_URL"))
            .map_err(|_| ApiError::missing_env("SUPABASE_URL"))?;

        let timeout = env::var("TAJY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(30), Duration::from_secs);

        Ok(Self {
            base_url,
            anon_key: non_empty_var("SUPABASE_ANON_KEY"),
            access_token: non_empty_var("TAJY_ACCESS_TOKEN"),
            user_id: non_empty_var("TAJY_USER_ID"),
            timeout,
            retry: environment.retry_policy(),
            circuit_breaker: CircuitBreakerConfig::default(),
            environment,
        })
    }

    /// Local Supabase started with `supabase start`
    #[must_use]
    pub fn development() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::quick(),
            environment: Environment::Development,
            ..Self::new("http://localhost:54321")
        }
    }

    /// Builder-style method to set the project URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the anon key
    #[must_use]
    pub fn with_anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    /// Builder-style method to set the session token
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Builder-style method to set the user id
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set circuit breaker tuning
    #[must_use]
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// PostgREST root, e.g. `https://xyz.supabase.co/rest/v1`
    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/{REST_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Token sent as `Authorization: Bearer`
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_deref().or(self.anon_key.as_deref())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::InvalidUrl(self.base_url.clone()));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.retry.max_attempts == 0 {
            return Err(ApiError::config("retry.max_attempts must be at least 1"));
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
