//! Error types for the API client

use tajy_core::{Error as CoreError, ErrorCode};
use tajy_search::SearchError;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// No user id configured; every claim query is scoped to one user
    #[error("No authenticated user configured")]
    MissingUser,

    /// PostgREST returned an error response
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error body from the backend
        message: String,
    },

    /// A claim with this number already exists for the user
    #[error("A claim numbered {0} already exists")]
    Duplicate(String),

    /// A write returned no row
    #[error("Claim {0} not found")]
    NotFound(i64),

    /// Circuit breaker is open
    #[error("Circuit breaker is open - backend temporarily unavailable")]
    CircuitOpen,

    /// Request timeout
    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// PostgreSQL unique violation, surfaced by PostgREST as the error `code`
const UNIQUE_VIOLATION: &str = "23505";

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing env var error
    pub fn missing_env(var: impl Into<String>) -> Self {
        Self::MissingEnvVar(var.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) => true,
            Self::CircuitOpen
            | Self::Config(_)
            | Self::MissingEnvVar(_)
            | Self::MissingUser
            | Self::Json(_)
            | Self::Duplicate(_)
            | Self::NotFound(_)
            | Self::InvalidUrl(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if *status >= 500)
    }

    /// Whether the backend rejected a write on a unique constraint
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::ApiResponse { status: 409, message } if message.contains(UNIQUE_VIOLATION)
        )
    }

    /// Error code used when this error reaches the CLI
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) | Self::InvalidUrl(_) => ErrorCode::ConfigError,
            Self::MissingEnvVar(_) | Self::MissingUser => ErrorCode::MissingCredentials,
            Self::ApiResponse { status: 401 | 403, .. } => ErrorCode::Unauthorized,
            Self::Timeout(_) => ErrorCode::BackendTimeout,
            Self::Request(e) if e.is_timeout() => ErrorCode::BackendTimeout,
            Self::Duplicate(_) => ErrorCode::InvalidInput,
            Self::Json(_) => ErrorCode::InvalidFormat,
            Self::CircuitOpen | Self::RetriesExhausted { .. } => ErrorCode::SourceUnavailable,
            Self::Request(_) | Self::ApiResponse { .. } | Self::NotFound(_) => {
                ErrorCode::BackendError
            }
        }
    }
}

impl From<ApiError> for SearchError {
    fn from(err: ApiError) -> Self {
        SearchError::source_unavailable(err)
    }
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        let code = err.code();
        let error = CoreError::new(code, err.to_string());
        match err {
            ApiError::MissingEnvVar(_) | ApiError::MissingUser => error.with_suggestion(
                "Set SUPABASE_URL, SUPABASE_ANON_KEY, TAJY_ACCESS_TOKEN and TAJY_USER_ID",
            ),
            ApiError::ApiResponse { status: 401 | 403, .. } => {
                error.with_suggestion("Refresh TAJY_ACCESS_TOKEN; the session may have expired")
            }
            other => error.with_source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ApiError::api_response(503, "unavailable").is_retryable());
        assert!(ApiError::api_response(429, "slow down").is_retryable());
        assert!(!ApiError::api_response(400, "bad filter").is_retryable());
        assert!(!ApiError::MissingUser.is_retryable());
        assert!(!ApiError::Duplicate("S-1".into()).is_retryable());
    }

    #[test]
    fn test_unique_violation() {
        let err = ApiError::api_response(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert!(err.is_unique_violation());
        assert!(!ApiError::api_response(409, "conflict").is_unique_violation());
    }

    #[test]
    fn test_codes() {
        assert_eq!(ApiError::MissingUser.code(), ErrorCode::MissingCredentials);
        assert_eq!(ApiError::api_response(401, "jwt expired").code(), ErrorCode::Unauthorized);
        assert_eq!(ApiError::CircuitOpen.code(), ErrorCode::SourceUnavailable);
    }

    #[test]
    fn test_into_search_error() {
        let err: SearchError = ApiError::MissingUser.into();
        assert!(matches!(err, SearchError::SourceUnavailable(msg) if msg.contains("user")));
    }

    #[test]
    fn test_into_core_error() {
        let err: CoreError = ApiError::api_response(403, "denied").into();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(err.suggestion.is_some());
    }
}
