//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::ClaimsApi;
use crate::error::{ApiError, ApiResult};
use crate::query::{parse_content_range_total, range_header, RestQuery};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tajy_core::config::BackendSettings;
use tajy_core::resilience::{CircuitBreaker, CircuitState};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// API key header for Supabase
const APIKEY_HEADER: &str = "apikey";

/// PostgREST preference header
const PREFER: &str = "Prefer";

/// One page of rows plus the backend's total count, when it reported one
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows in this page
    pub rows: Vec<T>,
    /// Rows matching the filter across all pages
    pub total: Option<u64>,
}

/// A request to the REST endpoint
struct Call<'a> {
    method: Method,
    table: &'a str,
    query: &'a RestQuery,
    headers: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    /// Safe to send again after a lost response
    replayable: bool,
}

struct RawResponse {
    content_range: Option<String>,
    body: String,
}

/// PostgREST client for the Tajy Supabase project
///
/// This client wraps `reqwest` and adds:
/// - Automatic retry with exponential backoff
/// - Circuit breaker to prevent hammering a failing backend
/// - Request correlation IDs for tracing
#[derive(Debug, Clone)]
pub struct TajyClient {
    inner: Client,
    config: Arc<ClientConfig>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl TajyClient {
    /// Create a new client with configuration from environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tajy-api-client/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(ref key) = config.anon_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| ApiError::config("anon key is not a valid header value"))?;
            default_headers.insert(APIKEY_HEADER, value);
        }

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));

        Ok(Self {
            inner,
            config: Arc::new(config),
            circuit_breaker,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The configured user, or [`ApiError::MissingUser`]
    pub fn user_id(&self) -> ApiResult<&str> {
        self.config
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingUser)
    }

    /// Get circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// Claims on the default `siniestros` table
    #[must_use]
    pub fn claims(&self) -> ClaimsApi {
        self.claims_with(BackendSettings::default())
    }

    /// Claims on a configured table
    #[must_use]
    pub fn claims_with(&self, settings: BackendSettings) -> ClaimsApi {
        ClaimsApi::new(self.clone(), settings)
    }

    // -------------------------------------------------------------------------
    // Table operations with resilience
    // -------------------------------------------------------------------------

    /// `GET /rest/v1/<table>?<query>`
    #[instrument(skip(self, query), fields(request_id = tracing::field::Empty))]
    pub async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RestQuery,
    ) -> ApiResult<Vec<T>> {
        let call = Call {
            method: Method::GET,
            table,
            query,
            headers: Vec::new(),
            body: None,
            replayable: true,
        };
        let raw = self.request(&call).await?;
        Ok(serde_json::from_str(&raw.body)?)
    }

    /// Ranged `GET` returning `len` rows from `offset` and the exact total
    ///
    /// A page past the end is empty rather than an error.
    #[instrument(skip(self, query), fields(request_id = tracing::field::Empty))]
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RestQuery,
        offset: usize,
        len: usize,
    ) -> ApiResult<Page<T>> {
        let call = Call {
            method: Method::GET,
            table,
            query,
            headers: vec![
                ("Range-Unit", "items".to_string()),
                ("Range", range_header(offset, len)),
                (PREFER, "count=exact".to_string()),
            ],
            body: None,
            replayable: true,
        };

        match self.request(&call).await {
            Ok(raw) => Ok(Page {
                rows: serde_json::from_str(&raw.body)?,
                total: raw.content_range.as_deref().and_then(parse_content_range_total),
            }),
            Err(ApiError::ApiResponse { status, .. })
                if status == StatusCode::RANGE_NOT_SATISFIABLE.as_u16() =>
            {
                debug!(offset, "Page past the end");
                Ok(Page {
                    rows: Vec::new(),
                    total: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// `POST` a row and return what the backend stored
    ///
    /// Sent once: the retry policy does not apply to inserts.
    #[instrument(skip(self, row), fields(request_id = tracing::field::Empty))]
    pub async fn insert<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        row: &B,
    ) -> ApiResult<Vec<T>> {
        let query = RestQuery::new();
        let call = Call {
            method: Method::POST,
            table,
            query: &query,
            headers: vec![(PREFER, "return=representation".to_string())],
            body: Some(serde_json::to_value(row)?),
            // a lost response may hide a committed row
            replayable: false,
        };
        let raw = self.request(&call).await?;
        Ok(serde_json::from_str(&raw.body)?)
    }

    /// `PATCH` rows matching `query` and return them
    #[instrument(skip(self, query, changes), fields(request_id = tracing::field::Empty))]
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        query: &RestQuery,
        changes: &B,
    ) -> ApiResult<Vec<T>> {
        let call = Call {
            method: Method::PATCH,
            table,
            query,
            headers: vec![(PREFER, "return=representation".to_string())],
            body: Some(serde_json::to_value(changes)?),
            replayable: true,
        };
        let raw = self.request(&call).await?;
        Ok(serde_json::from_str(&raw.body)?)
    }

    /// `DELETE` rows matching `query`
    #[instrument(skip(self, query), fields(request_id = tracing::field::Empty))]
    pub async fn delete(&self, table: &str, query: &RestQuery) -> ApiResult<()> {
        let call = Call {
            method: Method::DELETE,
            table,
            query,
            headers: Vec::new(),
            body: None,
            replayable: true,
        };
        self.request(&call).await.map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Request execution
    // -------------------------------------------------------------------------

    async fn request(&self, call: &Call<'_>) -> ApiResult<RawResponse> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        if !self.circuit_breaker.can_execute() {
            warn!(
                request_id = %request_id,
                table = call.table,
                "Circuit breaker is open, rejecting request"
            );
            return Err(ApiError::CircuitOpen);
        }

        self.execute_with_retry(&request_id, call).await
    }

    async fn execute_with_retry(
        &self,
        request_id: &str,
        call: &Call<'_>,
    ) -> ApiResult<RawResponse> {
        let retry = &self.config.retry;
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                let delay = retry.delay_for_attempt(attempt);
                debug!(
                    request_id = %request_id,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let result = self.execute_single_request(request_id, call).await;
            let elapsed = start.elapsed();

            match result {
                Ok(value) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        request_id = %request_id,
                        method = %call.method,
                        attempt = attempt + 1,
                        elapsed_ms = elapsed.as_millis(),
                        "Request succeeded"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    self.circuit_breaker.record_failure();
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Request failed"
                    );
                    if !call.replayable {
                        return Err(e);
                    }
                    last_error = Some(e);
                    if !self.circuit_breaker.can_execute() {
                        break;
                    }
                }
                Err(e) => {
                    // the backend answered, it just refused this request
                    self.circuit_breaker.record_success();
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Request rejected, not retrying"
                    );
                    return Err(e);
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            attempts: retry.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    async fn execute_single_request(
        &self,
        request_id: &str,
        call: &Call<'_>,
    ) -> ApiResult<RawResponse> {
        let url = format!("{}/{}", self.config.rest_url(), call.table);
        let mut request = self
            .inner
            .request(call.method.clone(), &url)
            .query(call.query.pairs())
            .header(X_REQUEST_ID, request_id);

        if let Some(token) = self.config.bearer_token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        for (name, value) in &call.headers {
            request = request.header(*name, value);
        }

        if let Some(ref body) = call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if status.is_success() {
            Ok(RawResponse {
                content_range,
                body,
            })
        } else {
            Err(ApiError::api_response(status.as_u16(), body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = TajyClient::with_config(ClientConfig::development().with_anon_key("anon"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let client = TajyClient::with_config(ClientConfig::new("not a url"));
        assert!(matches!(client, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_user_id_required() {
        let client = TajyClient::with_config(ClientConfig::development()).unwrap();
        assert!(matches!(client.user_id(), Err(ApiError::MissingUser)));

        let client =
            TajyClient::with_config(ClientConfig::development().with_user_id("u-1")).unwrap();
        assert_eq!(client.user_id().unwrap(), "u-1");
    }

    #[test]
    fn test_starts_closed() {
        let client = TajyClient::with_config(ClientConfig::development()).unwrap();
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }
}
