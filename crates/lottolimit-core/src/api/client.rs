//! API client for communicating with the limits service.
//!
//! This module provides the `ApiClient` struct: one logical request in,
//! one parsed JSON body out, with rate limiting and transient failures
//! retried behind the caller's back and repeated reads served from cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Transport};
use super::ApiError;
use crate::cache::ResponseCache;

// ============================================================================
// Constants
// ============================================================================

/// Total attempts per logical request, the first one included.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the second attempt; doubles for each one after.
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry budget and backoff base for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// `base_delay * 2^attempt_index`, no jitter.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        match 2u32.checked_pow(attempt_index) {
            Some(factor) => self.base_delay.saturating_mul(factor),
            None => Duration::MAX,
        }
    }
}

/// Method, extra headers and JSON body of a request.
///
/// Serialized together with the URL this forms the cache key, so two reads
/// only share a cache entry when they are identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestOptions {
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    fn cache_key(&self, url: &str) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        format!("{}{}", url, serialized)
    }
}

/// API client for the limits service.
/// Clone is cheap - clones share the transport's connection pool and the response cache.
#[derive(Clone)]
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
    cache: Arc<ResponseCache>,
}

impl ApiClient<HttpTransport> {
    /// Create a new API client over HTTP
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self::with_transport(HttpTransport::new()?, base_url))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            retry: RetryPolicy::default(),
            cache: Arc::new(ResponseCache::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the response cache, e.g. with one driven by a manual clock.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool and cache.
    pub fn with_token(&self, token: String) -> Self
    where
        T: Clone,
    {
        Self {
            transport: self.transport.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            retry: self.retry,
            cache: self.cache.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/api/settings`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Perform one logical request and return its parsed JSON body.
    ///
    /// Reads with `use_cache` are answered from a fresh cache entry without
    /// any network access. Successful reads are stored in the cache; a
    /// successful write clears the entire cache. Failures are retried per
    /// the `RetryPolicy` and surface only once the budget is spent.
    pub async fn request(
        &self,
        url: &str,
        options: &RequestOptions,
        use_cache: bool,
    ) -> Result<Value, ApiError> {
        let is_read = options.method.is_read();
        let cache_key = options.cache_key(url);

        if is_read && use_cache {
            if let Some(data) = self.cache.get(&cache_key) {
                debug!(url = url, "Serving response from cache");
                return Ok(data);
            }
        }

        let response = self.send_with_retry(url, options).await?;
        let data = Self::parse_body(url, &response.body)?;

        if is_read {
            self.cache.insert(cache_key, data.clone());
        } else {
            // A write may invalidate any number of cached reads
            self.cache.clear();
        }

        Ok(data)
    }

    /// GET an API path (cached) and deserialize the body.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let url = self.url(path);
        let data = self.request(&url, &RequestOptions::get(), true).await?;
        serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    /// Send a write to an API path and deserialize whatever the server answers.
    /// An empty answer deserializes as an empty object.
    pub async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, ApiError> {
        let url = self.url(path);
        let options = Self::options_for(method, body)?;

        let mut data = self.request(&url, &options, false).await?;
        if data.is_null() {
            data = Value::Object(Default::default());
        }
        serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    /// Send exactly one request and hand back the raw response whatever its
    /// status. Bypasses retry and the cache entirely, for calls such as
    /// credential checks where a rejection is an answer, not a fault.
    pub async fn send_once<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.url(path);
        let options = Self::options_for(method, body)?;
        let request = self.prepare(&url, &options);
        self.transport.send(&request).await
    }

    fn options_for<B: Serialize>(method: HttpMethod, body: Option<&B>) -> Result<RequestOptions, ApiError> {
        let mut options = RequestOptions::method(method);
        if let Some(body) = body {
            let body = serde_json::to_value(body)
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
            options = options.with_body(body);
        }
        Ok(options)
    }

    fn prepare(&self, url: &str, options: &RequestOptions) -> HttpRequest {
        let mut headers = BTreeMap::new();
        if options.body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        if let Some(ref token) = self.token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        // Caller headers win over the defaults
        headers.extend(options.headers.clone());

        HttpRequest {
            method: options.method,
            url: url.to_string(),
            headers,
            body: options.body.as_ref().map(Value::to_string),
        }
    }

    async fn send_with_retry(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, ApiError> {
        let request = self.prepare(url, options);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match self.transport.send(&request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => ApiError::from_status(response.status, &response.body),
                Err(e) => e,
            };

            attempt += 1;
            if attempt >= max_attempts {
                warn!(
                    method = request.method.as_str(),
                    url = url,
                    attempts = attempt,
                    error = %error,
                    "Request failed, retries exhausted"
                );
                return Err(error);
            }

            let backoff = self.retry.delay_for(attempt - 1);
            if matches!(error, ApiError::RateLimited) {
                warn!(url = url, retry = attempt, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
            } else {
                warn!(
                    url = url,
                    retry = attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "Request failed, backing off"
                );
            }
            tokio::time::sleep(backoff).await;
        }
    }

    fn parse_body(url: &str, body: &str) -> Result<Value, ApiError> {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e)))
    }
}

// ============================================================================
// Tests
// ============================================================================
