//! Upstream request client: one GET per call, wrapped in retry/backoff.
//!
//! The client returns raw response bodies; parsing lives in
//! [`crate::provider`].

mod http_client;
mod retry;

pub use http_client::{CONNECT_TIMEOUT_SECS, HttpTimeouts, READ_TIMEOUT_SECS, build_http_client};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, FailureType, NOT_FOUND_NOTICE, RATE_LIMIT_NOTICE,
    RetryDecision, RetryPolicy, classify_error, error_for_status, retry_with_backoff,
};

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::ScholarError;

/// Header carrying the Semantic Scholar API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Receives user-facing advisories (rate limiting, paper not found).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Forwards advisories to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        warn!(notice = message, "upstream advisory");
    }
}

/// HTTP client with retry/backoff for provider APIs.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    policy: RetryPolicy,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    /// Creates a client with default timeouts, the default policy and a tracing notifier.
    ///
    /// # Errors
    ///
    /// Returns [`ScholarError::HttpClient`] when client construction fails.
    pub fn new() -> Result<Self, ScholarError> {
        Ok(Self::with_client(build_http_client(HttpTimeouts::default())?))
    }

    /// Wraps an existing reqwest client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GETs `url` and returns the body, retrying per the policy.
    ///
    /// A non-empty `api_key` is sent as `x-api-key`.
    ///
    /// # Errors
    ///
    /// `UpstreamNotFound` on 404 (no retry), `UpstreamRateLimited` when 429
    /// persists through the last attempt, `UpstreamError` for other failures.
    #[tracing::instrument(skip(self, api_key), fields(has_api_key = api_key.is_some_and(|k| !k.is_empty())))]
    pub async fn get_text(&self, url: &str, api_key: Option<&str>) -> Result<String, ScholarError> {
        let api_key = api_key.map(str::trim).filter(|key| !key.is_empty());
        retry_with_backoff(&self.policy, self.notifier.as_ref(), |attempt| {
            self.get_once(url, api_key, attempt)
        })
        .await
    }

    async fn get_once(
        &self,
        url: &str,
        api_key: Option<&str>,
        attempt: u32,
    ) -> Result<String, ScholarError> {
        debug!(url, attempt, "sending upstream request");
        let mut request = self.client.get(url);
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| ScholarError::upstream(url, error.to_string()))?;

        let status = response.status().as_u16();
        if let Some(error) = error_for_status(url, status) {
            debug!(url, attempt, status, "upstream returned error status");
            return Err(error);
        }

        response
            .text()
            .await
            .map_err(|error| ScholarError::upstream(url, format!("failed to read body: {error}")))
    }
}
