//! HTTP client construction shared by every upstream call.

use std::time::Duration;

use reqwest::Client;

use crate::error::ScholarError;
use crate::user_agent;

/// Default connect timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default whole-request timeout.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Network timeouts for upstream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Builds the upstream HTTP client with the project user agent.
///
/// # Errors
///
/// Returns [`ScholarError::HttpClient`] when the TLS backend cannot be initialized.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, ScholarError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
        .build()
        .map_err(|error| ScholarError::HttpClient(error.to_string()))
}
