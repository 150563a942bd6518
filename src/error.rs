//! Error types for identifier resolution, upstream fetches and library matching.
//!
//! Messages follow the project's "what happened / Suggestion" layout so the
//! CLI can print them verbatim.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by the resolution and reconciliation pipeline.
#[derive(Debug, Error)]
pub enum ScholarError {
    /// The input did not classify as any known provider.
    #[error("invalid identifier '{input}': {reason}\n  Suggestion: {suggestion}")]
    InvalidIdentifier {
        /// The raw input
        input: String,
        /// Why classification failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// A library check was requested without any search field.
    #[error(
        "invalid library query: no url, title, citekey or bibliography string supplied\n  Suggestion: Provide at least one search field"
    )]
    InvalidQuery,

    /// The provider answered 404.
    #[error("paper not found at '{url}'\n  Suggestion: Check the identifier; the provider has no record of it")]
    UpstreamNotFound {
        /// Request URL
        url: String,
    },

    /// The provider answered 429 on the final attempt.
    #[error(
        "rate limit exceeded for '{url}'\n  Suggestion: Wait a minute or configure an API key (s2_api_key)"
    )]
    UpstreamRateLimited {
        /// Request URL
        url: String,
    },

    /// Any other non-2xx status, transport failure or provider error payload.
    #[error("upstream request to '{url}' failed{}: {message}\n  Suggestion: Retry later or check network connectivity", status_suffix(.status))]
    UpstreamError {
        /// Request URL
        url: String,
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        /// Underlying message
        message: String,
    },

    /// A search or references call returned no results.
    #[error("no data returned from '{url}'\n  Suggestion: Try a broader query or a different identifier")]
    NoDataReturned {
        /// Request URL
        url: String,
    },

    /// The payload did not have the expected shape.
    #[error("malformed response from '{url}': {reason}")]
    MalformedResponse {
        /// Request URL
        url: String,
        /// What was missing or unparsable
        reason: String,
    },

    /// Local notes or bibliography file access failed.
    #[error("cannot access '{}': {source}", .path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {0}")]
    HttpClient(String),
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with HTTP {s}")).unwrap_or_default()
}

impl ScholarError {
    /// Creates an `InvalidIdentifier` error.
    #[must_use]
    pub fn invalid_identifier(input: &str, reason: &str) -> Self {
        Self::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.to_string(),
            suggestion: "Use an arxiv.org, aclanthology.org or semanticscholar.org URL".to_string(),
        }
    }

    /// Creates an `UpstreamError` from a status code.
    #[must_use]
    pub fn upstream_status(url: &str, status: u16) -> Self {
        Self::UpstreamError {
            url: url.to_string(),
            status: Some(status),
            message: format!("provider answered HTTP {status}"),
        }
    }

    /// Creates an `UpstreamError` for a transport failure or error payload.
    #[must_use]
    pub fn upstream(url: &str, message: impl Into<String>) -> Self {
        Self::UpstreamError {
            url: url.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `NoDataReturned` error.
    #[must_use]
    pub fn no_data(url: &str) -> Self {
        Self::NoDataReturned {
            url: url.to_string(),
        }
    }

    /// Wraps an IO error with the path it concerns.
    #[must_use]
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
