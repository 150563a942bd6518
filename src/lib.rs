//! Scholar Core Library
//!
//! Resolves scholarly paper identifiers into one canonical metadata record
//! and reconciles that record against a local notes library.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - URL classification, citation-string heuristics, BibTeX helpers
//! - [`upstream`] - HTTP client with retry/backoff and rate-limit advisories
//! - [`provider`] - arXiv Atom and Semantic Scholar JSON parsers
//! - [`library`] - note snapshots, duplicate detection, `.bib` file upkeep
//! - [`orchestrator`] - `resolve_and_fetch` / `check_library` entry points
//!
//! # Example
//!
//! ```
//! use scholar_core::{LibrarySearchQuery, LocalRecord, PaperRecord, check_library};
//!
//! let local = LocalRecord {
//!     path: "papers/attention.md".to_string(),
//!     record: PaperRecord::new(Some("Attention Is All You Need")),
//! };
//! let query = LibrarySearchQuery {
//!     title: Some("attention is all you need".to_string()),
//!     ..LibrarySearchQuery::default()
//! };
//! let result = check_library(&query, &[local]).unwrap();
//! assert!(result.found);
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod library;
pub mod orchestrator;
pub mod parser;
pub mod provider;
pub mod record;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use error::ScholarError;
pub use library::{
    AppendOutcome, BibFile, LibraryMatchResult, LibrarySearchQuery, LibrarySource, LocalRecord,
    MatchOptions, MatchTier, NoteLibrary, check_library_with,
};
pub use orchestrator::{Reconciliation, Scholar, check_library, resolve_and_fetch};
pub use parser::{PaperIdentifier, Provider, normalize_identifier, parse_bib_string};
pub use provider::Endpoints;
pub use record::{PaperRecord, TITLE_PLACEHOLDER};
pub use upstream::{
    HttpTimeouts, Notifier, RetryPolicy, TracingNotifier, UpstreamClient, build_http_client,
};
