//! Resolve, fetch and reconcile: the two entry points callers need.
//!
//! [`Scholar::resolve_and_fetch`] turns a URL, citation string or title into a
//! [`PaperRecord`]; [`Scholar::check_library`] runs the matcher over a snapshot
//! of local records. Failures from normalization, fetching and parsing are
//! returned unchanged.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::ScholarError;
use crate::library::{
    LibraryMatchResult, LibrarySearchQuery, LibrarySource, LocalRecord, MatchOptions,
    check_library_with,
};
use crate::parser::{
    PaperIdentifier, Provider, is_valid_url, normalize_identifier, parse_bib_string,
};
use crate::provider::Endpoints;
use crate::provider::arxiv::fetch_arxiv_paper;
use crate::provider::semantic_scholar::{lookup_paper, paper_references, search_papers};
use crate::record::PaperRecord;
use crate::upstream::UpstreamClient;

/// A fetched record together with any existing library entry for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub record: PaperRecord,
    pub existing: LibraryMatchResult,
}

/// Orchestrates identifier normalization, provider fetches and library checks.
#[derive(Debug, Clone)]
pub struct Scholar {
    client: UpstreamClient,
    endpoints: Endpoints,
    api_key: Option<String>,
    match_options: MatchOptions,
}

impl Scholar {
    /// Creates an orchestrator with default endpoints and no API key.
    ///
    /// # Errors
    ///
    /// Returns [`ScholarError::HttpClient`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, ScholarError> {
        Ok(Self::with_client(UpstreamClient::new()?))
    }

    #[must_use]
    pub fn with_client(client: UpstreamClient) -> Self {
        Self {
            client,
            endpoints: Endpoints::default(),
            api_key: None,
            match_options: MatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the Semantic Scholar API key; blank keys are ignored.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    #[must_use]
    pub fn with_match_options(mut self, options: MatchOptions) -> Self {
        self.match_options = options;
        self
    }

    #[must_use]
    pub fn match_options(&self) -> &MatchOptions {
        &self.match_options
    }

    /// Fetches the record for an already-normalized identifier.
    ///
    /// arXiv ids go to the arXiv API; everything else goes to Semantic
    /// Scholar with the configured API key.
    ///
    /// # Errors
    ///
    /// Upstream and parse failures, unchanged.
    #[instrument(skip(self), fields(provider = %identifier.provider()))]
    pub async fn fetch_identifier(
        &self,
        identifier: &PaperIdentifier,
    ) -> Result<PaperRecord, ScholarError> {
        match identifier.provider() {
            Provider::Arxiv => {
                fetch_arxiv_paper(&self.client, &self.endpoints, identifier.provider_id()).await
            }
            Provider::AclAnthology | Provider::SemanticScholar => {
                lookup_paper(
                    &self.client,
                    &self.endpoints,
                    &identifier.semantic_scholar_id(),
                    self.api_key.as_deref(),
                )
                .await
            }
        }
    }

    /// Resolves a URL, citation string, BibTeX entry or bare title and
    /// fetches its record.
    ///
    /// URLs are normalized directly. Other text goes through the citation
    /// heuristics: a recovered URL is normalized, otherwise a recovered title
    /// (or the whole single-line input) is searched and the first hit returned.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` when nothing usable can be recovered from `input`,
    /// plus any upstream or parse failure.
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    pub async fn resolve_and_fetch(&self, input: &str) -> Result<PaperRecord, ScholarError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ScholarError::invalid_identifier(input, "input is empty"));
        }

        if looks_like_url(input) {
            let identifier = normalize_identifier(input)?;
            return self.fetch_identifier(&identifier).await;
        }

        let hints = parse_bib_string(input);
        let title = hints.title.clone().or_else(|| plain_title(input));
        if let Some(url) = &hints.url {
            match normalize_identifier(url) {
                Ok(identifier) => return self.fetch_identifier(&identifier).await,
                Err(error) if title.is_none() => return Err(error),
                Err(_) => debug!(url = %url, "citation URL not a known provider, searching by title"),
            }
        }

        let Some(title) = title else {
            return Err(ScholarError::invalid_identifier(
                input,
                "no paper URL or title could be recovered",
            ));
        };
        let mut results = self.search(&title).await?;
        info!(title = %title, candidates = results.len(), "resolved by title search");
        Ok(results.swap_remove(0))
    }

    /// Searches Semantic Scholar by free text; at most five records.
    ///
    /// # Errors
    ///
    /// `NoDataReturned` on an empty result, plus upstream failures.
    pub async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, ScholarError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScholarError::invalid_identifier(query, "search query is empty"));
        }
        search_papers(&self.client, &self.endpoints, query, self.api_key.as_deref()).await
    }

    /// Lists papers cited by the paper at `url`; at most fifty records.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` for unknown URLs, `NoDataReturned` on an empty
    /// result, plus upstream failures.
    pub async fn references(&self, url: &str) -> Result<Vec<PaperRecord>, ScholarError> {
        let identifier = normalize_identifier(url)?;
        paper_references(
            &self.client,
            &self.endpoints,
            &identifier.semantic_scholar_id(),
            self.api_key.as_deref(),
        )
        .await
    }

    /// Runs the library matcher with this orchestrator's match options.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` when the query has no search field.
    pub fn check_library(
        &self,
        query: &LibrarySearchQuery,
        records: &[LocalRecord],
    ) -> Result<LibraryMatchResult, ScholarError> {
        check_library_with(query, records, &self.match_options)
    }

    /// Validates `query`, then checks a fresh snapshot of `library`.
    ///
    /// An empty query fails before the library is read.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` when the query has no search field, or any snapshot
    /// failure.
    #[instrument(skip(self, query, library))]
    pub async fn check_library_source(
        &self,
        query: &LibrarySearchQuery,
        library: &dyn LibrarySource,
    ) -> Result<LibraryMatchResult, ScholarError> {
        query.validate()?;
        let records = library.snapshot().await?;
        self.check_library(query, &records)
    }

    /// Fetches and parses `input`, then checks a fresh library snapshot for it.
    ///
    /// # Errors
    ///
    /// Any failure from [`Self::resolve_and_fetch`] or the snapshot.
    #[instrument(skip(self, input, library))]
    pub async fn fetch_and_reconcile(
        &self,
        input: &str,
        library: &dyn LibrarySource,
    ) -> Result<Reconciliation, ScholarError> {
        let record = self.resolve_and_fetch(input).await?;
        let records = library.snapshot().await?;
        let existing = self.check_library(&LibrarySearchQuery::from_record(&record), &records)?;
        if existing.found {
            info!(
                path = existing.matched_path.as_deref().unwrap_or(""),
                "paper already in library"
            );
        }
        Ok(Reconciliation { record, existing })
    }
}

/// Resolves and fetches with a default orchestrator.
///
/// # Errors
///
/// See [`Scholar::resolve_and_fetch`].
pub async fn resolve_and_fetch(
    input: &str,
    api_key: Option<&str>,
) -> Result<PaperRecord, ScholarError> {
    Scholar::new()?
        .with_api_key(api_key.map(str::to_string))
        .resolve_and_fetch(input)
        .await
}

/// Checks `records` for the paper described by `query` with default options.
///
/// # Errors
///
/// `InvalidQuery` when the query has no search field.
pub fn check_library(
    query: &LibrarySearchQuery,
    records: &[LocalRecord],
) -> Result<LibraryMatchResult, ScholarError> {
    crate::library::check_library(query, records)
}

/// Absolute URLs plus scheme-less `host.tld/path` pastes.
fn looks_like_url(input: &str) -> bool {
    if is_valid_url(input) {
        return true;
    }
    !input.contains(char::is_whitespace)
        && !input.starts_with('@')
        && (input.contains("://") || (input.contains('.') && input.contains('/')))
}

fn plain_title(input: &str) -> Option<String> {
    (!input.starts_with('@') && !input.contains('\n')).then(|| input.to_string())
}
