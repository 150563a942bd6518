//! Local library: note snapshots, duplicate detection and the shared `.bib` file.
//!
//! The matcher never reads storage itself; callers pass a snapshot of
//! [`LocalRecord`]s, usually produced by a [`LibrarySource`].

mod bibfile;
mod matcher;
mod notes;

pub use bibfile::{AppendOutcome, BibFile};
pub use matcher::{
    AUTHOR_MATCH_THRESHOLD, MatchOptions, TITLE_MATCH_THRESHOLD, authors_match, check_library,
    check_library_with, normalize_title, titles_match,
};
pub use notes::{NoteLibrary, parse_note};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ScholarError;
use crate::record::PaperRecord;

/// A record read from local storage, paired with where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalRecord {
    pub path: String,
    pub record: PaperRecord,
}

/// What to look for in the library. At least one of `url`, `title`,
/// `citekey` or `bib_string` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySearchQuery {
    pub url: Option<String>,
    pub title: Option<String>,
    pub citekey: Option<String>,
    /// Free-text citation; its URL/title only fill fields left unset above.
    pub bib_string: Option<String>,
    /// Used only by the optional author tier.
    pub authors: Vec<String>,
}

impl LibrarySearchQuery {
    /// Builds a query describing an already-fetched record.
    #[must_use]
    pub fn from_record(record: &PaperRecord) -> Self {
        Self {
            url: record.url.clone(),
            title: Some(record.title.clone()),
            citekey: record.citekey.clone(),
            bib_string: None,
            authors: record.authors.clone(),
        }
    }

    /// Fails with `InvalidQuery` unless `url`, `title`, `citekey` or
    /// `bib_string` holds non-blank text. Authors alone never qualify.
    ///
    /// # Errors
    ///
    /// [`ScholarError::InvalidQuery`] when every search field is blank.
    pub fn validate(&self) -> Result<(), ScholarError> {
        let has_text = [&self.url, &self.title, &self.citekey, &self.bib_string]
            .into_iter()
            .any(|field| field.as_deref().is_some_and(|text| !text.trim().is_empty()));
        if has_text {
            Ok(())
        } else {
            Err(ScholarError::InvalidQuery)
        }
    }
}

/// Which matcher tier produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Url,
    Citekey,
    Title,
    Authors,
}

/// Outcome of a library check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryMatchResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_record: Option<PaperRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<MatchTier>,
}

impl LibraryMatchResult {
    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn matched(local: &LocalRecord, tier: MatchTier) -> Self {
        Self {
            found: true,
            matched_path: Some(local.path.clone()),
            matched_record: Some(local.record.clone()),
            tier: Some(tier),
        }
    }
}

/// Produces a fresh snapshot of local records on every call.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<LocalRecord>, ScholarError>;
}

#[async_trait]
impl LibrarySource for Vec<LocalRecord> {
    async fn snapshot(&self) -> Result<Vec<LocalRecord>, ScholarError> {
        Ok(self.clone())
    }
}
