//! Canonical paper record shared by every provider and the local library.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::extract_citekey;

/// Title used when a provider omits one.
pub const TITLE_PLACEHOLDER: &str = "Untitled";

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Unified paper metadata, independent of the provider it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// Filled in by a download step, never by a provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibtex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citekey: Option<String>,
}

impl PaperRecord {
    /// Creates a record with the given title; a blank title becomes [`TITLE_PLACEHOLDER`].
    #[must_use]
    pub fn new(title: Option<&str>) -> Self {
        let title = title
            .map(normalize_whitespace)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string());
        Self {
            title,
            authors: Vec::new(),
            abstract_text: String::new(),
            url: None,
            venue: None,
            publication_date: None,
            tags: Vec::new(),
            pdf_url: None,
            pdf_path: None,
            bibtex: None,
            citekey: None,
        }
    }

    /// Attaches a BibTeX entry and derives the citekey from it.
    ///
    /// Blank entries leave both fields unset.
    #[must_use]
    pub fn with_bibtex(mut self, bibtex: Option<String>) -> Self {
        let bibtex = bibtex.filter(|value| !value.trim().is_empty());
        self.citekey = bibtex.as_deref().and_then(extract_citekey);
        self.bibtex = bibtex;
        self
    }
}

/// Trims and collapses internal whitespace runs to a single space.
#[must_use]
pub fn normalize_whitespace(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

/// Builds a file-name stem for a note from a paper title.
///
/// Only ASCII letters, digits and spaces survive.
#[must_use]
pub fn note_file_stem(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == ' ')
        .collect();
    normalize_whitespace(&kept)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_missing_title_uses_placeholder() {
        assert_eq!(PaperRecord::new(None).title, TITLE_PLACEHOLDER);
        assert_eq!(PaperRecord::new(Some("  \n ")).title, TITLE_PLACEHOLDER);
    }

    #[test]
    fn test_new_record_collapses_title_whitespace() {
        let record = PaperRecord::new(Some("  Attention\n   Is All\tYou Need "));
        assert_eq!(record.title, "Attention Is All You Need");
    }

    #[test]
    fn test_with_bibtex_derives_citekey() {
        let record = PaperRecord::new(Some("Deep"))
            .with_bibtex(Some("@article{smith2020deep, title={Deep}}".to_string()));
        assert_eq!(record.citekey.as_deref(), Some("smith2020deep"));
    }

    #[test]
    fn test_with_bibtex_without_key_leaves_citekey_absent() {
        let record = PaperRecord::new(Some("Deep")).with_bibtex(Some("not bibtex".to_string()));
        assert!(record.bibtex.is_some());
        assert!(record.citekey.is_none());
    }

    #[test]
    fn test_with_bibtex_blank_entry_is_dropped() {
        let record = PaperRecord::new(Some("Deep")).with_bibtex(Some("   ".to_string()));
        assert!(record.bibtex.is_none());
        assert!(record.citekey.is_none());
    }

    #[test]
    fn test_record_citekey_round_trips_through_extractor() {
        let record = PaperRecord::new(Some("Attention")).with_bibtex(Some(
            "@inproceedings{vaswani2017attention,\n  title={Attention Is All You Need},\n  year={2017}\n}"
                .to_string(),
        ));
        let again = extract_citekey(record.bibtex.as_deref().unwrap());
        assert_eq!(again, record.citekey);
    }

    #[test]
    fn test_record_serializes_camel_case_and_abstract_key() {
        let mut record = PaperRecord::new(Some("T"));
        record.abstract_text = "A".to_string();
        record.pdf_url = Some("https://arxiv.org/pdf/1".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["abstract"], "A");
        assert_eq!(json["pdfUrl"], "https://arxiv.org/pdf/1");
        assert!(json.get("pdfPath").is_none());
    }

    #[test]
    fn test_note_file_stem_strips_punctuation() {
        assert_eq!(
            note_file_stem("BERT: Pre-training of Deep Bidirectional Transformers"),
            "BERT Pretraining of Deep Bidirectional Transformers"
        );
        assert_eq!(note_file_stem("Über  Netze?"), "ber Netze");
    }
}
