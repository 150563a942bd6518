//! Layered duplicate detection: URL, then citekey, then fuzzy title, then
//! (when enabled) authors. The first tier with a hit wins.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use super::{LibraryMatchResult, LibrarySearchQuery, LocalRecord, MatchTier};
use crate::error::ScholarError;
use crate::parser::{compile_static_regex, parse_bib_string};

/// Minimum share of candidate-title words matched by search-title words.
pub const TITLE_MATCH_THRESHOLD: f64 = 0.85;

/// Minimum share of query authors found among the candidate's authors.
pub const AUTHOR_MATCH_THRESHOLD: f64 = 0.85;

/// Jaro-Winkler similarity at which two full author names are the same person.
const AUTHOR_NAME_SIMILARITY: f64 = 0.9;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"[^\w\s]"));

/// Matcher tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub title_threshold: f64,
    /// Enables the author tier. Off by default.
    pub author_matching: bool,
    pub author_threshold: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            title_threshold: TITLE_MATCH_THRESHOLD,
            author_matching: false,
            author_threshold: AUTHOR_MATCH_THRESHOLD,
        }
    }
}

/// Query after validation and bibliography-string hint merging.
#[derive(Debug)]
struct ResolvedQuery {
    url: Option<String>,
    title: Option<String>,
    citekey: Option<String>,
}

fn present(value: Option<&String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn resolve_query(query: &LibrarySearchQuery) -> Result<ResolvedQuery, ScholarError> {
    query.validate()?;
    let mut resolved = ResolvedQuery {
        url: present(query.url.as_ref()),
        title: present(query.title.as_ref()),
        citekey: present(query.citekey.as_ref()),
    };
    let bib_string = present(query.bib_string.as_ref());

    if let Some(text) = bib_string {
        let hints = parse_bib_string(&text);
        if resolved.url.is_none() {
            resolved.url = hints.url;
        }
        if resolved.title.is_none() {
            resolved.title = hints.title;
        }
    }
    Ok(resolved)
}

/// Checks `records` for the paper described by `query` using default options.
///
/// # Errors
///
/// [`ScholarError::InvalidQuery`] when no search field is set.
pub fn check_library(
    query: &LibrarySearchQuery,
    records: &[LocalRecord],
) -> Result<LibraryMatchResult, ScholarError> {
    check_library_with(query, records, &MatchOptions::default())
}

/// Checks `records` for the paper described by `query`.
///
/// # Errors
///
/// [`ScholarError::InvalidQuery`] when no search field is set. Validation
/// happens before any record is inspected.
#[instrument(skip(query, records, options), fields(records = records.len()))]
pub fn check_library_with(
    query: &LibrarySearchQuery,
    records: &[LocalRecord],
    options: &MatchOptions,
) -> Result<LibraryMatchResult, ScholarError> {
    let resolved = resolve_query(query)?;

    if let Some(url) = &resolved.url {
        let wanted = url.to_lowercase();
        if let Some(hit) = records.iter().find(|local| {
            local
                .record
                .url
                .as_deref()
                .is_some_and(|candidate| candidate.trim().to_lowercase() == wanted)
        }) {
            debug!(path = %hit.path, "library match by url");
            return Ok(LibraryMatchResult::matched(hit, MatchTier::Url));
        }
    }

    if let Some(citekey) = &resolved.citekey {
        let wanted = citekey.to_lowercase();
        if let Some(hit) = records.iter().find(|local| {
            local
                .record
                .citekey
                .as_deref()
                .is_some_and(|candidate| candidate.trim().to_lowercase() == wanted)
        }) {
            debug!(path = %hit.path, "library match by citekey");
            return Ok(LibraryMatchResult::matched(hit, MatchTier::Citekey));
        }
    }

    if let Some(title) = &resolved.title
        && let Some(hit) = records
            .iter()
            .find(|local| titles_match(title, &local.record.title, options.title_threshold))
    {
        debug!(path = %hit.path, "library match by title");
        return Ok(LibraryMatchResult::matched(hit, MatchTier::Title));
    }

    if options.author_matching
        && !query.authors.is_empty()
        && let Some(hit) = records.iter().find(|local| {
            authors_match(&query.authors, &local.record.authors, options.author_threshold)
        })
    {
        debug!(path = %hit.path, "library match by authors");
        return Ok(LibraryMatchResult::matched(hit, MatchTier::Authors));
    }

    debug!("no library match");
    Ok(LibraryMatchResult::not_found())
}

/// Lowercases, trims, strips non-word characters and collapses whitespace.
#[must_use]
pub fn normalize_title(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    NON_WORD
        .replace_all(&lowered, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fuzzy title comparison.
///
/// Matches on normalized equality, on the search title being a substring of
/// the candidate, or when the number of search words contained in some
/// candidate word, divided by the candidate's word count, reaches `threshold`.
#[must_use]
pub fn titles_match(search: &str, candidate: &str, threshold: f64) -> bool {
    let search = normalize_title(search);
    let candidate = normalize_title(candidate);
    if search.is_empty() || candidate.is_empty() {
        return false;
    }
    if search == candidate || candidate.contains(&search) {
        return true;
    }

    let candidate_words: Vec<&str> = candidate.split(' ').collect();
    let matching = search
        .split(' ')
        .filter(|word| candidate_words.iter().any(|other| other.contains(word)))
        .count();
    word_ratio(matching, candidate_words.len()) >= threshold
}

/// Share of `query` authors that appear among `candidate` authors.
///
/// Two names are the same person when their normalized forms are close by
/// Jaro-Winkler, or when both the surname and the first initial agree.
#[must_use]
pub fn authors_match(query: &[String], candidate: &[String], threshold: f64) -> bool {
    let query: Vec<String> = query
        .iter()
        .map(|name| normalize_title(name))
        .filter(|name| !name.is_empty())
        .collect();
    let candidate: Vec<String> = candidate
        .iter()
        .map(|name| normalize_title(name))
        .filter(|name| !name.is_empty())
        .collect();
    if query.is_empty() || candidate.is_empty() {
        return false;
    }

    let matching = query
        .iter()
        .filter(|name| candidate.iter().any(|other| same_person(name, other)))
        .count();
    word_ratio(matching, query.len()) >= threshold
}

fn same_person(left: &str, right: &str) -> bool {
    if strsim::jaro_winkler(left, right) >= AUTHOR_NAME_SIMILARITY {
        return true;
    }
    let (Some(left_last), Some(right_last)) = (left.rsplit(' ').next(), right.rsplit(' ').next())
    else {
        return false;
    };
    left_last == right_last && left.chars().next() == right.chars().next()
}

#[allow(clippy::cast_precision_loss)]
fn word_ratio(matching: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    matching as f64 / total as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::PaperRecord;

    fn local(path: &str, title: &str, url: Option<&str>, citekey: Option<&str>) -> LocalRecord {
        let mut record = PaperRecord::new(Some(title));
        record.url = url.map(str::to_string);
        record.citekey = citekey.map(str::to_string);
        LocalRecord {
            path: path.to_string(),
            record,
        }
    }

    fn library() -> Vec<LocalRecord> {
        vec![
            local(
                "papers/Attention Is All You Need.md",
                "Attention Is All You Need",
                Some("https://arxiv.org/abs/1706.03762"),
                Some("vaswani2017attention"),
            ),
            local(
                "papers/Deep Residual Learning.md",
                "Deep Residual Learning for Image Recognition",
                Some("https://www.semanticscholar.org/paper/abc"),
                Some("he2016deep"),
            ),
        ]
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_empty_query_is_invalid() {
        let err = check_library(&LibrarySearchQuery::default(), &library()).unwrap_err();
        assert!(matches!(err, ScholarError::InvalidQuery));
    }

    #[test]
    fn test_whitespace_only_query_is_invalid_even_with_empty_library() {
        let query = LibrarySearchQuery {
            url: Some("  ".to_string()),
            title: Some(String::new()),
            authors: vec!["Ashish Vaswani".to_string()],
            ..LibrarySearchQuery::default()
        };
        let err = check_library(&query, &[]).unwrap_err();
        assert!(matches!(err, ScholarError::InvalidQuery));
    }

    // ==================== Tier Order Tests ====================

    #[test]
    fn test_url_tier_wins_without_title_tier() {
        let query = LibrarySearchQuery {
            url: Some("  HTTPS://ARXIV.ORG/abs/1706.03762 ".to_string()),
            title: Some("Completely unrelated quantum chemistry survey".to_string()),
            ..LibrarySearchQuery::default()
        };
        let title_only = LibrarySearchQuery {
            title: query.title.clone(),
            ..LibrarySearchQuery::default()
        };
        assert!(!check_library(&title_only, &library()).unwrap().found);

        let result = check_library(&query, &library()).unwrap();
        assert!(result.found);
        assert_eq!(result.tier, Some(MatchTier::Url));
        assert_eq!(
            result.matched_path.as_deref(),
            Some("papers/Attention Is All You Need.md")
        );
    }

    #[test]
    fn test_citekey_tier_case_insensitive() {
        let query = LibrarySearchQuery {
            citekey: Some(" HE2016Deep ".to_string()),
            ..LibrarySearchQuery::default()
        };
        let result = check_library(&query, &library()).unwrap();
        assert_eq!(result.tier, Some(MatchTier::Citekey));
        assert_eq!(
            result.matched_record.unwrap().title,
            "Deep Residual Learning for Image Recognition"
        );
    }

    #[test]
    fn test_citekey_checked_before_title() {
        let query = LibrarySearchQuery {
            title: Some("Attention Is All You Need".to_string()),
            citekey: Some("he2016deep".to_string()),
            ..LibrarySearchQuery::default()
        };
        let result = check_library(&query, &library()).unwrap();
        assert_eq!(result.tier, Some(MatchTier::Citekey));
        assert_eq!(
            result.matched_path.as_deref(),
            Some("papers/Deep Residual Learning.md")
        );
    }

    #[test]
    fn test_no_match_returns_not_found() {
        let query = LibrarySearchQuery {
            url: Some("https://arxiv.org/abs/0000.00000".to_string()),
            title: Some("Graph attention networks".to_string()),
            citekey: Some("velickovic2018".to_string()),
            ..LibrarySearchQuery::default()
        };
        let result = check_library(&query, &library()).unwrap();
        assert_eq!(result, LibraryMatchResult::not_found());
    }

    // ==================== Bibliography String Tests ====================

    #[test]
    fn test_bib_string_fills_missing_url() {
        let query = LibrarySearchQuery {
            bib_string: Some("Vaswani et al. Attention. arXiv:1706.03762".to_string()),
            ..LibrarySearchQuery::default()
        };
        let result = check_library(&query, &library()).unwrap();
        assert_eq!(result.tier, Some(MatchTier::Url));
    }

    #[test]
    fn test_explicit_title_overrides_bib_string_title() {
        let query = LibrarySearchQuery {
            title: Some("Some other paper nobody wrote".to_string()),
            bib_string: Some("\"Attention Is All You Need\"".to_string()),
            ..LibrarySearchQuery::default()
        };
        let result = check_library(&query, &library()).unwrap();
        assert!(!result.found);
    }

    #[test]
    fn test_bib_string_title_used_when_no_explicit_title() {
        let query = LibrarySearchQuery {
            bib_string: Some(
                "He, K. 2016. Deep residual learning for image recognition. In CVPR.".to_string(),
            ),
            ..LibrarySearchQuery::default()
        };
        let result = check_library(&query, &library()).unwrap();
        assert_eq!(result.tier, Some(MatchTier::Title));
    }

    // ==================== Fuzzy Title Tests ====================

    #[test]
    fn test_title_normalized_equality() {
        assert!(titles_match(
            "Attention Is All You Need",
            "attention is all you need",
            TITLE_MATCH_THRESHOLD
        ));
        assert!(titles_match(
            "  BERT: Pre-training!  ",
            "bert pretraining",
            TITLE_MATCH_THRESHOLD
        ));
    }

    #[test]
    fn test_title_containment_branch() {
        assert!(titles_match(
            "Attention",
            "Attention Is All You Need",
            TITLE_MATCH_THRESHOLD
        ));
        assert!(!titles_match(
            "Attention Is All You Need",
            "Attention",
            TITLE_MATCH_THRESHOLD
        ));
    }

    #[test]
    fn test_title_ratio_branch_uses_candidate_word_count() {
        // 6 of 8 search words hit: 0.75 by search length, 1.0 by candidate length.
        assert!(titles_match(
            "deep residual learning for image recognition extra words",
            "Deep Residual Learning for Image Recognition",
            TITLE_MATCH_THRESHOLD
        ));
    }

    #[test]
    fn test_title_ratio_branch_rejects_low_overlap() {
        assert!(!titles_match(
            "attention mechanisms",
            "Attention Is All You Need",
            TITLE_MATCH_THRESHOLD
        ));
    }

    #[test]
    fn test_title_ratio_counts_partial_word_containment() {
        // "network" is contained in "networks"; 5 of 5 candidate words.
        assert!(titles_match(
            "graph neural network for molecules",
            "Graph Neural Networks for Molecules",
            TITLE_MATCH_THRESHOLD
        ));
    }

    #[test]
    fn test_title_empty_never_matches() {
        assert!(!titles_match("", "Anything", TITLE_MATCH_THRESHOLD));
        assert!(!titles_match("!!!", "Anything", TITLE_MATCH_THRESHOLD));
        assert!(!titles_match("Anything", "", TITLE_MATCH_THRESHOLD));
    }

    // ==================== Author Tier Tests ====================

    fn authored_library() -> Vec<LocalRecord> {
        let mut entry = local("papers/a.md", "Unrelated Title", None, None);
        entry.record.authors = vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()];
        vec![entry]
    }

    fn author_query() -> LibrarySearchQuery {
        LibrarySearchQuery {
            title: Some("Transformers revisited".to_string()),
            authors: vec!["A. Vaswani".to_string(), "Noam Shazeer".to_string()],
            ..LibrarySearchQuery::default()
        }
    }

    #[test]
    fn test_author_tier_disabled_by_default() {
        let result = check_library(&author_query(), &authored_library()).unwrap();
        assert!(!result.found);
    }

    #[test]
    fn test_author_tier_matches_when_enabled() {
        let options = MatchOptions {
            author_matching: true,
            ..MatchOptions::default()
        };
        let result = check_library_with(&author_query(), &authored_library(), &options).unwrap();
        assert!(result.found);
        assert_eq!(result.tier, Some(MatchTier::Authors));
    }

    #[test]
    fn test_authors_match_requires_threshold_share() {
        let candidate = vec!["Ashish Vaswani".to_string()];
        let query = vec!["Ashish Vaswani".to_string(), "Jakob Uszkoreit".to_string()];
        assert!(!authors_match(&query, &candidate, AUTHOR_MATCH_THRESHOLD));
        assert!(authors_match(&query, &candidate, 0.5));
    }

    #[test]
    fn test_authors_match_rejects_different_people() {
        let candidate = vec!["Kaiming He".to_string()];
        let query = vec!["Geoffrey Hinton".to_string()];
        assert!(!authors_match(&query, &candidate, AUTHOR_MATCH_THRESHOLD));
    }
}
