//! Best-effort recovery of a URL and title from a free-text citation.
//!
//! Nothing here fails: fields the heuristics cannot find stay `None`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::bibtex::{parse_bibtex_entry, split_bibtex_entries};
use super::compile_static_regex;
use super::url::find_first_url;

const ARXIV_ABS_BASE: &str = "https://arxiv.org/abs/";

static ARXIV_PREFIXED_NEW: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)arxiv:\s*(\d{4}\.\d{4,5}(?:v\d+)?)"));
static ARXIV_PREFIXED_LEGACY: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)arxiv:\s*([a-z\-]+(?:\.[a-z]{2})?/\d{7}(?:v\d+)?)")
});
static ARXIV_BARE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\b(\d{4}\.\d{4,5}(?:v\d+)?)\b"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"["\u{201C}]([^"\u{201C}\u{201D}]+)["\u{201D}]"#));
static AFTER_YEAR: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\b\d{4}[a-z]?\.\s+([^.]+)"));
static LEADING_IN: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?i)^in:\s*"));
static TRAILING_PAGES: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i),?\s*(?:pp?\.?\s*)?\d+\s*[-\u{2013}]+\s*\d+\s*$")
});
static TRAILING_VENUE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i),\s*(?:in|proceedings|journal|conference|arxiv|vol\.?|volume)\b.*$")
});
static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\.\s+"));
static LEADING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\d{4}[a-z]?\.\s*"));
static TRAILING_IN_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)\s+in\s+.*$"));

/// Partial results of citation-string parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibStringHints {
    /// arXiv abstract URL or the first URL in the text.
    pub url: Option<String>,
    /// Best guess at the paper title.
    pub title: Option<String>,
    /// arXiv id when one was found.
    pub arxiv_id: Option<String>,
}

impl BibStringHints {
    /// True when neither a URL nor a title was recovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.title.is_none()
    }
}

/// Extracts URL and title hints from a citation string or BibTeX entry.
///
/// ```
/// use scholar_core::parser::parse_bib_string;
///
/// let hints = parse_bib_string(
///     "Vaswani, A. 2017. Attention is all you need. In NeurIPS, pp. 5998-6008.",
/// );
/// assert_eq!(hints.title.as_deref(), Some("Attention is all you need"));
/// assert_eq!(hints.url, None);
/// ```
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
#[must_use]
pub fn parse_bib_string(text: &str) -> BibStringHints {
    let mut hints = bibtex_hints(text);

    if hints.arxiv_id.is_none() {
        hints.arxiv_id = find_arxiv_id(text);
    }
    if hints.url.is_none() {
        hints.url = hints
            .arxiv_id
            .as_ref()
            .map(|id| format!("{ARXIV_ABS_BASE}{id}"))
            .or_else(|| find_first_url(text));
    }
    if hints.title.is_none() {
        hints.title = quoted_title(text)
            .or_else(|| title_after_year(text))
            .or_else(|| title_from_sentences(text));
    }

    debug!(
        url = hints.url.as_deref().unwrap_or(""),
        title = hints.title.as_deref().unwrap_or(""),
        "bibliography string parsed"
    );
    hints
}

fn bibtex_hints(text: &str) -> BibStringHints {
    if !text.trim_start().starts_with('@') {
        return BibStringHints::default();
    }
    let Some(entry) = split_bibtex_entries(text)
        .first()
        .and_then(|raw| parse_bibtex_entry(raw))
    else {
        return BibStringHints::default();
    };

    let arxiv_id = entry
        .field("eprint")
        .and_then(find_arxiv_id_token)
        .or_else(|| entry.field("journal").and_then(find_arxiv_id));
    let url = arxiv_id
        .as_ref()
        .map(|id| format!("{ARXIV_ABS_BASE}{id}"))
        .or_else(|| entry.field("url").and_then(find_first_url));
    BibStringHints {
        url,
        title: entry
            .field("title")
            .map(crate::record::normalize_whitespace)
            .filter(|title| !title.is_empty()),
        arxiv_id,
    }
}

fn find_arxiv_id(text: &str) -> Option<String> {
    [&*ARXIV_PREFIXED_NEW, &*ARXIV_PREFIXED_LEGACY, &*ARXIV_BARE]
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

fn find_arxiv_id_token(value: &str) -> Option<String> {
    let token = value.trim();
    let token = token
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("arxiv:"))
        .map_or(token, |_| token[6..].trim());
    find_arxiv_id(&format!("arXiv:{token}"))
}

fn quoted_title(text: &str) -> Option<String> {
    QUOTED
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|title| clean_title(title.as_str()))
        .filter(|title| !title.is_empty())
}

fn title_after_year(text: &str) -> Option<String> {
    let captured = AFTER_YEAR.captures(text)?.get(1)?.as_str();
    let title = LEADING_IN.replace(captured.trim(), "");
    let title = TRAILING_PAGES.replace(&title, "");
    let title = TRAILING_VENUE.replace(&title, "");
    Some(clean_title(&title)).filter(|title| !title.is_empty())
}

fn title_from_sentences(text: &str) -> Option<String> {
    SENTENCE_BREAK.split(text).find_map(|sentence| {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let capitalized = words
            .iter()
            .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
            .count();
        if capitalized < 3 || words.len() < 5 {
            return None;
        }
        let title = LEADING_YEAR.replace(sentence.trim(), "");
        let title = TRAILING_IN_CLAUSE.replace(&title, "");
        Some(clean_title(&title)).filter(|title| !title.is_empty())
    })
}

fn clean_title(value: &str) -> String {
    crate::record::normalize_whitespace(value.trim_matches(|ch: char| {
        ch.is_whitespace() || matches!(ch, ',' | '.' | ';' | ':')
    }))
}
