//! Provider classification for paper URLs.
//!
//! A URL is tagged by substring: `arxiv` wins over `aclanthology`, which wins
//! over `semanticscholar`. The provider id is the final path segment, with a
//! few arXiv-specific clean-ups (`.pdf` suffix, legacy `category/NNNNNNN`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::compile_static_regex;
use crate::error::ScholarError;

/// Semantic Scholar namespace for arXiv ids.
const S2_ARXIV_PREFIX: &str = "arXiv:";
/// Semantic Scholar namespace for ACL Anthology ids.
const S2_ACL_PREFIX: &str = "ACL:";

static LEGACY_ARXIV_CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)^[a-z\-]+(?:\.[a-z]{2})?$"));
static LEGACY_ARXIV_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\d{7}(?:v\d+)?$"));
static VERSION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"v\d+$"));

/// Upstream metadata source a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// arxiv.org, fetched from the arXiv export API.
    Arxiv,
    /// aclanthology.org, fetched through Semantic Scholar.
    AclAnthology,
    /// semanticscholar.org paper pages.
    SemanticScholar,
}

impl Provider {
    /// Stable short label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arxiv => "arxiv",
            Self::AclAnthology => "acl",
            Self::SemanticScholar => "s2",
        }
    }

    fn classify(input: &str) -> Option<Self> {
        let lowered = input.to_ascii_lowercase();
        if lowered.contains("arxiv") {
            Some(Self::Arxiv)
        } else if lowered.contains("aclanthology") {
            Some(Self::AclAnthology)
        } else if lowered.contains("semanticscholar") {
            Some(Self::SemanticScholar)
        } else {
            None
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified paper identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperIdentifier {
    provider: Provider,
    provider_id: String,
}

impl PaperIdentifier {
    /// Builds an identifier from parts that are already known to be valid.
    #[must_use]
    pub fn new(provider: Provider, provider_id: impl Into<String>) -> Self {
        Self {
            provider,
            provider_id: provider_id.into(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Bare id as it appeared in the URL (arXiv versions kept).
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Path segment for the Semantic Scholar graph API.
    ///
    /// arXiv ids get the `arXiv:` namespace with any `vN` suffix removed;
    /// ACL ids get `ACL:`; native ids pass through.
    #[must_use]
    pub fn semantic_scholar_id(&self) -> String {
        match self.provider {
            Provider::Arxiv => format!(
                "{S2_ARXIV_PREFIX}{}",
                VERSION_SUFFIX.replace(&self.provider_id, "")
            ),
            Provider::AclAnthology => format!("{S2_ACL_PREFIX}{}", self.provider_id),
            Provider::SemanticScholar => self.provider_id.clone(),
        }
    }

    /// Id for the arXiv export API, version suffix intact.
    #[must_use]
    pub fn arxiv_id(&self) -> Option<&str> {
        match self.provider {
            Provider::Arxiv => Some(&self.provider_id),
            _ => None,
        }
    }
}

/// Classifies a paper URL and extracts its provider id.
///
/// # Errors
///
/// Returns [`ScholarError::InvalidIdentifier`] when the URL belongs to none of
/// the known providers or has no usable path segment.
#[tracing::instrument(level = "debug")]
pub fn normalize_identifier(input: &str) -> Result<PaperIdentifier, ScholarError> {
    let trimmed = input.trim();
    let Some(provider) = Provider::classify(trimmed) else {
        return Err(ScholarError::invalid_identifier(
            input,
            "URL does not belong to arXiv, ACL Anthology or Semantic Scholar",
        ));
    };

    let segments = path_segments(trimmed);
    let Some(last) = segments.last() else {
        return Err(ScholarError::invalid_identifier(
            input,
            "URL has no path segment to use as an identifier",
        ));
    };

    let provider_id = match provider {
        Provider::Arxiv => arxiv_id_from_segments(&segments),
        Provider::AclAnthology | Provider::SemanticScholar => (*last).to_string(),
    };

    debug!(provider = %provider, provider_id = %provider_id, "identifier normalized");
    Ok(PaperIdentifier {
        provider,
        provider_id,
    })
}

fn path_segments(input: &str) -> Vec<String> {
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    match Url::parse(&with_scheme) {
        Ok(url) => url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(_) => {
            let without_query = with_scheme
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .trim_end_matches('/');
            let after_scheme = without_query
                .split_once("://")
                .map_or(without_query, |(_, rest)| rest);
            after_scheme
                .split('/')
                .skip(1)
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string)
                .collect()
        }
    }
}

fn arxiv_id_from_segments(segments: &[String]) -> String {
    let last = segments.last().map(String::as_str).unwrap_or_default();
    let last = last.strip_suffix(".pdf").unwrap_or(last);

    if segments.len() >= 2 && LEGACY_ARXIV_NUMBER.is_match(last) {
        let category = &segments[segments.len() - 2];
        if LEGACY_ARXIV_CATEGORY.is_match(category) && !is_arxiv_route(category) {
            return format!("{category}/{last}");
        }
    }
    last.to_string()
}

fn is_arxiv_route(segment: &str) -> bool {
    matches!(segment, "abs" | "pdf" | "html" | "format" | "bibtex")
}
