//! Provider endpoints and response parsers.
//!
//! Two payload shapes map onto [`crate::PaperRecord`]:
//! - [`arxiv`]: Atom XML from the arXiv export API plus a separate BibTeX fetch
//! - [`semantic_scholar`]: Graph API JSON for lookup, search and references

pub mod arxiv;
pub mod semantic_scholar;

/// arXiv export API query endpoint.
pub const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";
/// arXiv BibTeX endpoint.
pub const ARXIV_BIBTEX_BASE: &str = "https://arxiv.org/bibtex";
/// Semantic Scholar Graph API paper endpoint.
pub const SEMANTIC_SCHOLAR_API_BASE: &str = "https://api.semanticscholar.org/graph/v1/paper";
/// Field list requested from every Semantic Scholar endpoint.
pub const SEMANTIC_SCHOLAR_FIELDS: &str = "authors,title,abstract,url,venue,year,publicationDate,externalIds,isOpenAccess,openAccessPdf,citationStyles";

/// Canonical arXiv landing page prefix.
pub const ARXIV_ABS_URL: &str = "https://arxiv.org/abs/";
/// Canonical arXiv PDF prefix.
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf/";
/// ACL Anthology landing page prefix.
pub const ACL_ANTHOLOGY_URL: &str = "https://aclanthology.org/";

/// Search result limit.
pub const SEARCH_LIMIT: u32 = 5;
/// References result limit.
pub const REFERENCES_LIMIT: u32 = 50;

/// Base URLs for provider APIs. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub arxiv_api: String,
    pub arxiv_bibtex: String,
    pub semantic_scholar: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv_api: ARXIV_API_BASE.to_string(),
            arxiv_bibtex: ARXIV_BIBTEX_BASE.to_string(),
            semantic_scholar: SEMANTIC_SCHOLAR_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at `base` (e.g. a wiremock server).
    #[must_use]
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            arxiv_api: format!("{base}/api/query"),
            arxiv_bibtex: format!("{base}/bibtex"),
            semantic_scholar: format!("{base}/graph/v1/paper"),
        }
    }

    #[must_use]
    pub fn arxiv_query_url(&self, arxiv_id: &str) -> String {
        format!("{}?id_list={arxiv_id}", self.arxiv_api)
    }

    #[must_use]
    pub fn arxiv_bibtex_url(&self, arxiv_id: &str) -> String {
        format!("{}/{arxiv_id}", self.arxiv_bibtex)
    }

    #[must_use]
    pub fn paper_url(&self, s2_id: &str) -> String {
        format!(
            "{}/{s2_id}?fields={SEMANTIC_SCHOLAR_FIELDS}",
            self.semantic_scholar
        )
    }

    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?query={}&fields={SEMANTIC_SCHOLAR_FIELDS}&limit={SEARCH_LIMIT}",
            self.semantic_scholar,
            urlencoding::encode(query)
        )
    }

    #[must_use]
    pub fn references_url(&self, s2_id: &str) -> String {
        format!(
            "{}/{s2_id}/references?fields={SEMANTIC_SCHOLAR_FIELDS}&limit={REFERENCES_LIMIT}",
            self.semantic_scholar
        )
    }
}
