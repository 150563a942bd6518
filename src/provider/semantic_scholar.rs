//! Semantic Scholar Graph API: paper lookup, search and references.
//!
//! All three endpoints share one paper shape, mapped by [`parse_paper`].
//! Link resolution applies these rules in order, later rules overriding
//! earlier ones:
//!
//! 1. `url` from the payload, no PDF
//! 2. open-access PDF when `isOpenAccess` is true
//! 3. arXiv external id: canonical arXiv abstract and PDF URLs
//! 4. ACL external id: Anthology page, PDF is the page URL plus `.pdf`

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{ACL_ANTHOLOGY_URL, ARXIV_ABS_URL, ARXIV_PDF_URL, Endpoints};
use crate::error::ScholarError;
use crate::record::{PaperRecord, normalize_whitespace};
use crate::upstream::UpstreamClient;

/// Paper object as returned by the Graph API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S2Paper {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Option<Vec<S2Author>>,
    pub url: Option<String>,
    pub venue: Option<String>,
    pub year: Option<i64>,
    pub publication_date: Option<String>,
    pub external_ids: Option<HashMap<String, Value>>,
    pub is_open_access: Option<bool>,
    pub open_access_pdf: Option<S2OpenAccessPdf>,
    pub citation_styles: Option<S2CitationStyles>,
}

#[derive(Debug, Default, Deserialize)]
pub struct S2Author {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct S2OpenAccessPdf {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct S2CitationStyles {
    pub bibtex: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    total: Option<u64>,
    data: Option<Vec<S2Paper>>,
}

#[derive(Debug, Deserialize)]
struct S2ReferencesResponse {
    data: Option<Vec<S2Reference>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Reference {
    cited_paper: Option<S2Paper>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| normalize_whitespace(&text))
        .filter(|text| !text.is_empty())
}

fn external_id(ids: Option<&HashMap<String, Value>>, key: &str) -> Option<String> {
    let value = ids?.get(key)?;
    let id = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Maps a Graph API paper onto a record.
#[must_use]
pub fn parse_paper(paper: S2Paper) -> PaperRecord {
    let mut record = PaperRecord::new(paper.title.as_deref());
    record.abstract_text = non_empty(paper.abstract_text).unwrap_or_default();
    record.authors = paper
        .authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|author| non_empty(author.name))
        .collect();
    record.venue = non_empty(paper.venue).map(|venue| match paper.year {
        Some(year) => format!("{venue} {year}"),
        None => venue,
    });
    record.publication_date = non_empty(paper.publication_date);

    record.url = non_empty(paper.url);
    if paper.is_open_access == Some(true)
        && let Some(pdf) = non_empty(paper.open_access_pdf.and_then(|pdf| pdf.url))
    {
        record.pdf_url = Some(pdf);
    }
    if let Some(arxiv_id) = external_id(paper.external_ids.as_ref(), "ArXiv") {
        record.url = Some(format!("{ARXIV_ABS_URL}{arxiv_id}"));
        record.pdf_url = Some(format!("{ARXIV_PDF_URL}{arxiv_id}"));
    }
    if let Some(acl_id) = external_id(paper.external_ids.as_ref(), "ACL") {
        let page = format!("{ACL_ANTHOLOGY_URL}{acl_id}");
        record.pdf_url = Some(format!("{}.pdf", page.strip_suffix('/').unwrap_or(&page)));
        record.url = Some(page);
    }

    record.with_bibtex(paper.citation_styles.and_then(|styles| styles.bibtex))
}

/// Parses JSON and surfaces provider `error` payloads.
fn parse_json(body: &str, url: &str) -> Result<Value, ScholarError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| ScholarError::malformed(url, format!("invalid JSON: {error}")))?;
    if !value.is_object() {
        return Err(ScholarError::malformed(url, "expected a JSON object"));
    }
    match value.get("error") {
        None | Some(Value::Null) => Ok(value),
        Some(Value::String(message)) => Err(ScholarError::upstream(url, message.clone())),
        Some(other) => Err(ScholarError::upstream(url, other.to_string())),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, url: &str) -> Result<T, ScholarError> {
    serde_json::from_value(value)
        .map_err(|error| ScholarError::malformed(url, format!("unexpected JSON shape: {error}")))
}

/// Parses a single-paper lookup body.
///
/// # Errors
///
/// `MalformedResponse` for non-JSON bodies, `UpstreamError` for error payloads.
pub fn parse_paper_response(body: &str, url: &str) -> Result<PaperRecord, ScholarError> {
    let paper: S2Paper = decode(parse_json(body, url)?, url)?;
    Ok(parse_paper(paper))
}

/// Parses a search body.
///
/// # Errors
///
/// `NoDataReturned` when `total` is zero or `data` is missing or empty, even
/// if the rest of the payload is well-formed.
pub fn parse_search_response(body: &str, url: &str) -> Result<Vec<PaperRecord>, ScholarError> {
    let response: S2SearchResponse = decode(parse_json(body, url)?, url)?;
    if response.total == Some(0) {
        return Err(ScholarError::no_data(url));
    }
    let papers = response.data.unwrap_or_default();
    if papers.is_empty() {
        return Err(ScholarError::no_data(url));
    }
    Ok(papers.into_iter().map(parse_paper).collect())
}

/// Parses a references body, unwrapping each `citedPaper`.
///
/// Wrappers with a null `citedPaper` are skipped. Untitled cited papers are
/// kept with the title placeholder, like any other parsed paper.
///
/// # Errors
///
/// `NoDataReturned` when no reference remains.
pub fn parse_references_response(
    body: &str,
    url: &str,
) -> Result<Vec<PaperRecord>, ScholarError> {
    let response: S2ReferencesResponse = decode(parse_json(body, url)?, url)?;
    let records: Vec<PaperRecord> = response
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|reference| reference.cited_paper)
        .map(parse_paper)
        .collect();
    if records.is_empty() {
        return Err(ScholarError::no_data(url));
    }
    Ok(records)
}

/// Looks up one paper by Graph API id (`arXiv:…`, `ACL:…` or native).
///
/// # Errors
///
/// Request failures and [`parse_paper_response`] failures.
#[instrument(skip(client, endpoints, api_key))]
pub async fn lookup_paper(
    client: &UpstreamClient,
    endpoints: &Endpoints,
    s2_id: &str,
    api_key: Option<&str>,
) -> Result<PaperRecord, ScholarError> {
    let url = endpoints.paper_url(s2_id);
    let body = client.get_text(&url, api_key).await?;
    let record = parse_paper_response(&body, &url)?;
    debug!(title = %record.title, "Semantic Scholar paper parsed");
    Ok(record)
}

/// Searches papers by free text (at most five results).
///
/// # Errors
///
/// Request failures and [`parse_search_response`] failures.
#[instrument(skip(client, endpoints, api_key))]
pub async fn search_papers(
    client: &UpstreamClient,
    endpoints: &Endpoints,
    query: &str,
    api_key: Option<&str>,
) -> Result<Vec<PaperRecord>, ScholarError> {
    let url = endpoints.search_url(query);
    let body = client.get_text(&url, api_key).await?;
    let records = parse_search_response(&body, &url)?;
    debug!(results = records.len(), "Semantic Scholar search parsed");
    Ok(records)
}

/// Lists the papers a paper cites (at most fifty).
///
/// # Errors
///
/// Request failures and [`parse_references_response`] failures.
#[instrument(skip(client, endpoints, api_key))]
pub async fn paper_references(
    client: &UpstreamClient,
    endpoints: &Endpoints,
    s2_id: &str,
    api_key: Option<&str>,
) -> Result<Vec<PaperRecord>, ScholarError> {
    let url = endpoints.references_url(s2_id);
    let body = client.get_text(&url, api_key).await?;
    let records = parse_references_response(&body, &url)?;
    debug!(results = records.len(), "Semantic Scholar references parsed");
    Ok(records)
}
