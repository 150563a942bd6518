//! arXiv export API: Atom feed parsing and BibTeX retrieval.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};

use super::{ARXIV_ABS_URL, Endpoints};
use crate::error::ScholarError;
use crate::record::{PaperRecord, normalize_whitespace};
use crate::upstream::UpstreamClient;

/// Atom element whose text is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Title,
    Summary,
    AuthorName,
    Published,
}

impl Capture {
    fn closing_tag(self) -> &'static [u8] {
        match self {
            Self::Title => b"title",
            Self::Summary => b"summary",
            Self::AuthorName => b"name",
            Self::Published => b"published",
        }
    }
}

#[derive(Debug, Default)]
struct FeedFields {
    saw_entry: bool,
    title_count: usize,
    title: Option<String>,
    summary: Option<String>,
    authors: Vec<String>,
    published: Option<String>,
    pdf_url: Option<String>,
}

impl FeedFields {
    fn store(&mut self, capture: Capture, text: &str) {
        let value = normalize_whitespace(text);
        match capture {
            Capture::Title => self.title = Some(value),
            Capture::Summary => self.summary = Some(value),
            Capture::AuthorName if !value.is_empty() => self.authors.push(value),
            Capture::AuthorName => {}
            Capture::Published => self.published = Some(value),
        }
    }

    fn read_pdf_link(&mut self, element: &BytesStart<'_>) {
        if self.pdf_url.is_some() {
            return;
        }
        let mut href = None;
        let mut is_pdf = false;
        for attr in element.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"title" => is_pdf = value == "pdf",
                _ => {}
            }
        }
        if is_pdf {
            self.pdf_url = href.filter(|value| !value.is_empty());
        }
    }
}

/// Parses an arXiv Atom feed into a record.
///
/// The entry title is the second `<title>` in the document (the first
/// belongs to the feed). The abstract is the first `<summary>`, authors are
/// every `<author><name>`, and the date is the first `<published>` cut at
/// `T`. The PDF link is the `<link title="pdf">` href.
///
/// `source_url` only labels errors.
///
/// # Errors
///
/// `MalformedResponse` when the body is not well-formed XML, `NoDataReturned`
/// when the feed contains no `<entry>`.
#[instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_arxiv_feed(xml: &str, source_url: &str) -> Result<PaperRecord, ScholarError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut fields = FeedFields::default();
    let mut capture: Option<Capture> = None;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let next = match e.local_name().as_ref() {
                    b"entry" => {
                        fields.saw_entry = true;
                        None
                    }
                    b"title" => {
                        fields.title_count += 1;
                        (fields.title_count == 2).then_some(Capture::Title)
                    }
                    b"summary" if fields.summary.is_none() => Some(Capture::Summary),
                    b"author" => {
                        in_author = true;
                        None
                    }
                    b"name" if in_author => Some(Capture::AuthorName),
                    b"published" if fields.published.is_none() => Some(Capture::Published),
                    b"link" => {
                        fields.read_pdf_link(&e);
                        None
                    }
                    _ => None,
                };
                if capture.is_none() && next.is_some() {
                    capture = next;
                    text.clear();
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"link" => fields.read_pdf_link(&e),
                b"title" => fields.title_count += 1,
                _ => {}
            },
            Ok(Event::Text(e)) if capture.is_some() => {
                let chunk = e.unescape().map_err(|error| {
                    ScholarError::malformed(source_url, format!("invalid XML text: {error}"))
                })?;
                text.push_str(&chunk);
            }
            Ok(Event::CData(e)) if capture.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"author" {
                    in_author = false;
                }
                if let Some(active) = capture
                    && active.closing_tag() == name.as_ref()
                {
                    fields.store(active, &text);
                    capture = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(ScholarError::malformed(
                    source_url,
                    format!(
                        "invalid XML at position {}: {error}",
                        reader.error_position()
                    ),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if !fields.saw_entry {
        return Err(ScholarError::no_data(source_url));
    }

    let mut record = PaperRecord::new(fields.title.as_deref());
    record.abstract_text = fields.summary.unwrap_or_default();
    record.authors = fields.authors;
    record.publication_date = fields
        .published
        .and_then(|value| value.split('T').next().map(str::to_string))
        .filter(|value| !value.is_empty());
    record.pdf_url = fields.pdf_url;

    debug!(
        title = %record.title,
        authors = record.authors.len(),
        "arXiv entry parsed"
    );
    Ok(record)
}

/// Fetches metadata and BibTeX for an arXiv id (version suffix kept).
///
/// # Errors
///
/// Propagates request failures from either call and parse failures from
/// [`parse_arxiv_feed`].
#[instrument(skip(client, endpoints))]
pub async fn fetch_arxiv_paper(
    client: &UpstreamClient,
    endpoints: &Endpoints,
    arxiv_id: &str,
) -> Result<PaperRecord, ScholarError> {
    let query_url = endpoints.arxiv_query_url(arxiv_id);
    let xml = client.get_text(&query_url, None).await?;
    let mut record = parse_arxiv_feed(&xml, &query_url)?;
    record.url = Some(format!("{ARXIV_ABS_URL}{arxiv_id}"));

    let bibtex = client
        .get_text(&endpoints.arxiv_bibtex_url(arxiv_id), None)
        .await?;
    Ok(record.with_bibtex(Some(bibtex.trim().to_string())))
}
