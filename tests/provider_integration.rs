//! Integration tests for resolving and fetching papers.
//!
//! Exercises the public `Scholar` API end to end against mock provider servers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scholar_core::upstream::{NOT_FOUND_NOTICE, RATE_LIMIT_NOTICE};
use scholar_core::{
    Endpoints, Notifier, RetryPolicy, Scholar, ScholarError, TITLE_PLACEHOLDER, UpstreamClient,
};
use wiremock::matchers::{header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list=1706.03762v7</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You Need</title>
    <summary>The dominant sequence transduction models.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/1706.03762v7" rel="related"/>
  </entry>
</feed>"#;

const ARXIV_BIBTEX: &str = "@misc{vaswani2017attention,\n  title={Attention Is All You Need},\n  eprint={1706.03762}\n}\n";

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn scholar_for(server: &MockServer, notifier: Arc<RecordingNotifier>) -> Scholar {
    let client = UpstreamClient::new()
        .unwrap()
        .with_policy(RetryPolicy::new(
            5,
            Duration::from_millis(5),
            Duration::from_millis(20),
            2.0,
        ))
        .with_notifier(notifier);
    Scholar::with_client(client).with_endpoints(Endpoints::with_base_url(&server.uri()))
}

async fn requests(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn test_arxiv_pdf_link_resolves_through_arxiv_api() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("id_list", "1706.03762v7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARXIV_FEED))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bibtex/1706.03762v7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARXIV_BIBTEX))
        .expect(1)
        .mount(&server)
        .await;

    let record = scholar_for(&server, Arc::default())
        .with_api_key(Some("unused-for-arxiv".to_string()))
        .resolve_and_fetch("https://arxiv.org/pdf/1706.03762v7.pdf")
        .await
        .unwrap();

    assert_eq!(record.title, "Attention Is All You Need");
    assert_eq!(record.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
    assert_eq!(record.publication_date.as_deref(), Some("2017-06-12"));
    assert_eq!(record.citekey.as_deref(), Some("vaswani2017attention"));
    assert_eq!(
        record.pdf_url.as_deref(),
        Some("http://arxiv.org/pdf/1706.03762v7")
    );
    assert!(record.tags.is_empty());
    assert!(record.pdf_path.is_none());
}

#[tokio::test]
async fn test_semantic_scholar_lookup_maps_arxiv_external_id() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = serde_json::json!({
        "title": "BERT",
        "abstract": "We introduce BERT.",
        "authors": [{"name": "Jacob Devlin"}],
        "url": "https://www.semanticscholar.org/paper/df2b0e26",
        "venue": "NAACL",
        "year": 2019,
        "externalIds": {"ArXiv": "1810.04805"},
        "isOpenAccess": true,
        "openAccessPdf": {"url": "https://aclanthology.org/N19-1423.pdf"},
        "citationStyles": {"bibtex": "@inproceedings{devlin2019bert, title={BERT}}"}
    });
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/df2b0e26"))
        .and(header("x-api-key", "s2-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let record = scholar_for(&server, Arc::default())
        .with_api_key(Some("s2-key".to_string()))
        .resolve_and_fetch("https://www.semanticscholar.org/paper/BERT/df2b0e26")
        .await
        .unwrap();

    assert_eq!(record.url.as_deref(), Some("https://arxiv.org/abs/1810.04805"));
    assert_eq!(record.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1810.04805"));
    assert_eq!(record.venue.as_deref(), Some("NAACL 2019"));
    assert_eq!(record.citekey.as_deref(), Some("devlin2019bert"));
}

#[tokio::test]
async fn test_rate_limited_twice_then_success_notifies_twice() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/abc"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"title":null}"#))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let record = scholar_for(&server, Arc::clone(&notifier))
        .resolve_and_fetch("https://www.semanticscholar.org/paper/abc")
        .await
        .unwrap();

    assert_eq!(record.title, TITLE_PLACEHOLDER);
    assert_eq!(requests(&server).await, 3);
    assert_eq!(
        *notifier.messages.lock().unwrap(),
        vec![RATE_LIMIT_NOTICE, RATE_LIMIT_NOTICE]
    );
}

#[tokio::test]
async fn test_not_found_stops_after_first_attempt() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/ACL:2020.nope-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let notifier = Arc::new(RecordingNotifier::default());
    let err = scholar_for(&server, Arc::clone(&notifier))
        .resolve_and_fetch("https://aclanthology.org/2020.nope-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ScholarError::UpstreamNotFound { .. }));
    assert_eq!(requests(&server).await, 1);
    assert_eq!(*notifier.messages.lock().unwrap(), vec![NOT_FOUND_NOTICE]);
}

#[tokio::test]
async fn test_search_with_zero_total_is_no_data() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"total":0,"data":[]}"#))
        .mount(&server)
        .await;

    let err = scholar_for(&server, Arc::default())
        .search("no such paper anywhere")
        .await
        .unwrap_err();
    assert!(matches!(err, ScholarError::NoDataReturned { .. }));
}

#[tokio::test]
async fn test_provider_error_payload_surfaces_message() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/bad"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"error":"Paper with id bad not found"}"#),
        )
        .mount(&server)
        .await;

    let err = scholar_for(&server, Arc::default())
        .resolve_and_fetch("https://www.semanticscholar.org/paper/bad")
        .await
        .unwrap_err();
    let ScholarError::UpstreamError { message, .. } = err else {
        panic!("expected UpstreamError, got {err:?}");
    };
    assert_eq!(message, "Paper with id bad not found");
}

#[tokio::test]
async fn test_search_limits_and_first_result_used_for_title_input() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/search"))
        .and(query_param("limit", "5"))
        .and(query_param("query", "Deep Residual Learning for Image Recognition"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total": 1,
            "data": [{"title": "Deep Residual Learning for Image Recognition", "year": 2016}]
        })))
        .mount(&server)
        .await;

    let record = scholar_for(&server, Arc::default())
        .resolve_and_fetch("\"Deep Residual Learning for Image Recognition\", CVPR 2016")
        .await
        .unwrap();
    assert_eq!(record.title, "Deep Residual Learning for Image Recognition");
    assert!(record.venue.is_none());
}

#[tokio::test]
async fn test_requests_identify_with_project_user_agent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/graph/v1/paper/ua"))
        .and(header_regex(
            "user-agent",
            r"^scholar/[0-9.]+ \(research-tool; \+https://github\.com/fierce/scholar\)$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"title":"UA"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let record = scholar_for(&server, Arc::default())
        .resolve_and_fetch("https://www.semanticscholar.org/paper/ua")
        .await
        .unwrap();
    assert_eq!(record.title, "UA");
}
