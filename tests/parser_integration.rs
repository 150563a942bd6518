//! Integration tests for the parser module.
//!
//! These tests verify the parser's behavior with realistic inputs
//! and across module boundaries.

use scholar_core::parser::{
    Provider, extract_citekey, normalize_identifier, parse_bib_string, split_bibtex_entries,
};
use scholar_core::{PaperRecord, ScholarError};

/// Every URL form a user is likely to paste for the three providers.
#[test]
fn test_normalize_realistic_provider_urls() {
    let cases = [
        ("https://arxiv.org/abs/2301.00001", Provider::Arxiv, "2301.00001"),
        ("https://ARXIV.org/pdf/2301.00001v3.pdf", Provider::Arxiv, "2301.00001v3"),
        ("http://export.arxiv.org/abs/hep-th/9901001v1/", Provider::Arxiv, "hep-th/9901001v1"),
        ("https://aclanthology.org/2020.acl-main.463/", Provider::AclAnthology, "2020.acl-main.463"),
        (
            "https://www.semanticscholar.org/paper/Attention-is-All-you-Need-Vaswani/204e3073870fae3d05bcbc2f6a8e263d9b72e776",
            Provider::SemanticScholar,
            "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
        ),
    ];

    for (url, provider, id) in cases {
        let identifier = normalize_identifier(url).unwrap();
        assert_eq!(identifier.provider(), provider, "provider for {url}");
        assert_eq!(identifier.provider_id(), id, "id for {url}");
    }
}

/// Aggregator ids add the namespace and drop the arXiv version.
#[test]
fn test_semantic_scholar_ids_for_each_provider() {
    let arxiv = normalize_identifier("https://arxiv.org/abs/1706.03762v7").unwrap();
    assert_eq!(arxiv.semantic_scholar_id(), "arXiv:1706.03762");
    assert_eq!(arxiv.arxiv_id(), Some("1706.03762v7"));

    let acl = normalize_identifier("https://aclanthology.org/P19-1001").unwrap();
    assert_eq!(acl.semantic_scholar_id(), "ACL:P19-1001");
    assert_eq!(acl.arxiv_id(), None);
}

#[test]
fn test_unknown_hosts_are_invalid_identifiers() {
    for url in [
        "https://doi.org/10.1234/example",
        "https://openreview.net/forum?id=abc",
        "not a url at all",
    ] {
        let err = normalize_identifier(url).unwrap_err();
        assert!(
            matches!(err, ScholarError::InvalidIdentifier { .. }),
            "{url} should be rejected"
        );
    }
}

/// A citation copied from a reference list resolves to a normalizable URL.
#[test]
fn test_bib_string_feeds_identifier_normalizer() {
    let hints = parse_bib_string(
        "[12] Vaswani, A., Shazeer, N. 2017. Attention is all you need. arXiv:1706.03762v5.",
    );
    let url = hints.url.unwrap();
    assert_eq!(url, "https://arxiv.org/abs/1706.03762v5");
    assert_eq!(hints.title.as_deref(), Some("Attention is all you need"));

    let identifier = normalize_identifier(&url).unwrap();
    assert_eq!(identifier.provider(), Provider::Arxiv);
    assert_eq!(identifier.provider_id(), "1706.03762v5");
}

/// A `.bib` file splits into entries whose citekeys round-trip through records.
#[test]
fn test_bib_file_entries_round_trip_citekeys() {
    let bib = r"
@article{smith2020deep,
  title = {Deep {Learning} for Things},
  year = 2020
}

% a comment line
@inproceedings{doe2021graph,
  title = {Graphs},
}
";
    let entries = split_bibtex_entries(bib);
    assert_eq!(entries.len(), 2);

    for entry in entries {
        let record = PaperRecord::new(Some("T")).with_bibtex(Some(entry.clone()));
        assert_eq!(record.citekey, extract_citekey(&entry));
        assert!(record.citekey.is_some());
    }
}

#[test]
fn test_citekey_absent_without_entry_header() {
    assert_eq!(extract_citekey("title = {No header}"), None);
    let record = PaperRecord::new(None).with_bibtex(Some("no header".to_string()));
    assert!(record.citekey.is_none());
}
