use assert_matches::assert_matches;

use bibfetch::cancel::CancelToken;
use bibfetch::citekey::expand;
use bibfetch::config::ResolvedConfig;
use bibfetch::error::BibError;
use bibfetch::providers::doi::{CrossrefResponse, DoiProvider, entry_from_crossref};
use bibfetch::providers::isbn::IsbnProvider;
use bibfetch::providers::IdProvider;

fn numpy_fixture() -> CrossrefResponse {
    let raw = include_str!("fixtures/crossref_numpy.json");
    serde_json::from_str(raw).unwrap()
}

#[test]
fn crossref_fixture_maps_to_article() {
    let entry = entry_from_crossref(&numpy_fixture().message);

    assert_eq!(entry.entry_type, "article");
    assert_eq!(entry.title(), Some("Array programming with NumPy"));
    assert_eq!(entry.field("journal"), Some("Nature"));
    assert_eq!(entry.field("pages"), Some("357--362"));
    assert_eq!(entry.field("year"), Some("2020"));
    assert_eq!(entry.field("month"), Some("9"));
    assert_eq!(entry.field("issn"), Some("0028-0836"));
    assert_eq!(
        entry.authors(),
        vec!["Harris, Charles R.", "Millman, K. Jarrod", "{NumPy Developers}"]
    );
    assert_eq!(expand("[auth][year]", &entry), "Harris2020");
}

#[test]
fn malformed_identifiers_fail_before_any_request() {
    let config = ResolvedConfig::default();
    let doi = DoiProvider::new(&config)
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let isbn = IsbnProvider::new(&config)
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let cancel = CancelToken::new();

    assert_matches!(
        doi.lookup_by_id("not-a-doi", &cancel),
        Err(BibError::InvalidIdentifier { kind: "DOI", .. })
    );
    assert_matches!(
        isbn.lookup_by_id("978-0-00-000000-1", &cancel),
        Err(BibError::InvalidIdentifier { kind: "ISBN", .. })
    );
}

#[test]
fn cancelled_lookup_never_connects() {
    let doi = DoiProvider::new(&ResolvedConfig::default())
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let cancel = CancelToken::new();
    cancel.cancel();
    assert_matches!(
        doi.lookup_by_id("10.1038/s41586-020-2649-2", &cancel),
        Err(BibError::Cancelled)
    );
}

#[test]
#[ignore]
fn resolve_real_doi_via_crossref() {
    let doi = DoiProvider::new(&ResolvedConfig::default()).unwrap();
    let entry = doi
        .lookup_by_id("10.1038/s41586-020-2649-2", &CancelToken::new())
        .unwrap()
        .expect("crossref knows this work");
    assert_eq!(entry.entry_type, "article");
    assert_eq!(entry.year(), Some("2020"));
}

#[test]
#[ignore]
fn resolve_real_isbn_via_open_library() {
    let isbn = IsbnProvider::new(&ResolvedConfig::default()).unwrap();
    let entry = isbn
        .lookup_by_id("978-0-262-03384-8", &CancelToken::new())
        .unwrap()
        .expect("open library knows this edition");
    assert_eq!(entry.entry_type, "book");
    assert!(entry.title().is_some());
}
