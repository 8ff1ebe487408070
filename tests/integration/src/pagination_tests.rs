//! Pagination integration tests

use crate::helpers::*;
use crate::mock_source::*;
use datafeed_client::{Page, PageRequest};
use datafeed_core::QueryParams;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Person {
    id: String,
    label: String,
}

/// Typed pages are decoded from the `data` envelope
#[tokio::test]
async fn test_get_page_typed() {
    let source = MockSource::start().await;
    source
        .mock_json_for_query("meps", "offset", "0", listing(&["anna", "ben"]))
        .await;
    let pipeline = test_pipeline(&source.base_url());

    let page: Page<Person> = pipeline
        .get_page("meps", &QueryParams::new(), PageRequest::first(2))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "person/anna");
    assert_eq!(page.items[1].label, "ben");
    assert!(page.has_more);
}

/// All pages are walked until a short page
#[tokio::test]
async fn test_get_all_pages() {
    let source = MockSource::start().await;
    source
        .mock_json_for_query("meps", "offset", "0", listing(&["a", "b"]))
        .await;
    source
        .mock_json_for_query("meps", "offset", "2", listing(&["c", "d"]))
        .await;
    source
        .mock_json_for_query("meps", "offset", "4", listing(&["e"]))
        .await;
    let pipeline = test_pipeline(&source.base_url());

    let people: Vec<Person> = pipeline
        .get_all_pages("meps", &QueryParams::new(), 2, 10)
        .await
        .unwrap();

    let labels: Vec<&str> = people.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(source.calls("meps").await, 3);
}
