//! Browsing a filtered catalog through the async host

use crate::common::*;
use facetstream::{CatalogBrowser, SearchCriteria, StreamPhase};
use std::sync::Arc;

#[tokio::test]
async fn test_color_filter_reaches_endpoint() {
    init_tracing();
    let catalog = Arc::new(FakeCatalog::generated(30));
    let browser = CatalogBrowser::new(Arc::clone(&catalog), config(4)).unwrap();
    let mut rx = browser.subscribe();

    browser.reset(sarees().select("color", "red").select("color", "blue"));
    let snap = wait_until(&mut rx, |s| s.phase == StreamPhase::Streaming).await;

    assert_eq!(ids(&snap), vec!["p000", "p001", "p003", "p004"]);
    for item in &snap.visible_items {
        let color = item.field("color").and_then(|v| v.as_str()).unwrap();
        assert!(color == "red" || color == "blue");
    }
    assert_eq!(snap.facet_counts["color"]["red"], 10);
    assert_eq!(snap.facet_counts["color"]["blue"], 10);
}

#[tokio::test]
async fn test_scroll_to_end_in_server_order() {
    init_tracing();
    let catalog = Arc::new(FakeCatalog::generated(23));
    let browser = CatalogBrowser::open(Arc::clone(&catalog), config(5), sarees()).unwrap();
    let mut rx = browser.subscribe();
    wait_until(&mut rx, |s| !s.is_loading).await;

    while browser.snapshot().has_more {
        browser.load_more();
        wait_until(&mut rx, |s| !s.is_loading).await;
    }

    let expected: Vec<String> = (0..23).map(|i| format!("p{:03}", i)).collect();
    let snap = browser.snapshot();
    assert_eq!(ids(&snap), expected);
    assert_eq!(snap.phase, StreamPhase::Exhausted);
    assert_eq!(catalog.calls(), 5);
}

#[tokio::test]
async fn test_no_match_shows_empty_state() {
    init_tracing();
    let browser = CatalogBrowser::open(
        FakeCatalog::generated(10),
        config(5),
        SearchCriteria::new("").with_category("lehengas"),
    )
    .unwrap();
    let mut rx = browser.subscribe();

    let snap = wait_until(&mut rx, |s| s.phase == StreamPhase::Exhausted).await;
    assert!(snap.no_results);
    assert!(!snap.has_more);
    assert!(!snap.is_loading);
}

#[tokio::test]
async fn test_refining_keeps_sibling_color_counts() {
    init_tracing();
    let browser = CatalogBrowser::open(FakeCatalog::generated(30), config(5), sarees()).unwrap();
    let mut rx = browser.subscribe();
    let before = wait_until(&mut rx, |s| s.phase == StreamPhase::Streaming).await;
    assert_eq!(before.facet_counts["color"].len(), 3);

    browser.reset(sarees().select("color", "green"));
    let first_session = before.session;
    let after = wait_until(&mut rx, |s| s.session != first_session && !s.is_loading).await;

    // green narrowed; red and blue stay from the baseline
    let colors = &after.facet_counts["color"];
    assert_eq!(colors.len(), 3);
    assert_eq!(colors["green"], 10);
    assert_eq!(colors["red"], 10);
    assert!(after.visible_items.iter().all(|i| i.field("color").unwrap() == "green"));
}
