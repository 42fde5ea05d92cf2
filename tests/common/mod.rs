//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use facetstream::{
    BrowseSnapshot, FetchRequest, SearchClient, SearchCriteria, StreamConfig, StreamResult,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// Initialization
// ============================================================================

/// Install a test subscriber once; `RUST_LOG` controls the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Fake catalog endpoint
// ============================================================================

/// One product in the fake catalog
#[derive(Debug, Clone)]
pub struct Product {
    pub id: String,
    pub color: String,
    pub category: String,
    pub price: f64,
}

/// In-memory endpoint that filters by category and color, then pages
///
/// Only understands the filter terms it needs: `(color:a OR color:b)` and
/// `(category:c)`. Responses use the `hits` / `nbPages` / `facets` key names.
pub struct FakeCatalog {
    products: Vec<Product>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        FakeCatalog {
            products,
            calls: AtomicUsize::new(0),
        }
    }

    /// `n` products cycling through three colors in one category
    pub fn generated(n: usize) -> Self {
        let colors = ["red", "blue", "green"];
        let products = (0..n)
            .map(|i| Product {
                id: format!("p{:03}", i),
                color: colors[i % colors.len()].to_string(),
                category: "sarees".to_string(),
                price: 100.0 + i as f64,
            })
            .collect();
        Self::new(products)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn matches(&self, product: &Product, filter: &str) -> bool {
        filter.split(" AND ").all(|clause| {
            let clause = clause.trim_start_matches('(').trim_end_matches(')');
            clause.split(" OR ").any(|term| match term.split_once(':') {
                Some(("color", value)) => product.color == value,
                Some(("category", value)) => product.category == value,
                _ => true,
            })
        })
    }
}

#[async_trait::async_trait]
impl SearchClient for FakeCatalog {
    async fn search(&self, request: &FetchRequest) -> StreamResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let matching: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| self.matches(p, &request.filter_expression))
            .collect();

        let mut colors: BTreeMap<&str, u64> = BTreeMap::new();
        for product in &matching {
            *colors.entry(product.color.as_str()).or_default() += 1;
        }

        let size = request.page_size as usize;
        let hits: Vec<Value> = matching
            .iter()
            .skip(request.page as usize * size)
            .take(size)
            .map(|p| json!({ "objectID": p.id, "color": p.color, "price": p.price }))
            .collect();

        Ok(json!({
            "hits": hits,
            "nbPages": matching.len().div_ceil(size),
            "facets": { "color": colors },
        }))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn config(page_size: u32) -> StreamConfig {
    StreamConfig::default().with_page_size(page_size)
}

pub fn sarees() -> SearchCriteria {
    SearchCriteria::new("").with_category("sarees")
}

/// Wait for a snapshot matching `pred`, failing after five seconds
pub async fn wait_until(
    rx: &mut watch::Receiver<BrowseSnapshot>,
    pred: impl FnMut(&BrowseSnapshot) -> bool,
) -> BrowseSnapshot {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("browser dropped")
        .clone()
}

pub fn ids(snapshot: &BrowseSnapshot) -> Vec<String> {
    snapshot.visible_items.iter().map(|i| i.id.clone()).collect()
}
