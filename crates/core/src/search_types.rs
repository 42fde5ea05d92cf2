//! Core search types exchanged with the search endpoint
//!
//! This module defines:
//! - FetchRequest: one page request derived from criteria by the query builder
//! - FetchTicket: a request tagged with the session that issued it
//! - ResultPage: one page of results plus facet counts
//! - ResultItem: an opaque result passed through to the rendering layer
//! - FacetCounts: per-field, per-value counts
//!
//! These types define the interface contract with the fetch collaborator.

use crate::types::{SessionId, SortKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Per-field, per-value facet counts
///
/// Ordered maps keep the facet model in canonical order for display and for
/// deterministic comparisons.
pub type FacetCounts = BTreeMap<String, BTreeMap<String, u64>>;

// ============================================================================
// FetchRequest
// ============================================================================

/// Request for one page of results
///
/// Built by the query builder; identical criteria and page number always
/// produce an identical request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// Free-text query, passed through unmodified
    pub free_text: String,
    /// Zero-indexed page number
    pub page: u32,
    /// Items per page (always > 0)
    pub page_size: u32,
    /// Compound boolean filter (facets, numeric range, scope)
    pub filter_expression: String,
    /// Facet groups as a JSON array of arrays (outer AND, inner OR)
    pub facet_filter_expression: String,
    /// Requested ordering
    pub sort_key: SortKey,
}

impl FetchRequest {
    /// Request body as sent to the search endpoint
    ///
    /// Field names follow the endpoint's camelCase convention; the sort key is
    /// flattened to its parameter string.
    pub fn to_wire(&self) -> Value {
        json!({
            "freeText": self.free_text,
            "page": self.page,
            "pageSize": self.page_size,
            "filterExpression": self.filter_expression,
            "facetFilterExpression": self.facet_filter_expression,
            "sortKey": self.sort_key.as_param(),
        })
    }
}

// ============================================================================
// FetchTicket
// ============================================================================

/// A fetch issued by the result stream
///
/// The session id travels with the request so the response can be checked
/// against the current session when it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    /// Session the fetch belongs to
    pub session: SessionId,
    /// Page number being fetched
    pub page: u32,
    /// The request itself
    pub request: FetchRequest,
}

// ============================================================================
// ResultItem
// ============================================================================

/// A single result
///
/// Only `id` is interpreted. Display fields (title, prices, image
/// references, ...) are carried in `fields` exactly as the service sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Opaque identifier
    pub id: String,
    /// Display fields, passed through unmodified
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResultItem {
    /// Create an item with no display fields
    pub fn new(id: impl Into<String>) -> Self {
        ResultItem {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder: attach a display field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a display field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

// ============================================================================
// ResultPage
// ============================================================================

/// One page returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultPage {
    /// Items in server-returned order
    pub items: Vec<ResultItem>,
    /// Total pages available for the query
    pub total_pages: u32,
    /// Facet counts computed for the query
    #[serde(default)]
    pub facet_counts: FacetCounts,
}

impl ResultPage {
    /// Create a page without facet counts
    pub fn new(items: Vec<ResultItem>, total_pages: u32) -> Self {
        ResultPage {
            items,
            total_pages,
            facet_counts: FacetCounts::new(),
        }
    }

    /// The empty page: no items, no further pages
    pub fn empty() -> Self {
        ResultPage::default()
    }

    /// Builder: set one facet count
    pub fn with_facet(
        mut self,
        field: impl Into<String>,
        value: impl Into<String>,
        count: u64,
    ) -> Self {
        self.facet_counts
            .entry(field.into())
            .or_default()
            .insert(value.into(), count);
        self
    }

    /// Number of items on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the page carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
