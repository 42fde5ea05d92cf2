//! Criteria and identity types
//!
//! This module defines the values that drive a browsing session:
//! - SearchCriteria: the complete, immutable filter state
//! - Scope: store/category/city/area constraints
//! - NumericRange: an optional bounded range on one numeric field
//! - SortKey: ordering requested from the search service
//! - SessionId: one generation of criteria

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// SessionId
// ============================================================================

/// Identifier for one generation of search criteria
///
/// Session ids are issued by the cancellation manager in strictly increasing
/// order and are never reused. A fetch tagged with an id that is no longer
/// current is stale and its result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        SessionId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SortKey
// ============================================================================

/// Ordering requested from the search service
///
/// Passed through as a request parameter; never folded into the filter
/// expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Service-defined relevance (default)
    #[default]
    Relevance,
    /// Lowest price first
    PriceAsc,
    /// Highest price first
    PriceDesc,
    /// Most recently listed first
    Newest,
    /// Any other index or replica name understood by the service
    Custom(String),
}

impl SortKey {
    /// Request parameter value for this sort key
    pub fn as_param(&self) -> &str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::PriceAsc => "price_asc",
            SortKey::PriceDesc => "price_desc",
            SortKey::Newest => "newest",
            SortKey::Custom(name) => name,
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Store, category and location constraints
///
/// Every field is optional. Absent fields add nothing to the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Restrict to one store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Restrict to a category path (e.g. `"women/sarees"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_path: Option<String>,
    /// Restrict to a city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    /// Restrict to an area within a city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
}

impl Scope {
    /// Whether no scope constraint is set
    pub fn is_empty(&self) -> bool {
        self.store_id.is_none()
            && self.category_path.is_none()
            && self.city_id.is_none()
            && self.area_id.is_none()
    }
}

// ============================================================================
// NumericRange
// ============================================================================

/// Bounded range on a numeric field
///
/// A bound of `None` (or a non-finite value) is unbounded on that side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericRange {
    /// Field the range applies to (e.g. `"price"`)
    pub field: String,
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    /// Create an unbounded range on `field`
    pub fn new(field: impl Into<String>) -> Self {
        NumericRange {
            field: field.into(),
            min: None,
            max: None,
        }
    }

    /// Builder: set lower bound
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Builder: set upper bound
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Lower bound, if it constrains anything
    pub fn lower(&self) -> Option<f64> {
        self.min.filter(|v| v.is_finite())
    }

    /// Upper bound, if it constrains anything
    pub fn upper(&self) -> Option<f64> {
        self.max.filter(|v| v.is_finite())
    }
}

// ============================================================================
// SearchCriteria
// ============================================================================

/// Complete filter state for one browsing session
///
/// Criteria are values: any change produces a new `SearchCriteria` that
/// replaces the old one wholesale. Facet selections are kept in ordered
/// collections so two criteria with the same selections compare equal no
/// matter the order they were made in.
///
/// # Examples
///
/// ```
/// use facetstream_core::{SearchCriteria, SortKey};
///
/// let criteria = SearchCriteria::new("silk")
///     .with_category("sarees")
///     .select("color", "red")
///     .select("color", "blue")
///     .with_sort(SortKey::PriceAsc);
///
/// assert_eq!(criteria.free_text, "silk");
/// assert_eq!(criteria.facet_selections["color"].len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Free-text query
    #[serde(default)]
    pub free_text: String,
    /// Store/category/location constraints
    #[serde(default)]
    pub scope: Scope,
    /// Selected values per facet field
    #[serde(default)]
    pub facet_selections: BTreeMap<String, BTreeSet<String>>,
    /// Optional numeric range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_range: Option<NumericRange>,
    /// Requested ordering
    #[serde(default)]
    pub sort_key: SortKey,
}

impl SearchCriteria {
    /// Create criteria with only free text set
    pub fn new(free_text: impl Into<String>) -> Self {
        SearchCriteria {
            free_text: free_text.into(),
            ..Default::default()
        }
    }

    /// Builder: replace the whole scope
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Builder: restrict to a store
    pub fn with_store(mut self, store_id: impl Into<String>) -> Self {
        self.scope.store_id = Some(store_id.into());
        self
    }

    /// Builder: restrict to a category path
    pub fn with_category(mut self, category_path: impl Into<String>) -> Self {
        self.scope.category_path = Some(category_path.into());
        self
    }

    /// Builder: restrict to a city
    pub fn with_city(mut self, city_id: impl Into<String>) -> Self {
        self.scope.city_id = Some(city_id.into());
        self
    }

    /// Builder: restrict to an area
    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.scope.area_id = Some(area_id.into());
        self
    }

    /// Builder: add one selected value for a facet field
    pub fn select(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.facet_selections
            .entry(field.into())
            .or_default()
            .insert(value.into());
        self
    }

    /// Builder: add several selected values for a facet field
    pub fn select_all<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let entry = self.facet_selections.entry(field.into()).or_default();
        entry.extend(values.into_iter().map(Into::into));
        self
    }

    /// Builder: remove a selected value, dropping the field once it is empty
    pub fn deselect(mut self, field: &str, value: &str) -> Self {
        if let Some(values) = self.facet_selections.get_mut(field) {
            values.remove(value);
            if values.is_empty() {
                self.facet_selections.remove(field);
            }
        }
        self
    }

    /// Builder: set numeric range
    pub fn with_range(mut self, range: NumericRange) -> Self {
        self.numeric_range = Some(range);
        self
    }

    /// Builder: set sort key
    pub fn with_sort(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Facet fields with at least one selected value, in canonical order
    pub fn active_facets(&self) -> impl Iterator<Item = &str> {
        self.facet_selections
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, _)| field.as_str())
    }

    /// Whether `field` has at least one selected value
    pub fn is_facet_active(&self, field: &str) -> bool {
        self.active_facets().any(|active| active == field)
    }
}
