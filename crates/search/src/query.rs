//! Query building
//!
//! Turns a [`SearchCriteria`] into a [`FetchRequest`]:
//! - facet selections: OR within a field, AND across fields
//! - numeric range: `field >= min` / `field <= max`, each only when bounded
//! - scope: one AND clause per present scope field
//! - free text and sort key: separate request parameters
//!
//! Output is canonical. Fields and values come out of ordered collections, so
//! equal criteria always serialize to byte-identical expressions.
//!
//! QueryBuilder is STATELESS and does no I/O.

use facetstream_core::{FetchRequest, NumericRange, Scope, SearchCriteria};
use serde_json::Value;

/// Filter field name for `Scope::store_id`
pub const SCOPE_STORE_FIELD: &str = "store";
/// Filter field name for `Scope::category_path`
pub const SCOPE_CATEGORY_FIELD: &str = "category";
/// Filter field name for `Scope::city_id`
pub const SCOPE_CITY_FIELD: &str = "city";
/// Filter field name for `Scope::area_id`
pub const SCOPE_AREA_FIELD: &str = "area";

// ============================================================================
// Clause
// ============================================================================

/// One AND term of the compound filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Any of the `field:value` terms matches
    AnyOf(Vec<String>),
    /// A single comparison such as `price >= 100`
    Compare(String),
}

impl Clause {
    fn render(&self, out: &mut String) {
        out.push('(');
        match self {
            Clause::AnyOf(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    out.push_str(term);
                }
            }
            Clause::Compare(expr) => out.push_str(expr),
        }
        out.push(')');
    }
}

/// Render `field:value`, quoting the value when it is not a bare token
pub fn term(field: &str, value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if bare {
        return format!("{}:{}", field, value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    format!("{}:{}", field, quoted)
}

// ============================================================================
// QueryBuilder
// ============================================================================

/// Stateless translator from criteria to fetch requests
///
/// # Examples
///
/// ```
/// use facetstream_core::SearchCriteria;
/// use facetstream_search::QueryBuilder;
///
/// let criteria = SearchCriteria::new("")
///     .select("color", "red")
///     .select("color", "blue")
///     .with_category("sarees");
///
/// let req = QueryBuilder::build(&criteria, 0, 20);
/// assert_eq!(
///     req.filter_expression,
///     "(color:blue OR color:red) AND (category:sarees)"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the request for `page` of `criteria`
    ///
    /// A `page_size` of zero is raised to one so the request always asks for
    /// at least one item.
    pub fn build(criteria: &SearchCriteria, page: u32, page_size: u32) -> FetchRequest {
        FetchRequest {
            free_text: criteria.free_text.clone(),
            page,
            page_size: page_size.max(1),
            filter_expression: Self::filter_expression(criteria),
            facet_filter_expression: Self::facet_filter_expression(criteria),
            sort_key: criteria.sort_key.clone(),
        }
    }

    /// All AND clauses for `criteria`, in canonical order
    ///
    /// Facet groups come first (by field name), then the numeric range, then
    /// scope in store, category, city, area order.
    pub fn clauses(criteria: &SearchCriteria) -> Vec<Clause> {
        let mut clauses: Vec<Clause> = Self::facet_groups(criteria)
            .into_iter()
            .map(Clause::AnyOf)
            .collect();

        if let Some(range) = &criteria.numeric_range {
            clauses.extend(range_clauses(range));
        }

        clauses.extend(scope_clauses(&criteria.scope));
        clauses
    }

    /// Facet selections as OR groups, one per field with selected values
    pub fn facet_groups(criteria: &SearchCriteria) -> Vec<Vec<String>> {
        criteria
            .facet_selections
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, values)| values.iter().map(|v| term(field, v)).collect())
            .collect()
    }

    /// The compound boolean filter for `criteria`
    ///
    /// Empty criteria yield the empty string.
    pub fn filter_expression(criteria: &SearchCriteria) -> String {
        let mut out = String::new();
        for (i, clause) in Self::clauses(criteria).iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            clause.render(&mut out);
        }
        out
    }

    /// Facet groups as a JSON array of arrays (outer AND, inner OR)
    pub fn facet_filter_expression(criteria: &SearchCriteria) -> String {
        let groups = Self::facet_groups(criteria)
            .into_iter()
            .map(|group| Value::Array(group.into_iter().map(Value::String).collect()))
            .collect();
        Value::Array(groups).to_string()
    }
}

fn range_clauses(range: &NumericRange) -> Vec<Clause> {
    let mut clauses = Vec::with_capacity(2);
    if let Some(min) = range.lower() {
        clauses.push(Clause::Compare(format!("{} >= {}", range.field, min)));
    }
    if let Some(max) = range.upper() {
        clauses.push(Clause::Compare(format!("{} <= {}", range.field, max)));
    }
    clauses
}

fn scope_clauses(scope: &Scope) -> Vec<Clause> {
    [
        (SCOPE_STORE_FIELD, &scope.store_id),
        (SCOPE_CATEGORY_FIELD, &scope.category_path),
        (SCOPE_CITY_FIELD, &scope.city_id),
        (SCOPE_AREA_FIELD, &scope.area_id),
    ]
    .into_iter()
    .filter_map(|(field, value)| {
        value
            .as_deref()
            .map(|v| Clause::AnyOf(vec![term(field, v)]))
    })
    .collect()
}
