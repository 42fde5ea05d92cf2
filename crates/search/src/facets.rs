//! Facet count merging
//!
//! Each page carries facet counts. The aggregator folds them into the facet
//! model shown next to the results, using one of two policies:
//!
//! - `Replace`: the incoming counts become the model. Suits the baseline view.
//! - `Accumulate`: incoming counts overwrite matching `(field, value)` pairs,
//!   and values only present in the model stay. Suits a dimension that is
//!   being refined, where the sibling values must stay visible.
//!
//! Which policy applies to which field is decided by [`FacetPolicy`].

use facetstream_core::{FacetCounts, SearchCriteria};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How one field's counts are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Incoming counts replace existing ones
    Replace,
    /// Incoming counts are merged into existing ones
    Accumulate,
}

/// Rule choosing a [`MergePolicy`] per facet field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacetPolicy {
    /// Every field is replaced
    Replace,
    /// Every field accumulates
    Accumulate,
    /// Fields with a selection in the criteria accumulate, the rest are replaced
    #[default]
    ActiveFacet,
}

impl FacetPolicy {
    /// Policy for `field` under `criteria`
    pub fn policy_for(self, criteria: &SearchCriteria, field: &str) -> MergePolicy {
        match self {
            FacetPolicy::Replace => MergePolicy::Replace,
            FacetPolicy::Accumulate => MergePolicy::Accumulate,
            FacetPolicy::ActiveFacet if criteria.is_facet_active(field) => MergePolicy::Accumulate,
            FacetPolicy::ActiveFacet => MergePolicy::Replace,
        }
    }
}

/// Stateless facet merger
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetAggregator;

impl FacetAggregator {
    /// Merge `incoming` into `existing` with one policy for every field
    pub fn merge(existing: &FacetCounts, incoming: &FacetCounts, policy: MergePolicy) -> FacetCounts {
        Self::merge_by_field(existing, incoming, |_| policy)
    }

    /// Merge `incoming` into `existing`, asking `policy_for` about each field
    ///
    /// Fields are visited in canonical order; a replaced field that is absent
    /// from `incoming` disappears from the result.
    pub fn merge_by_field<F>(existing: &FacetCounts, incoming: &FacetCounts, policy_for: F) -> FacetCounts
    where
        F: Fn(&str) -> MergePolicy,
    {
        let fields: BTreeSet<&String> = existing.keys().chain(incoming.keys()).collect();

        let mut merged = FacetCounts::new();
        for field in fields {
            let values = match policy_for(field.as_str()) {
                MergePolicy::Replace => match incoming.get(field) {
                    Some(values) => values.clone(),
                    None => continue,
                },
                MergePolicy::Accumulate => {
                    let mut values = existing.get(field).cloned().unwrap_or_default();
                    if let Some(fresh) = incoming.get(field) {
                        values.extend(fresh.iter().map(|(v, c)| (v.clone(), *c)));
                    }
                    values
                }
            };
            merged.insert(field.clone(), values);
        }
        merged
    }
}
