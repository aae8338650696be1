//! Facet derivation over the attribute stores of an industry's active
//! listings.
//!
//! The scan is O(listings x attributes) and recomputed on every call; there
//! is no incremental index. Listings are visited in id order so the output is
//! identical no matter how the storage layer happened to iterate.

use crate::attribute::{AttributeKind, AttributeValue};
use crate::listing::Listing;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// A derived facet: an option set, a numeric range, or a bare presence
/// toggle depending on the attribute kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub key: String,
    pub label: String,
    pub kind: AttributeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

struct Accumulator {
    label: String,
    kind: AttributeKind,
    unit: Option<String>,
    options: BTreeSet<String>, // iterates lexicographically
    min: Option<f64>,
    max: Option<f64>,
}

/// Derive the filter schema for one industry's active material listings.
/// Keys appear in discovery order; option sets come out sorted; min/max only
/// ever widen.
pub fn derive_filters(listings: &[Listing]) -> Vec<FilterDescriptor> {
    let mut ordered: Vec<&Listing> = listings
        .iter()
        .filter(|listing| listing.is_active && listing.is_material())
        .collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let mut accumulators: IndexMap<String, Accumulator> = IndexMap::new();

    for listing in ordered {
        for (key, entry) in &listing.attributes {
            if !entry.filter_enabled {
                continue;
            }

            let acc = accumulators
                .entry(key.clone())
                .or_insert_with(|| Accumulator {
                    label: entry.label.clone(),
                    kind: entry.value.kind(),
                    unit: entry.unit.clone(),
                    options: BTreeSet::new(),
                    min: None,
                    max: None,
                });

            match &entry.value {
                AttributeValue::Select(value) => {
                    acc.options.insert(value.clone());
                }
                AttributeValue::MultiSelect(values) => {
                    for value in values {
                        acc.options.insert(value.clone());
                    }
                }
                AttributeValue::Number(n) | AttributeValue::Range(n) => {
                    // first observation seeds both bounds, later ones widen
                    acc.min = Some(acc.min.map_or(*n, |m| m.min(*n)));
                    acc.max = Some(acc.max.map_or(*n, |m| m.max(*n)));
                }
                // text and boolean stay a bare presence toggle
                AttributeValue::Text(_) | AttributeValue::Boolean(_) => {}
            }
        }
    }

    accumulators
        .into_iter()
        .map(|(key, acc)| FilterDescriptor {
            key,
            label: acc.label,
            kind: acc.kind,
            unit: acc.unit,
            options: acc.options.into_iter().collect(),
            min: acc.min,
            max: acc.max,
        })
        .collect()
}
