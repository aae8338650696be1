//! Filtering, search and pagination over listings and requests.

use crate::attribute::AttributeValue;
use crate::listing::Listing;
use crate::request::{Request, RequestStatus};
use crate::store::CatalogStore;
use crate::timestamp::TimeStamp;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

/// One attribute constraint from the buyer-facing filter UI, parsed out of
/// the JSON filter map.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeConstraint {
    /// Exact membership; for multiselect values the listing matches when its
    /// value set intersects the selected set.
    OneOf(Vec<String>),
    /// Inclusive numeric bounds; either side may be open.
    Between { min: Option<f64>, max: Option<f64> },
    Flag(bool),
}

impl AttributeConstraint {
    /// `{key: [..]}` selects options, `{key: {min,max}}` bounds a numeric
    /// attribute, a bare scalar is shorthand for the matching single-value
    /// constraint. Unusable shapes yield None and are dropped by the caller.
    pub fn from_json(raw: &serde_json::Value) -> Option<Self> {
        match raw {
            serde_json::Value::Array(values) => {
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    out.push(value.as_str()?.to_string());
                }
                Some(AttributeConstraint::OneOf(out))
            }
            serde_json::Value::Object(bounds) => {
                let min = bounds.get("min").and_then(|v| v.as_f64());
                let max = bounds.get("max").and_then(|v| v.as_f64());
                if min.is_none() && max.is_none() {
                    return None;
                }
                Some(AttributeConstraint::Between { min, max })
            }
            serde_json::Value::String(value) => {
                Some(AttributeConstraint::OneOf(vec![value.clone()]))
            }
            serde_json::Value::Number(n) => {
                let n = n.as_f64()?;
                Some(AttributeConstraint::Between {
                    min: Some(n),
                    max: Some(n),
                })
            }
            serde_json::Value::Bool(flag) => Some(AttributeConstraint::Flag(*flag)),
            serde_json::Value::Null => None,
        }
    }

    pub fn matches(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (AttributeConstraint::OneOf(selected), AttributeValue::Select(v))
            | (AttributeConstraint::OneOf(selected), AttributeValue::Text(v)) => {
                selected.iter().any(|s| s == v)
            }
            (AttributeConstraint::OneOf(selected), AttributeValue::MultiSelect(values)) => values
                .iter()
                .any(|v| selected.iter().any(|s| s == v)),
            (AttributeConstraint::Between { min, max }, AttributeValue::Number(n))
            | (AttributeConstraint::Between { min, max }, AttributeValue::Range(n)) => {
                min.is_none_or(|m| *n >= m) && max.is_none_or(|m| *n <= m)
            }
            (AttributeConstraint::Flag(expected), AttributeValue::Boolean(actual)) => {
                expected == actual
            }
            _ => false,
        }
    }
}

/// Parse the `filters=<json>` query parameter into keyed constraints.
/// Non-object payloads and unusable entries are ignored rather than erroring,
/// matching the forgiving read path.
pub fn parse_filter_map(raw: &str) -> BTreeMap<String, AttributeConstraint> {
    let mut out = BTreeMap::new();
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str(raw) else {
        return out;
    };
    for (key, value) in map {
        if let Some(constraint) = AttributeConstraint::from_json(&value) {
            out.insert(key, constraint);
        }
    }
    out
}

#[derive(Debug, Default, Clone)]
pub struct ListingQuery {
    pub industry_id: Option<String>,
    pub search: Option<String>,
    pub filters: BTreeMap<String, AttributeConstraint>,
    pub page: usize, // 1-indexed
}

#[derive(Debug, Default, Clone)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    pub industry_id: Option<String>,
    pub listing_id: Option<String>,
    pub search: Option<String>,
    pub created_from: Option<TimeStamp<Utc>>,
    pub created_to: Option<TimeStamp<Utc>>,
    pub page: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// 1-indexed pagination; out-of-range pages come back empty, never an error.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let total = items.len();
    let total_pages = total.div_ceil(page_size);
    let page = page.max(1);

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        total,
        page,
        page_size,
        total_pages,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Buyer-facing match: inactive listings are invisible, attribute constraints
/// are AND across keys, search is case-insensitive substring over the fixed
/// text fields.
pub fn listing_matches(listing: &Listing, query: &ListingQuery) -> bool {
    if !listing.is_active {
        return false;
    }
    if let Some(industry_id) = &query.industry_id {
        if &listing.industry_id != industry_id {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let hit = contains_ci(&listing.name, &needle)
            || contains_ci(&listing.code, &needle)
            || contains_ci(&listing.description, &needle)
            || contains_ci(&listing.company_name, &needle);
        if !hit {
            return false;
        }
    }
    for (key, constraint) in &query.filters {
        match listing.attributes.get(key) {
            Some(entry) if constraint.matches(&entry.value) => {}
            _ => return false,
        }
    }
    true
}

pub fn request_matches(request: &Request, query: &RequestQuery) -> bool {
    if let Some(status) = query.status {
        if request.status != status {
            return false;
        }
    }
    if let Some(industry_id) = &query.industry_id {
        if &request.industry_id != industry_id {
            return false;
        }
    }
    if let Some(listing_id) = &query.listing_id {
        if &request.listing_id != listing_id {
            return false;
        }
    }
    if let Some(from) = &query.created_from {
        if request.created_at < *from {
            return false;
        }
    }
    if let Some(to) = &query.created_to {
        if request.created_at > *to {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let hit = contains_ci(&request.buyer.name, &needle)
            || contains_ci(&request.buyer.company_name, &needle)
            || request
                .buyer
                .email
                .as_deref()
                .is_some_and(|e| contains_ci(e, &needle))
            || contains_ci(&request.request_code, &needle);
        if !hit {
            return false;
        }
    }
    true
}

/// Full scan, filter, newest-first ordering, then pagination. Matches the
/// no-incremental-index model: the result is recomputed from the tree on
/// every call.
pub fn run_listing_query(
    store: &CatalogStore,
    query: &ListingQuery,
    page_size: usize,
) -> anyhow::Result<Page<Listing>> {
    let mut matched: Vec<Listing> = store
        .listings()?
        .into_iter()
        .filter(|listing| listing_matches(listing, query))
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    Ok(paginate(matched, query.page, page_size))
}

pub fn run_request_query(
    store: &CatalogStore,
    query: &RequestQuery,
    page_size: usize,
) -> anyhow::Result<Page<Request>> {
    let mut matched: Vec<Request> = store
        .requests()?
        .into_iter()
        .filter(|request| request_matches(request, query))
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

    Ok(paginate(matched, query.page, page_size))
}
