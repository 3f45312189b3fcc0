//! Field-level merge of two same-cycle result sets.
//!
//! Two records are the same business when their dedup keys match: name and
//! address, lowercased with runs of whitespace collapsed. On a match the
//! primary record's fields win and the secondary only fills fields the primary
//! left empty or zero. Ratings and review counts follow the same rule, so when
//! both sides report a nonzero value the primary's is kept.

use std::collections::HashMap;

use crate::business::Business;
use crate::classify::classify_address;

/// The (normalized name, normalized address) pair identifying a business.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub name: String,
    pub address: String,
}

impl DedupKey {
    #[must_use]
    pub fn of(business: &Business) -> Self {
        Self {
            name: normalize_key_part(&business.name),
            address: normalize_key_part(&business.address),
        }
    }

    /// Records with neither a name nor an address carry no identity and are
    /// never collapsed into each other.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.address.is_empty()
    }
}

fn normalize_key_part(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Merges `secondary` into `primary`, deduplicating on [`DedupKey`].
///
/// Output order is first appearance: primary records in their order, then
/// secondary records that matched nothing. Duplicates within a single side
/// are folded the same way, earlier records acting as primary.
#[must_use]
pub fn merge(primary: Vec<Business>, secondary: Vec<Business>) -> Vec<Business> {
    let mut merged: Vec<Business> = Vec::with_capacity(primary.len() + secondary.len());
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for business in primary.into_iter().chain(secondary) {
        let key = DedupKey::of(&business);
        if key.is_blank() {
            merged.push(business);
            continue;
        }
        if let Some(&pos) = index.get(&key) {
            fill_from(&mut merged[pos], business);
        } else {
            index.insert(key, merged.len());
            merged.push(business);
        }
    }

    merged
}

/// Folds any number of sources left to right; the first is the most preferred.
#[must_use]
pub fn merge_all(sources: Vec<Vec<Business>>) -> Vec<Business> {
    sources
        .into_iter()
        .reduce(merge)
        .unwrap_or_default()
}

fn fill_from(target: &mut Business, other: Business) {
    fill_text(&mut target.name, other.name);
    fill_text(&mut target.address, other.address);
    fill_text(&mut target.phone, other.phone);
    fill_text(&mut target.website, other.website);
    fill_text(&mut target.business_category, other.business_category);
    fill_text(&mut target.source, other.source);
    fill_text(&mut target.external_id, other.external_id);

    if target.rating <= 0.0 {
        target.rating = other.rating;
    }
    if target.review_count == 0 {
        target.review_count = other.review_count;
    }
    if target.location.is_unknown() {
        target.location = other.location;
    }
    if target.categories.is_empty() {
        target.categories = other.categories;
    }
    if target.created_at.is_none() {
        target.created_at = other.created_at;
    }

    // Keep the derived classification consistent with the surviving address.
    target.address_type = classify_address(&target.address).0;
}

fn fill_text(target: &mut String, other: String) {
    if target.trim().is_empty() {
        *target = other;
    }
}
