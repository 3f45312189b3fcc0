//! Uniform tabular projection of cleaned businesses for storage and display.

use serde::Serialize;

use crate::business::Business;

/// One display row. Every column is always populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessTableRow {
    pub name: String,
    pub address: String,
    pub address_type: String,
    pub address_color: String,
    pub phone: String,
    pub rating: f64,
    pub review_count: u32,
    pub website: String,
    pub business_category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub external_id: String,
    pub categories: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusinessTable {
    pub rows: Vec<BusinessTableRow>,
}

impl BusinessTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row counts per search category, most frequent first, ties by name.
    #[must_use]
    pub fn category_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for row in &self.rows {
            match counts.iter_mut().find(|(c, _)| *c == row.business_category) {
                Some((_, n)) => *n += 1,
                None => counts.push((row.business_category.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

/// Projects businesses into rows. This is where a non-finite or negative
/// rating collapses to `0.0` and blank contact fields to empty strings.
#[must_use]
pub fn to_table(businesses: &[Business]) -> BusinessTable {
    let rows = businesses
        .iter()
        .map(|b| BusinessTableRow {
            name: b.name.clone(),
            address: b.address.clone(),
            address_type: b.address_type.to_string(),
            address_color: b.address_color().to_owned(),
            phone: b.phone.trim().to_owned(),
            rating: if b.rating.is_finite() && b.rating > 0.0 {
                b.rating
            } else {
                0.0
            },
            review_count: b.review_count,
            website: b.website.trim().to_owned(),
            business_category: b.business_category.clone(),
            latitude: b.location.lat,
            longitude: b.location.lng,
            source: b.source.clone(),
            external_id: b.external_id.clone(),
            categories: b.categories.join(", "),
            created_at: b
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        })
        .collect();
    BusinessTable { rows }
}
