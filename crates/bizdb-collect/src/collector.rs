//! Multi-category collection across one or more providers.
//!
//! Each category is searched on every provider in order, cleaned, and merged
//! with the first provider as primary. Categories are independent: a provider
//! failure costs that provider's contribution to that category and nothing
//! else.

use bizdb_core::{
    clean, merge_all, radius_meters_from_miles, Business, MAX_RADIUS_MILES, MIN_RADIUS_MILES,
};
use bizdb_providers::Provider;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::RequestError;

/// A primary category plus up to four additional ones.
pub const MAX_CATEGORIES: usize = 5;

/// What to collect: categories near a location within a radius.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub categories: Vec<String>,
    pub location: String,
    pub radius_m: u32,
}

impl CollectionRequest {
    /// Validates operator input for an on-demand collection.
    ///
    /// Categories are trimmed; blanks and case-insensitive duplicates are
    /// dropped before the count is checked.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] describing the first rejected parameter.
    pub fn on_demand(
        categories: &[String],
        location: &str,
        radius_miles: u32,
    ) -> Result<Self, RequestError> {
        let mut kept: Vec<String> = Vec::new();
        for category in categories {
            let category = category.trim();
            if category.is_empty() {
                continue;
            }
            if kept.iter().any(|k| k.eq_ignore_ascii_case(category)) {
                continue;
            }
            kept.push(category.to_string());
        }
        if kept.is_empty() {
            return Err(RequestError::NoCategories);
        }
        if kept.len() > MAX_CATEGORIES {
            return Err(RequestError::TooManyCategories {
                max: MAX_CATEGORIES,
                got: kept.len(),
            });
        }

        let location = location.trim();
        if location.is_empty() {
            return Err(RequestError::EmptyLocation);
        }
        if !(MIN_RADIUS_MILES..=MAX_RADIUS_MILES).contains(&radius_miles) {
            return Err(RequestError::RadiusOutOfRange {
                min: MIN_RADIUS_MILES,
                max: MAX_RADIUS_MILES,
                got: radius_miles,
            });
        }

        Ok(Self {
            categories: kept,
            location: location.to_string(),
            radius_m: radius_meters_from_miles(radius_miles),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

/// Per-category result of one collection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOutcome {
    pub category: String,
    pub records: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProviderFailure>,
}

impl CategoryOutcome {
    /// Every provider failed for this category.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.records == 0 && !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub businesses: Vec<Business>,
    pub by_category: Vec<CategoryOutcome>,
}

impl Collection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.businesses.is_empty()
    }

    /// The operator-facing explanation for an empty collection.
    #[must_use]
    pub fn empty_reason(&self, location: &str) -> Option<String> {
        self.is_empty().then(|| no_results_message(location))
    }
}

#[must_use]
pub fn no_results_message(location: &str) -> String {
    format!("No businesses found in {location} for the selected categories.")
}

/// Collects every category in `request`, at most `max_concurrent` at a time.
///
/// Results are accumulated in request order regardless of completion order.
pub async fn collect(
    providers: &[Provider],
    request: &CollectionRequest,
    max_concurrent: usize,
) -> Collection {
    let location = request.location.as_str();
    let radius_m = request.radius_m;
    let outcomes: Vec<(CategoryOutcome, Vec<Business>)> = stream::iter(request.categories.clone())
        .map(|category| async move {
            collect_category(providers, &category, location, radius_m).await
        })
        .buffered(max_concurrent.max(1))
        .collect()
        .await;

    let mut collection = Collection::default();
    for (outcome, businesses) in outcomes {
        collection.businesses.extend(businesses);
        collection.by_category.push(outcome);
    }

    tracing::info!(
        location = %request.location,
        categories = request.categories.len(),
        records = collection.businesses.len(),
        "collection pass finished"
    );
    collection
}

async fn collect_category(
    providers: &[Provider],
    category: &str,
    location: &str,
    radius_m: u32,
) -> (CategoryOutcome, Vec<Business>) {
    let mut per_provider: Vec<Vec<Business>> = Vec::with_capacity(providers.len());
    let mut failures = Vec::new();

    for provider in providers {
        match provider.try_search(category, location, radius_m).await {
            Ok(raw) => {
                let mut cleaned = clean(&raw);
                for business in &mut cleaned {
                    business.business_category = category.to_string();
                }
                per_provider.push(cleaned);
            }
            Err(e) => {
                tracing::warn!(
                    provider = %provider.kind(),
                    category,
                    location,
                    error = %e,
                    "provider search failed; category continues without it"
                );
                failures.push(ProviderFailure {
                    provider: provider.kind().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    let businesses = merge_all(per_provider);
    let outcome = CategoryOutcome {
        category: category.to_string(),
        records: businesses.len(),
        failures,
    };
    (outcome, businesses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn on_demand_trims_and_dedups_categories() {
        let request = CollectionRequest::on_demand(
            &strings(&[" Lawyers ", "", "lawyers", "Paralegal"]),
            "  Troy, MI ",
            5,
        )
        .unwrap();
        assert_eq!(request.categories, vec!["Lawyers", "Paralegal"]);
        assert_eq!(request.location, "Troy, MI");
        assert_eq!(request.radius_m, 5 * 1609);
    }

    #[test]
    fn on_demand_rejects_bad_input() {
        assert_eq!(
            CollectionRequest::on_demand(&strings(&["  "]), "Troy", 5),
            Err(RequestError::NoCategories)
        );
        assert_eq!(
            CollectionRequest::on_demand(&strings(&["a", "b", "c", "d", "e", "f"]), "Troy", 5),
            Err(RequestError::TooManyCategories { max: 5, got: 6 })
        );
        assert_eq!(
            CollectionRequest::on_demand(&strings(&["a"]), " ", 5),
            Err(RequestError::EmptyLocation)
        );
        assert_eq!(
            CollectionRequest::on_demand(&strings(&["a"]), "Troy", 26),
            Err(RequestError::RadiusOutOfRange {
                min: 1,
                max: 25,
                got: 26
            })
        );
    }

    #[test]
    fn empty_collection_explains_itself() {
        let collection = Collection::default();
        assert_eq!(
            collection.empty_reason("Troy, MI").as_deref(),
            Some("No businesses found in Troy, MI for the selected categories.")
        );
    }

    #[test]
    fn category_with_only_failures_is_failed() {
        let outcome = CategoryOutcome {
            category: "Lawyers".to_string(),
            records: 0,
            failures: vec![ProviderFailure {
                provider: "yelp".to_string(),
                error: "timeout".to_string(),
            }],
        };
        assert!(outcome.is_failed());
    }

    #[tokio::test]
    async fn no_providers_collects_nothing() {
        let request = CollectionRequest::on_demand(&strings(&["Lawyers"]), "Troy", 5).unwrap();
        let collection = collect(&[], &request, 2).await;
        assert!(collection.is_empty());
        assert_eq!(collection.by_category.len(), 1);
        assert!(!collection.by_category[0].is_failed());
    }
}
