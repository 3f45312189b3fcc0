//! Provider-shaped raw records.
//!
//! Each provider client flattens its own payload into a [`RawRecord`] keyed by
//! the display names in [`keys`]. Values keep whatever JSON type the provider
//! sent (a rating may arrive as a number or a string), so coercion happens in
//! exactly one place: the normalizer. Raw records are never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::business::Business;

/// Keys understood by the normalizer.
pub mod keys {
    pub const NAME: &str = "Business Name";
    pub const ADDRESS: &str = "Address";
    pub const PHONE: &str = "Phone";
    pub const RATING: &str = "Rating";
    pub const REVIEW_COUNT: &str = "Review Count";
    /// Alternate spelling some payloads use for [`REVIEW_COUNT`].
    pub const REVIEWS: &str = "Reviews";
    pub const WEBSITE: &str = "Website";
    pub const BUSINESS_TYPE: &str = "Business Type";
    pub const LOCATION: &str = "Location";
    pub const SOURCE: &str = "Source";
    pub const PLACE_ID: &str = "Place Id";
    pub const CATEGORIES: &str = "Categories";

    // Detail-only keys; carried for display, dropped by the normalizer.
    pub const PRICE: &str = "Price";
    pub const PRICE_LEVEL: &str = "Price Level";
    pub const BUSINESS_STATUS: &str = "Business Status";
    pub const HOURS: &str = "Hours";
    pub const DISTANCE: &str = "Distance";
}

/// An opaque key/value mapping in provider-specific shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_owned(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value as a string slice when it is a JSON string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Re-expresses a canonical record in raw shape so it can be fed back through
/// the normalizer; cleaning the result yields the same business.
impl From<&Business> for RawRecord {
    fn from(b: &Business) -> Self {
        RawRecord::new()
            .with(keys::NAME, b.name.clone())
            .with(keys::ADDRESS, b.address.clone())
            .with(keys::PHONE, b.phone.clone())
            .with(keys::RATING, b.rating)
            .with(keys::REVIEW_COUNT, b.review_count)
            .with(keys::WEBSITE, b.website.clone())
            .with(keys::BUSINESS_TYPE, b.business_category.clone())
            .with(
                keys::LOCATION,
                serde_json::json!({ "lat": b.location.lat, "lng": b.location.lng }),
            )
            .with(keys::SOURCE, b.source.clone())
            .with(keys::PLACE_ID, b.external_id.clone())
            .with(keys::CATEGORIES, b.categories.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_inserts_values() {
        let raw = RawRecord::new()
            .with(keys::NAME, "Acme")
            .with(keys::RATING, 4.5);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get_str(keys::NAME), Some("Acme"));
        assert_eq!(raw.get(keys::RATING).and_then(Value::as_f64), Some(4.5));
        assert_eq!(raw.get_str(keys::RATING), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let raw = RawRecord::new().with(keys::NAME, "Acme");
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json, serde_json::json!({ "Business Name": "Acme" }));
    }
}
