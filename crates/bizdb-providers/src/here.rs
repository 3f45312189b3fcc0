//! HERE Geocoding & Search client. HERE has no ratings or reviews, so those
//! fields are always written as zero.

use bizdb_core::{keys, ProviderKind, RawRecord};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::http::{build_client, decode, fetch_json, parse_endpoint, require_key, HttpSettings};

const KIND: ProviderKind = ProviderKind::Here;

#[derive(Debug, Clone)]
pub struct HereEndpoints {
    pub geocode: String,
    pub discover: String,
    pub lookup: String,
}

impl Default for HereEndpoints {
    fn default() -> Self {
        Self {
            geocode: "https://geocode.search.hereapi.com/v1/geocode".to_string(),
            discover: "https://discover.search.hereapi.com/v1/discover".to_string(),
            lookup: "https://lookup.search.hereapi.com/v1/lookup".to_string(),
        }
    }
}

impl HereEndpoints {
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            geocode: format!("{base}/v1/geocode"),
            discover: format!("{base}/v1/discover"),
            lookup: format!("{base}/v1/lookup"),
        }
    }
}

#[derive(Clone)]
pub struct HereClient {
    client: Client,
    api_key: String,
    settings: HttpSettings,
    geocode_url: Url,
    discover_url: Url,
    lookup_url: Url,
}

impl std::fmt::Debug for HereClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HereClient")
            .field("geocode_url", &self.geocode_url.as_str())
            .field("discover_url", &self.discover_url.as_str())
            .field("lookup_url", &self.lookup_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Item {
    id: String,
    title: String,
    address: Address,
    position: Option<Position>,
    contacts: Vec<Contact>,
    categories: Vec<Category>,
    distance: Option<Value>,
    opening_hours: Vec<OpeningHours>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Address {
    label: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Position {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Contact {
    phone: Vec<ContactValue>,
    www: Vec<ContactValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactValue {
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Category {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpeningHours {
    text: Vec<String>,
}

impl HereClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, ProviderError> {
        Self::with_endpoints(api_key, settings, HereEndpoints::default())
    }

    /// # Errors
    ///
    /// See [`HereClient::with_endpoints`].
    pub fn with_base_url(
        api_key: &str,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Self::with_endpoints(api_key, settings, HereEndpoints::with_base_url(base_url))
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key,
    /// [`ProviderError::InvalidBaseUrl`] for an unparseable endpoint, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn with_endpoints(
        api_key: &str,
        settings: &HttpSettings,
        endpoints: HereEndpoints,
    ) -> Result<Self, ProviderError> {
        let api_key = require_key(KIND, api_key)?;
        Ok(Self {
            client: build_client(settings)?,
            api_key,
            settings: settings.clone(),
            geocode_url: parse_endpoint(&endpoints.geocode)?,
            discover_url: parse_endpoint(&endpoints.discover)?,
            lookup_url: parse_endpoint(&endpoints.lookup)?,
        })
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::GeocodeMiss`] when nothing matches, or any
    /// transport error.
    pub async fn geocode(&self, location: &str) -> Result<(f64, f64), ProviderError> {
        let body = fetch_json(&self.settings, KIND, "geocode", || {
            self.client
                .get(self.geocode_url.clone())
                .query(&[("q", location), ("apiKey", self.api_key.as_str())])
        })
        .await?;
        let response: ItemsResponse = decode(body, KIND, "geocode")?;

        response
            .items
            .iter()
            .find_map(|item| item.position)
            .map(|p| (p.lat, p.lng))
            .ok_or_else(|| ProviderError::GeocodeMiss {
                provider: KIND,
                location: location.to_owned(),
            })
    }

    /// Discover search for `query` within `radius_m` of `location`, at most 20
    /// results.
    ///
    /// # Errors
    ///
    /// Returns geocoding or transport errors.
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        radius_m: u32,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let (lat, lng) = self.geocode(location).await?;
        let area = format!("circle:{lat},{lng};r={radius_m}");
        let limit = KIND.max_results().to_string();

        let body = fetch_json(&self.settings, KIND, "discover", || {
            self.client.get(self.discover_url.clone()).query(&[
                ("apiKey", self.api_key.as_str()),
                ("q", query),
                ("in", area.as_str()),
                ("limit", limit.as_str()),
            ])
        })
        .await?;
        let response: ItemsResponse = decode(body, KIND, "discover")?;

        tracing::debug!(
            provider = %KIND,
            query,
            location,
            count = response.items.len(),
            "here search complete"
        );
        Ok(response
            .items
            .into_iter()
            .map(|item| item_to_raw(item, query))
            .collect())
    }

    /// # Errors
    ///
    /// Returns transport or decoding errors other than a 404.
    pub async fn details(&self, place_id: &str) -> Result<Option<RawRecord>, ProviderError> {
        let result = fetch_json(&self.settings, KIND, "lookup", || {
            self.client
                .get(self.lookup_url.clone())
                .query(&[("id", place_id), ("apiKey", self.api_key.as_str())])
        })
        .await;

        let body = match result {
            Ok(body) => body,
            Err(ProviderError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        // Lookup answers with the bare item; tolerate an `items` envelope too.
        let item: Option<Item> = if body.get("items").is_some() {
            let response: ItemsResponse = decode(body, KIND, "lookup")?;
            response.items.into_iter().next()
        } else {
            Some(decode(body, KIND, "lookup")?)
        };

        Ok(item.map(|mut item| {
            let hours: Vec<String> = std::mem::take(&mut item.opening_hours)
                .into_iter()
                .flat_map(|h| h.text)
                .collect();
            let mut raw = item_to_raw(item, "");
            raw.insert(keys::HOURS, hours);
            raw
        }))
    }
}

fn item_to_raw(item: Item, query: &str) -> RawRecord {
    let contact = item.contacts.into_iter().next().unwrap_or_default();
    let first_value = |values: Vec<ContactValue>| {
        values
            .into_iter()
            .next()
            .map(|v| v.value)
            .unwrap_or_default()
    };
    let (lat, lng) = item.position.map_or((0.0, 0.0), |p| (p.lat, p.lng));
    let categories: Vec<String> = item.categories.into_iter().map(|c| c.name).collect();

    RawRecord::new()
        .with(keys::NAME, item.title)
        .with(keys::ADDRESS, item.address.label)
        .with(keys::PHONE, first_value(contact.phone))
        .with(keys::WEBSITE, first_value(contact.www))
        .with(keys::BUSINESS_TYPE, query)
        .with(keys::LOCATION, json!({ "lat": lat, "lng": lng }))
        .with(keys::RATING, 0.0)
        .with(keys::REVIEWS, 0)
        .with(keys::CATEGORIES, categories)
        .with(keys::DISTANCE, item.distance.unwrap_or_else(|| json!(0)))
        .with(keys::SOURCE, KIND.as_str())
        .with(keys::PLACE_ID, item.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_without_contacts_maps_to_empty_strings() {
        let item: Item = serde_json::from_value(json!({
            "id": "here:pds:place:1",
            "title": "Oak Dental",
            "address": { "label": "456 Oak Street, Troy, MI" },
            "position": { "lat": 42.5, "lng": -83.2 }
        }))
        .unwrap();
        let raw = item_to_raw(item, "Dentists");
        assert_eq!(raw.get_str(keys::PHONE), Some(""));
        assert_eq!(raw.get_str(keys::WEBSITE), Some(""));
        assert_eq!(raw.get(keys::REVIEWS), Some(&json!(0)));

        let business = bizdb_core::clean_record(&raw).unwrap();
        assert_eq!(business.review_count, 0);
        assert!(business.rating.abs() < f64::EPSILON);
        assert_eq!(business.source, "here");
        assert_eq!(business.address_type, bizdb_core::AddressType::Residential);
    }

    #[test]
    fn first_contact_values_are_used() {
        let item: Item = serde_json::from_value(json!({
            "title": "Acme",
            "contacts": [{
                "phone": [{ "value": "+12485550100" }, { "value": "+12485550199" }],
                "www": [{ "value": "https://acme.example" }]
            }],
            "categories": [{ "name": "Law Firm" }, { "name": "Notary" }]
        }))
        .unwrap();
        let raw = item_to_raw(item, "Lawyers");
        assert_eq!(raw.get_str(keys::PHONE), Some("+12485550100"));
        assert_eq!(raw.get_str(keys::WEBSITE), Some("https://acme.example"));
        assert_eq!(raw.get(keys::CATEGORIES), Some(&json!(["Law Firm", "Notary"])));
    }

    #[test]
    fn base_url_keeps_production_paths() {
        let endpoints = HereEndpoints::with_base_url("http://localhost:1234");
        assert_eq!(endpoints.discover, "http://localhost:1234/v1/discover");
        assert_eq!(endpoints.lookup, "http://localhost:1234/v1/lookup");
    }
}
