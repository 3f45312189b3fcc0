//! Yelp Fusion client. Yelp geocodes the free-text location server-side, so a
//! search is a single request.

use bizdb_core::{keys, ProviderKind, RawRecord};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::http::{
    build_client, decode, endpoint_with_segment, endpoint_with_suffix, fetch_json, parse_endpoint,
    require_key, HttpSettings,
};

const KIND: ProviderKind = ProviderKind::Yelp;
const DEFAULT_BASE_URL: &str = "https://api.yelp.com/v3";

/// Yelp rejects a search radius above 40 km.
pub const MAX_RADIUS_M: u32 = 40_000;

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Clone)]
pub struct YelpClient {
    client: Client,
    api_key: String,
    settings: HttpSettings,
    base_url: Url,
}

impl std::fmt::Debug for YelpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YelpClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<YelpBusiness>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpBusiness {
    id: String,
    name: String,
    location: YelpLocation,
    phone: String,
    rating: Option<Value>,
    review_count: Option<Value>,
    url: String,
    coordinates: Option<Coordinates>,
    price: Option<String>,
    categories: Vec<YelpCategory>,
    hours: Vec<YelpHours>,
    is_closed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpLocation {
    display_address: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpCategory {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpHours {
    open: Vec<OpenSlot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenSlot {
    day: usize,
    start: String,
    end: String,
}

impl YelpClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, settings, DEFAULT_BASE_URL)
    }

    /// `base_url` is the API root, e.g. `https://api.yelp.com/v3`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key,
    /// [`ProviderError::InvalidBaseUrl`] for an unparseable root, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let api_key = require_key(KIND, api_key)?;
        Ok(Self {
            client: build_client(settings)?,
            api_key,
            settings: settings.clone(),
            base_url: parse_endpoint(base_url)?,
        })
    }

    /// Business search for `query` in `location`, at most 50 results.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::GeocodeMiss`] when Yelp cannot resolve the
    /// location, or any transport error.
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        radius_m: u32,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let url = endpoint_with_suffix(&self.base_url, "/businesses/search")?;
        let radius = radius_m.min(MAX_RADIUS_M).to_string();
        let limit = KIND.max_results().to_string();

        let result = fetch_json(&self.settings, KIND, "business search", || {
            self.client
                .get(url.clone())
                .bearer_auth(&self.api_key)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(&[
                    ("term", query),
                    ("location", location),
                    ("radius", radius.as_str()),
                    ("limit", limit.as_str()),
                ])
        })
        .await;

        let body = match result {
            Ok(body) => body,
            Err(ProviderError::UnexpectedStatus {
                status: 400, body, ..
            }) if body.contains("LOCATION_NOT_FOUND") => {
                return Err(ProviderError::GeocodeMiss {
                    provider: KIND,
                    location: location.to_owned(),
                });
            }
            Err(e) => return Err(e),
        };
        let response: SearchResponse = decode(body, KIND, "business search")?;

        tracing::debug!(
            provider = %KIND,
            query,
            location,
            count = response.businesses.len(),
            "yelp search complete"
        );
        Ok(response
            .businesses
            .into_iter()
            .map(|b| business_to_raw(b, query))
            .collect())
    }

    /// # Errors
    ///
    /// Returns transport or decoding errors other than a 404.
    pub async fn details(&self, business_id: &str) -> Result<Option<RawRecord>, ProviderError> {
        let businesses = endpoint_with_suffix(&self.base_url, "/businesses")?;
        let url = endpoint_with_segment(&businesses, business_id)?;
        let result = fetch_json(&self.settings, KIND, "business details", || {
            self.client
                .get(url.clone())
                .bearer_auth(&self.api_key)
                .header(reqwest::header::ACCEPT, "application/json")
        })
        .await;

        let body = match result {
            Ok(body) => body,
            Err(ProviderError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut business: YelpBusiness = decode(body, KIND, "business details")?;

        let status = match business.is_closed {
            Some(true) => "CLOSED",
            Some(false) => "OPERATIONAL",
            None => "",
        };
        let hours = format_hours(&std::mem::take(&mut business.hours));

        let mut raw = business_to_raw(business, "");
        raw.insert(keys::BUSINESS_STATUS, status);
        raw.insert(keys::HOURS, hours);
        Ok(Some(raw))
    }
}

fn format_hours(hours: &[YelpHours]) -> Vec<String> {
    hours
        .iter()
        .flat_map(|h| &h.open)
        .map(|slot| {
            let day = DAY_NAMES.get(slot.day).copied().unwrap_or("?");
            format!("{day} {}-{}", slot.start, slot.end)
        })
        .collect()
}

fn business_to_raw(business: YelpBusiness, query: &str) -> RawRecord {
    let coordinates = business.coordinates.unwrap_or_default();
    let categories: Vec<String> = business.categories.into_iter().map(|c| c.title).collect();

    RawRecord::new()
        .with(keys::NAME, business.name)
        .with(keys::ADDRESS, business.location.display_address.join(" "))
        .with(keys::PHONE, business.phone)
        .with(keys::RATING, business.rating.unwrap_or_else(|| json!(0.0)))
        .with(
            keys::REVIEW_COUNT,
            business.review_count.unwrap_or_else(|| json!(0)),
        )
        .with(keys::WEBSITE, business.url)
        .with(keys::PRICE, business.price.unwrap_or_default())
        .with(keys::BUSINESS_TYPE, query)
        .with(
            keys::LOCATION,
            json!({
                "lat": coordinates.latitude.unwrap_or(0.0),
                "lng": coordinates.longitude.unwrap_or(0.0),
            }),
        )
        .with(keys::CATEGORIES, categories)
        .with(keys::SOURCE, KIND.as_str())
        .with(keys::PLACE_ID, business.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_address_lines_are_joined() {
        let business: YelpBusiness = serde_json::from_value(json!({
            "id": "acme-troy",
            "name": "Acme Legal",
            "location": { "display_address": ["100 Big Beaver Rd", "Ste 300", "Troy, MI 48084"] },
            "rating": 4.5,
            "review_count": 12,
            "coordinates": { "latitude": 42.56, "longitude": -83.15 },
            "categories": [{ "alias": "lawyers", "title": "Lawyers" }],
            "price": "$$$"
        }))
        .unwrap();
        let raw = business_to_raw(business, "Lawyers");
        assert_eq!(raw.get_str(keys::PRICE), Some("$$$"));
        assert_eq!(
            raw.get_str(keys::ADDRESS),
            Some("100 Big Beaver Rd Ste 300 Troy, MI 48084")
        );
        let cleaned = bizdb_core::clean_record(&raw).unwrap();
        assert_eq!(cleaned.address_type, bizdb_core::AddressType::Commercial);
        assert_eq!(cleaned.review_count, 12);
        assert_eq!(cleaned.external_id, "acme-troy");
    }

    #[test]
    fn null_coordinates_become_unknown_location() {
        let business: YelpBusiness = serde_json::from_value(json!({
            "name": "Nowhere Inc",
            "coordinates": { "latitude": null, "longitude": null }
        }))
        .unwrap();
        let cleaned = bizdb_core::clean_record(&business_to_raw(business, "x")).unwrap();
        assert!(cleaned.location.is_unknown());
    }

    #[test]
    fn hours_are_formatted_per_slot() {
        let hours = vec![YelpHours {
            open: vec![
                OpenSlot {
                    day: 0,
                    start: "0900".to_owned(),
                    end: "1700".to_owned(),
                },
                OpenSlot {
                    day: 6,
                    start: "1000".to_owned(),
                    end: "1400".to_owned(),
                },
            ],
        }];
        assert_eq!(
            format_hours(&hours),
            vec!["Mon 0900-1700".to_owned(), "Sun 1000-1400".to_owned()]
        );
    }
}
