//! Google Places (New) client: geocode, then `places:searchText` biased to
//! the geocoded point.

use bizdb_core::{keys, ProviderKind, RawRecord};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::http::{
    build_client, decode, endpoint_with_segment, endpoint_with_suffix, fetch_json, parse_endpoint,
    require_key, HttpSettings,
};

const KIND: ProviderKind = ProviderKind::Google;

const SEARCH_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.internationalPhoneNumber,places.rating,places.userRatingCount,places.websiteUri,\
places.location,places.types";

/// Google caps a location-bias circle at 50 km.
const MAX_BIAS_RADIUS_M: u32 = 50_000;

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub geocode: String,
    pub places: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            geocode: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            places: "https://places.googleapis.com/v1/places".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Both endpoints under one host, keeping the production paths.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            geocode: format!("{base}/maps/api/geocode/json"),
            places: format!("{base}/v1/places"),
        }
    }
}

#[derive(Clone)]
pub struct GoogleClient {
    client: Client,
    api_key: String,
    settings: HttpSettings,
    geocode_url: Url,
    places_url: Url,
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("geocode_url", &self.geocode_url.as_str())
            .field("places_url", &self.places_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Place {
    id: String,
    display_name: Option<LocalizedText>,
    formatted_address: String,
    international_phone_number: String,
    rating: Option<Value>,
    user_rating_count: Option<Value>,
    website_uri: String,
    location: Option<PlaceLocation>,
    types: Vec<String>,
    price_level: Option<String>,
    business_status: Option<String>,
    current_opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocalizedText {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlaceLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OpeningHours {
    weekday_descriptions: Vec<String>,
}

impl GoogleClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, ProviderError> {
        Self::with_endpoints(api_key, settings, GoogleEndpoints::default())
    }

    /// Points both endpoints at `base_url` (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// See [`GoogleClient::with_endpoints`].
    pub fn with_base_url(
        api_key: &str,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Self::with_endpoints(api_key, settings, GoogleEndpoints::with_base_url(base_url))
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key,
    /// [`ProviderError::InvalidBaseUrl`] for an unparseable endpoint, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn with_endpoints(
        api_key: &str,
        settings: &HttpSettings,
        endpoints: GoogleEndpoints,
    ) -> Result<Self, ProviderError> {
        let api_key = require_key(KIND, api_key)?;
        Ok(Self {
            client: build_client(settings)?,
            api_key,
            settings: settings.clone(),
            geocode_url: parse_endpoint(&endpoints.geocode)?,
            places_url: parse_endpoint(&endpoints.places)?,
        })
    }

    /// Resolves a free-text location to coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::GeocodeMiss`] when nothing matches, or any
    /// transport error.
    pub async fn geocode(&self, location: &str) -> Result<(f64, f64), ProviderError> {
        let body = fetch_json(&self.settings, KIND, "geocode", || {
            self.client
                .get(self.geocode_url.clone())
                .query(&[("address", location), ("key", self.api_key.as_str())])
        })
        .await?;
        let response: GeocodeResponse = decode(body, KIND, "geocode")?;

        if let Some(first) = response.results.first() {
            return Ok((first.geometry.location.lat, first.geometry.location.lng));
        }
        match response.status.as_str() {
            "" | "OK" | "ZERO_RESULTS" => Err(ProviderError::GeocodeMiss {
                provider: KIND,
                location: location.to_owned(),
            }),
            status => Err(ProviderError::UnexpectedStatus {
                provider: KIND,
                status: 200,
                body: format!(
                    "{status}: {}",
                    response.error_message.unwrap_or_default()
                ),
            }),
        }
    }

    /// Text search for `query` near `location`, at most 20 results.
    ///
    /// # Errors
    ///
    /// Returns geocoding or transport errors; see [`GoogleClient::geocode`].
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        radius_m: u32,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let (lat, lng) = self.geocode(location).await?;
        let url = endpoint_with_suffix(&self.places_url, ":searchText")?;
        let payload = json!({
            "textQuery": format!("{query} in {location}"),
            "locationBias": {
                "circle": {
                    "center": { "latitude": lat, "longitude": lng },
                    "radius": f64::from(radius_m.min(MAX_BIAS_RADIUS_M)),
                }
            },
            "maxResultCount": KIND.max_results(),
        });

        let body = fetch_json(&self.settings, KIND, "searchText", || {
            self.client
                .post(url.clone())
                .header("X-Goog-Api-Key", &self.api_key)
                .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
                .json(&payload)
        })
        .await?;
        let response: SearchTextResponse = decode(body, KIND, "searchText")?;

        tracing::debug!(
            provider = %KIND,
            query,
            location,
            count = response.places.len(),
            "google search complete"
        );
        Ok(response
            .places
            .into_iter()
            .map(|place| place_to_raw(place, query))
            .collect())
    }

    /// Full record for one place id; `None` when the id does not resolve.
    ///
    /// # Errors
    ///
    /// Returns transport or decoding errors other than a 404.
    pub async fn details(&self, place_id: &str) -> Result<Option<RawRecord>, ProviderError> {
        let url = endpoint_with_segment(&self.places_url, place_id)?;
        let result = fetch_json(&self.settings, KIND, "place details", || {
            self.client
                .get(url.clone())
                .header("X-Goog-Api-Key", &self.api_key)
                .header("X-Goog-FieldMask", "*")
        })
        .await;

        let body = match result {
            Ok(body) => body,
            Err(ProviderError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut place: Place = decode(body, KIND, "place details")?;

        let price_level = place.price_level.take().unwrap_or_default();
        let business_status = place.business_status.take().unwrap_or_default();
        let hours = place
            .current_opening_hours
            .take()
            .map(|h| h.weekday_descriptions)
            .unwrap_or_default();

        let mut raw = place_to_raw(place, "");
        raw.insert(keys::PRICE_LEVEL, price_level);
        raw.insert(keys::BUSINESS_STATUS, business_status);
        raw.insert(keys::HOURS, hours);
        Ok(Some(raw))
    }
}

fn place_to_raw(place: Place, query: &str) -> RawRecord {
    let (lat, lng) = place
        .location
        .map_or((0.0, 0.0), |l| (l.latitude, l.longitude));
    RawRecord::new()
        .with(
            keys::NAME,
            place.display_name.map(|n| n.text).unwrap_or_default(),
        )
        .with(keys::ADDRESS, place.formatted_address)
        .with(keys::PHONE, place.international_phone_number)
        .with(keys::RATING, place.rating.unwrap_or_else(|| json!(0.0)))
        .with(
            keys::REVIEW_COUNT,
            place.user_rating_count.unwrap_or_else(|| json!(0)),
        )
        .with(keys::WEBSITE, place.website_uri)
        .with(keys::BUSINESS_TYPE, query)
        .with(keys::LOCATION, json!({ "lat": lat, "lng": lng }))
        .with(keys::SOURCE, KIND.as_str())
        .with(keys::PLACE_ID, place.id)
        .with(keys::CATEGORIES, place.types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_fails_before_any_request() {
        let err = GoogleClient::new("", &HttpSettings::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn base_url_keeps_production_paths() {
        let endpoints = GoogleEndpoints::with_base_url("http://127.0.0.1:8080/");
        assert_eq!(
            endpoints.geocode,
            "http://127.0.0.1:8080/maps/api/geocode/json"
        );
        assert_eq!(endpoints.places, "http://127.0.0.1:8080/v1/places");
    }

    #[test]
    fn missing_place_fields_get_defaults() {
        let place: Place = serde_json::from_value(json!({ "id": "abc" })).unwrap();
        let raw = place_to_raw(place, "Lawyers");
        assert_eq!(raw.get_str(keys::NAME), Some(""));
        assert_eq!(raw.get(keys::RATING), Some(&json!(0.0)));
        assert_eq!(raw.get(keys::REVIEW_COUNT), Some(&json!(0)));
        assert_eq!(raw.get_str(keys::BUSINESS_TYPE), Some("Lawyers"));
        assert_eq!(raw.get_str(keys::SOURCE), Some("google"));
        assert_eq!(raw.get_str(keys::PLACE_ID), Some("abc"));
        assert_eq!(raw.get(keys::CATEGORIES), Some(&json!([])));
    }

    #[test]
    fn place_fields_are_mapped() {
        let place: Place = serde_json::from_value(json!({
            "id": "p1",
            "displayName": { "text": "Acme Legal" },
            "formattedAddress": "1 Main St Suite 200, Troy, MI",
            "internationalPhoneNumber": "+1 248-555-0100",
            "rating": 4.6,
            "userRatingCount": 31,
            "websiteUri": "https://acme.example",
            "location": { "latitude": 42.6, "longitude": -83.1 },
            "types": ["lawyer", "point_of_interest"]
        }))
        .unwrap();
        let raw = place_to_raw(place, "Lawyers");
        let business = bizdb_core::clean_record(&raw).unwrap();
        assert_eq!(business.name, "Acme Legal");
        assert!((business.rating - 4.6).abs() < f64::EPSILON);
        assert_eq!(business.review_count, 31);
        assert_eq!(business.categories, vec!["lawyer", "point_of_interest"]);
        assert_eq!(business.address_type, bizdb_core::AddressType::Commercial);
    }
}
