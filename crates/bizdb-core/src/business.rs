//! Canonical business listing types.
//!
//! A [`Business`] is the unit of storage and comparison. It is produced by the
//! normalizer from a provider-shaped [`crate::RawRecord`], optionally combined
//! by the merger, and appended to the store. It is never updated in place.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Residential/commercial classification derived from the address text.
///
/// Never supplied by a provider and never user-editable; see
/// [`crate::classify_address`] for the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    Residential,
    Commercial,
}

impl AddressType {
    /// Presentation color for map pins and table highlights.
    ///
    /// Computed on read rather than stored alongside the classification.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            AddressType::Commercial => "#FFD700",
            AddressType::Residential => "#90EE90",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AddressType::Residential => "Residential",
            AddressType::Commercial => "Commercial",
        }
    }
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Residential" => Ok(AddressType::Residential),
            "Commercial" => Ok(AddressType::Commercial),
            other => Err(format!("unknown address type '{other}'")),
        }
    }
}

/// WGS84 coordinates in degrees.
///
/// `(0, 0)` is the "unknown" sentinel throughout the pipeline, never a real
/// location on the equator/prime meridian.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const UNKNOWN: GeoPoint = GeoPoint { lat: 0.0, lng: 0.0 };

    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    // The sentinel is written, never computed, so exact comparison holds.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_unknown(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Returns `true` when both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One normalized, storage-ready business listing.
///
/// `rating` and `review_count` collapse "absent" into zero: there is no
/// representation of "rating unknown" distinct from "rating zero".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub name: String,
    pub address: String,
    pub address_type: AddressType,
    pub phone: String,
    pub rating: f64,
    pub review_count: u32,
    pub website: String,
    /// The search term that produced this record, not a provider field.
    pub business_category: String,
    pub location: GeoPoint,
    /// Provider identifier, e.g. `"here"` or `"yelp"`.
    pub source: String,
    /// Provider place id usable with a details lookup; empty when unknown.
    pub external_id: String,
    /// Provider category labels; empty when the provider exposes none.
    pub categories: Vec<String>,
    /// Assigned by the store at persistence time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Business {
    #[must_use]
    pub fn address_color(&self) -> &'static str {
        self.address_type.color()
    }
}
