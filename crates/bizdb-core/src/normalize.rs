//! Normalization from provider-shaped [`RawRecord`]s to canonical [`Business`]es.
//!
//! Each record is cleaned independently. A record whose rating or review
//! count cannot be coerced is skipped and logged; it never discards the batch.

use serde_json::Value;

use crate::business::{Business, GeoPoint};
use crate::classify::classify_address;
use crate::raw::{keys, RawRecord};

/// A single raw record that could not be cleaned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot clean field \"{field}\": {reason}")]
pub struct NormalizeError {
    pub field: &'static str,
    pub reason: String,
}

impl NormalizeError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Cleans a batch of raw records, skipping the ones that fail.
#[must_use]
pub fn clean(raw_records: &[RawRecord]) -> Vec<Business> {
    let mut cleaned = Vec::with_capacity(raw_records.len());
    for (index, raw) in raw_records.iter().enumerate() {
        match clean_record(raw) {
            Ok(business) => cleaned.push(business),
            Err(e) => {
                tracing::warn!(
                    index,
                    name = raw.get_str(keys::NAME).unwrap_or_default(),
                    error = %e,
                    "skipping record that failed cleaning"
                );
            }
        }
    }
    cleaned
}

/// Cleans one raw record.
///
/// Missing keys take their defaults: empty strings, `0.0` rating, `0`
/// reviews, unknown location, no categories.
///
/// # Errors
///
/// Returns [`NormalizeError`] when a present value has the wrong shape, e.g.
/// an unparseable or negative rating.
pub fn clean_record(raw: &RawRecord) -> Result<Business, NormalizeError> {
    let address = text(raw, keys::ADDRESS)?;
    let (address_type, _) = classify_address(&address);

    let review_value = raw
        .get(keys::REVIEW_COUNT)
        .filter(|v| !v.is_null())
        .or_else(|| raw.get(keys::REVIEWS));

    Ok(Business {
        name: text(raw, keys::NAME)?,
        address,
        address_type,
        phone: text(raw, keys::PHONE)?,
        rating: coerce_rating(raw.get(keys::RATING))?,
        review_count: coerce_review_count(review_value)?,
        website: text(raw, keys::WEBSITE)?,
        business_category: text(raw, keys::BUSINESS_TYPE)?,
        location: coerce_location(raw.get(keys::LOCATION)),
        source: text(raw, keys::SOURCE)?,
        external_id: text(raw, keys::PLACE_ID)?,
        categories: coerce_categories(raw.get(keys::CATEGORIES))?,
        created_at: None,
    })
}

fn text(raw: &RawRecord, field: &'static str) -> Result<String, NormalizeError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_owned()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(NormalizeError::new(
            field,
            format!("expected text, got {}", json_kind(other)),
        )),
    }
}

fn coerce_rating(value: Option<&Value>) -> Result<f64, NormalizeError> {
    let rating = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| NormalizeError::new(keys::RATING, format!("{n} is not a float")))?,
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|e| {
            NormalizeError::new(keys::RATING, format!("\"{s}\" is not a number: {e}"))
        })?,
        Some(other) => {
            return Err(NormalizeError::new(
                keys::RATING,
                format!("expected number, got {}", json_kind(other)),
            ))
        }
    };

    if !rating.is_finite() || rating < 0.0 {
        return Err(NormalizeError::new(
            keys::RATING,
            format!("{rating} is not a non-negative rating"),
        ));
    }
    Ok(rating)
}

fn coerce_review_count(value: Option<&Value>) -> Result<u32, NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_u64() {
                return u32::try_from(i).map_err(|_| {
                    NormalizeError::new(keys::REVIEW_COUNT, format!("{i} is out of range"))
                });
            }
            // Whole-number floats (e.g. `10.0` from a JSON encoder) are accepted.
            n.as_f64().and_then(whole_count).ok_or_else(|| {
                NormalizeError::new(
                    keys::REVIEW_COUNT,
                    format!("{n} is not a non-negative whole number"),
                )
            })
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s.trim().parse::<u32>().map_err(|e| {
            NormalizeError::new(keys::REVIEW_COUNT, format!("\"{s}\" is not a count: {e}"))
        }),
        Some(other) => Err(NormalizeError::new(
            keys::REVIEW_COUNT,
            format!("expected integer, got {}", json_kind(other)),
        )),
    }
}

#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn whole_count(f: f64) -> Option<u32> {
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
        Some(f as u32)
    } else {
        None
    }
}

/// Reads `{lat, lng}`; anything missing, malformed, or out of range becomes
/// the unknown sentinel rather than failing the record.
fn coerce_location(value: Option<&Value>) -> GeoPoint {
    let Some(Value::Object(obj)) = value else {
        return GeoPoint::UNKNOWN;
    };
    let component = |key: &str| -> Option<f64> {
        match obj.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };
    match (component("lat"), component("lng")) {
        (Some(lat), Some(lng)) => {
            let point = GeoPoint::new(lat, lng);
            if point.is_valid() {
                point
            } else {
                tracing::debug!(lat, lng, "out-of-range coordinates treated as unknown");
                GeoPoint::UNKNOWN
            }
        }
        _ => GeoPoint::UNKNOWN,
    }
}

fn coerce_categories(value: Option<&Value>) -> Result<Vec<String>, NormalizeError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect()),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect()),
        Some(other) => Err(NormalizeError::new(
            keys::CATEGORIES,
            format!("expected list, got {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
