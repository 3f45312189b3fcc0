//! Lexical residential/commercial address classification.
//!
//! A heuristic, not ground truth: the address is lowercased and searched for
//! any of [`COMMERCIAL_INDICATORS`]. Unlisted commercial patterns come back as
//! residential, and a street named "Plaza Dr" comes back as commercial.

use crate::business::AddressType;

/// Substrings that mark an address as commercial. Extending this table
/// changes the policy without touching the algorithm.
pub const COMMERCIAL_INDICATORS: &[&str] = &[
    "suite",
    "ste",
    "unit",
    "floor",
    "fl",
    "#",
    "plaza",
    "mall",
    "building",
    "bldg",
    "office",
    "commercial",
    "industrial",
    "shopping center",
    "retail",
    "store",
    "shop",
];

/// Classify with the default indicator table.
///
/// Returns the classification and its presentation color.
#[must_use]
pub fn classify_address(address: &str) -> (AddressType, &'static str) {
    classify_address_with(address, COMMERCIAL_INDICATORS)
}

/// Classify against a caller-supplied indicator table.
///
/// Indicators are expected in lowercase.
#[must_use]
pub fn classify_address_with(address: &str, indicators: &[&str]) -> (AddressType, &'static str) {
    let lower = address.to_lowercase();
    let address_type = if indicators.iter().any(|token| lower.contains(token)) {
        AddressType::Commercial
    } else {
        AddressType::Residential
    };
    (address_type, address_type.color())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_address_is_commercial() {
        assert_eq!(
            classify_address("123 Main Plaza Suite 400"),
            (AddressType::Commercial, "#FFD700")
        );
    }

    #[test]
    fn plain_street_is_residential() {
        assert_eq!(
            classify_address("456 Oak Street"),
            (AddressType::Residential, "#90EE90")
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify_address("9 ELM BLDG").0, AddressType::Commercial);
        assert_eq!(classify_address("9 Elm Bldg").0, AddressType::Commercial);
    }

    #[test]
    fn every_indicator_alone_is_commercial() {
        for token in COMMERCIAL_INDICATORS {
            let address = format!("10 Pine {}", token.to_uppercase());
            assert_eq!(
                classify_address(&address).0,
                AddressType::Commercial,
                "indicator {token:?} should classify as commercial"
            );
        }
    }

    #[test]
    fn empty_address_is_residential() {
        assert_eq!(classify_address("").0, AddressType::Residential);
    }

    #[test]
    fn substring_matches_count() {
        // "ste" inside "Chester" trips the heuristic; accepted false positive.
        assert_eq!(
            classify_address("1 Chester Ave").0,
            AddressType::Commercial
        );
    }

    #[test]
    fn classification_is_pure() {
        let address = "77 Market St #12";
        assert_eq!(classify_address(address), classify_address(address));
    }

    #[test]
    fn custom_table_overrides_default() {
        assert_eq!(
            classify_address_with("456 Oak Street", &["oak"]).0,
            AddressType::Commercial
        );
        assert_eq!(
            classify_address_with("123 Main Suite 4", &[]).0,
            AddressType::Residential
        );
    }
}
