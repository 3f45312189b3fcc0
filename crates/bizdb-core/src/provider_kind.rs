use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of place-search providers the system can collect from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Here,
    Yelp,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Google, ProviderKind::Here, ProviderKind::Yelp];

    /// Identifier written to [`crate::Business::source`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Here => "here",
            ProviderKind::Yelp => "yelp",
        }
    }

    /// Environment variable holding this provider's credential.
    #[must_use]
    pub fn credential_var(self) -> &'static str {
        match self {
            ProviderKind::Google => "GOOGLE_API_KEY",
            ProviderKind::Here => "HERE_API_KEY",
            ProviderKind::Yelp => "YELP_API_KEY",
        }
    }

    /// Maximum number of results one search call returns.
    #[must_use]
    pub fn max_results(self) -> u32 {
        match self {
            ProviderKind::Google | ProviderKind::Here => 20,
            ProviderKind::Yelp => 50,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "here" => Ok(ProviderKind::Here),
            "yelp" => Ok(ProviderKind::Yelp),
            other => Err(format!(
                "unknown provider '{other}'; expected one of google, here, yelp"
            )),
        }
    }
}

/// Converts an operator-facing radius in miles to the meters providers expect.
#[must_use]
pub fn radius_meters_from_miles(miles: u32) -> u32 {
    miles.saturating_mul(1609)
}
