use bizdb_core::ProviderKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider's credential is absent or blank. Raised at construction,
    /// before any network call.
    #[error("missing credential for {provider}: set {var}")]
    MissingCredential {
        provider: ProviderKind,
        var: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {provider} (retry after {retry_after_secs}s)")]
    RateLimited {
        provider: ProviderKind,
        retry_after_secs: u64,
    },

    #[error("{provider} resource not found: {context}")]
    NotFound {
        provider: ProviderKind,
        context: String,
    },

    #[error("unexpected HTTP status {status} from {provider}: {body}")]
    UnexpectedStatus {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} could not geocode location \"{location}\"")]
    GeocodeMiss {
        provider: ProviderKind,
        location: String,
    },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ProviderError {
    /// Configuration errors abort before any side effect; everything else is a
    /// recoverable per-call failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingCredential { .. } | ProviderError::InvalidBaseUrl { .. }
        )
    }
}
