//! The closed set of place-search providers behind one capability.
//!
//! Callers hold a [`Provider`] and never branch on which service it wraps.
//! `try_*` methods return the typed failure so a collector can attribute it to
//! a category; `search` and `details` absorb recoverable failures at this
//! boundary, logging them and returning an empty result.

use bizdb_core::{AppConfig, ProviderKind, RawRecord};

use crate::error::ProviderError;
use crate::google::GoogleClient;
use crate::here::HereClient;
use crate::http::HttpSettings;
use crate::yelp::YelpClient;

#[derive(Debug, Clone)]
pub enum Provider {
    Google(GoogleClient),
    Here(HereClient),
    Yelp(YelpClient),
}

impl Provider {
    /// Builds the client for `kind` using the credential in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] when the key for `kind` is
    /// absent or blank. No request has been made at that point.
    pub fn from_config(kind: ProviderKind, config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .credentials
            .get(kind)
            .ok_or(ProviderError::MissingCredential {
                provider: kind,
                var: kind.credential_var(),
            })?;
        Self::new(kind, api_key, &HttpSettings::from_config(config))
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] for a blank key, or
    /// [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(
        kind: ProviderKind,
        api_key: &str,
        settings: &HttpSettings,
    ) -> Result<Self, ProviderError> {
        Ok(match kind {
            ProviderKind::Google => Provider::Google(GoogleClient::new(api_key, settings)?),
            ProviderKind::Here => Provider::Here(HereClient::new(api_key, settings)?),
            ProviderKind::Yelp => Provider::Yelp(YelpClient::new(api_key, settings)?),
        })
    }

    /// Builds every provider in `kinds`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first construction error, typically a missing credential.
    pub fn all_from_config(
        kinds: &[ProviderKind],
        config: &AppConfig,
    ) -> Result<Vec<Self>, ProviderError> {
        kinds
            .iter()
            .map(|kind| Self::from_config(*kind, config))
            .collect()
    }

    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Google(_) => ProviderKind::Google,
            Provider::Here(_) => ProviderKind::Here,
            Provider::Yelp(_) => ProviderKind::Yelp,
        }
    }

    /// # Errors
    ///
    /// Returns the provider's network, HTTP, decoding, or geocoding failure.
    pub async fn try_search(
        &self,
        query: &str,
        location: &str,
        radius_m: u32,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        match self {
            Provider::Google(c) => c.search(query, location, radius_m).await,
            Provider::Here(c) => c.search(query, location, radius_m).await,
            Provider::Yelp(c) => c.search(query, location, radius_m).await,
        }
    }

    /// Like [`Provider::try_search`], but a failure yields no records.
    pub async fn search(&self, query: &str, location: &str, radius_m: u32) -> Vec<RawRecord> {
        match self.try_search(query, location, radius_m).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    provider = %self.kind(),
                    query,
                    location,
                    error = %e,
                    "provider search failed, returning no results"
                );
                Vec::new()
            }
        }
    }

    /// # Errors
    ///
    /// Returns network, HTTP, or decoding failures. An id that does not
    /// resolve is `Ok(None)`.
    pub async fn try_details(&self, id: &str) -> Result<Option<RawRecord>, ProviderError> {
        match self {
            Provider::Google(c) => c.details(id).await,
            Provider::Here(c) => c.details(id).await,
            Provider::Yelp(c) => c.details(id).await,
        }
    }

    pub async fn details(&self, id: &str) -> Option<RawRecord> {
        match self.try_details(id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    provider = %self.kind(),
                    id,
                    error = %e,
                    "provider details lookup failed"
                );
                None
            }
        }
    }
}

impl From<GoogleClient> for Provider {
    fn from(client: GoogleClient) -> Self {
        Provider::Google(client)
    }
}

impl From<HereClient> for Provider {
    fn from(client: HereClient) -> Self {
        Provider::Here(client)
    }
}

impl From<YelpClient> for Provider {
    fn from(client: YelpClient) -> Self {
        Provider::Yelp(client)
    }
}
