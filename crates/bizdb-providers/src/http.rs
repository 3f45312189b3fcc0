//! Request plumbing shared by every provider client.

use std::time::Duration;

use bizdb_core::{AppConfig, ProviderKind};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::Value;

use crate::error::ProviderError;
use crate::retry::retry_with_backoff;

/// Non-2xx bodies are truncated to this many bytes before landing in an error.
const MAX_ERROR_BODY: usize = 512;

/// Transport settings common to all providers.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "bizdb/0.1 (business-listings)".to_string(),
            max_retries: 2,
            retry_backoff_base_ms: 500,
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.provider_request_timeout_secs,
            user_agent: config.provider_user_agent.clone(),
            max_retries: config.provider_max_retries,
            retry_backoff_base_ms: config.provider_retry_backoff_base_ms,
        }
    }
}

pub(crate) fn build_client(settings: &HttpSettings) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(&settings.user_agent)
        .build()?)
}

pub(crate) fn require_key(kind: ProviderKind, api_key: &str) -> Result<String, ProviderError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(ProviderError::MissingCredential {
            provider: kind,
            var: kind.credential_var(),
        });
    }
    Ok(key.to_owned())
}

/// Parses an endpoint URL, dropping any trailing slash so paths can be appended.
pub(crate) fn parse_endpoint(url: &str) -> Result<Url, ProviderError> {
    let trimmed = url.trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| ProviderError::InvalidBaseUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

/// `base` joined with extra path text, e.g. `/{id}` or `:searchText`.
pub(crate) fn endpoint_with_suffix(base: &Url, suffix: &str) -> Result<Url, ProviderError> {
    let joined = format!("{}{suffix}", base.as_str().trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| ProviderError::InvalidBaseUrl {
        url: joined,
        reason: e.to_string(),
    })
}

/// `base` with one percent-encoded path segment appended.
pub(crate) fn endpoint_with_segment(base: &Url, segment: &str) -> Result<Url, ProviderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidBaseUrl {
            url: base.to_string(),
            reason: "URL cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

/// Sends the request produced by `build`, retrying transient failures, and
/// parses the body as JSON.
///
/// `build` is called once per attempt because a sent request is consumed.
pub(crate) async fn fetch_json<F>(
    settings: &HttpSettings,
    provider: ProviderKind,
    context: &str,
    build: F,
) -> Result<Value, ProviderError>
where
    F: Fn() -> RequestBuilder,
{
    retry_with_backoff(settings.max_retries, settings.retry_backoff_base_ms, || {
        let request = build();
        async move { send_once(request, provider, context).await }
    })
    .await
}

async fn send_once(
    request: RequestBuilder,
    provider: ProviderKind,
    context: &str,
) -> Result<Value, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(ProviderError::RateLimited {
            provider,
            retry_after_secs,
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound {
            provider,
            context: context.to_owned(),
        });
    }

    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ProviderError::UnexpectedStatus {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
        context: format!("{provider} {context}"),
        source: e,
    })
}

/// Decodes a typed payload out of an already-parsed JSON body.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    body: Value,
    provider: ProviderKind,
    context: &str,
) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
        context: format!("{provider} {context}"),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_missing_credential() {
        let err = require_key(ProviderKind::Google, "  ").unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredential {
                provider: ProviderKind::Google,
                var: "GOOGLE_API_KEY"
            }
        ));
    }

    #[test]
    fn key_is_trimmed() {
        assert_eq!(require_key(ProviderKind::Yelp, " abc ").unwrap(), "abc");
    }

    #[test]
    fn endpoint_suffix_is_appended_without_double_slash() {
        let base = parse_endpoint("http://127.0.0.1:9000/v1/places/").unwrap();
        let url = endpoint_with_suffix(&base, ":searchText").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/v1/places:searchText");
    }

    #[test]
    fn path_segment_is_percent_encoded() {
        let base = parse_endpoint("https://api.yelp.com/v3/businesses").unwrap();
        let url = endpoint_with_segment(&base, "a b/c").unwrap();
        assert_eq!(url.as_str(), "https://api.yelp.com/v3/businesses/a%20b%2Fc");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(ProviderError::InvalidBaseUrl { .. })
        ));
    }
}
