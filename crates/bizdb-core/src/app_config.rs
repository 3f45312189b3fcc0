use std::net::SocketAddr;

use crate::plan::CollectionPlan;
use crate::provider_kind::ProviderKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Provider credentials, each optional until a provider is constructed.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub google_api_key: Option<String>,
    pub here_api_key: Option<String>,
    pub yelp_api_key: Option<String>,
}

impl ProviderCredentials {
    /// The non-blank credential for `kind`, if configured.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::Google => self.google_api_key.as_deref(),
            ProviderKind::Here => self.here_api_key.as_deref(),
            ProviderKind::Yelp => self.yelp_api_key.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "[redacted]");
        f.debug_struct("ProviderCredentials")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("here_api_key", &redact(&self.here_api_key))
            .field("yelp_api_key", &redact(&self.yelp_api_key))
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub credentials: ProviderCredentials,
    pub provider_request_timeout_secs: u64,
    pub provider_user_agent: String,
    pub provider_max_retries: u32,
    pub provider_retry_backoff_base_ms: u64,
    pub max_concurrent_categories: usize,
    pub scheduler_enabled: bool,
    pub collection_plan: CollectionPlan,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("credentials", &self.credentials)
            .field(
                "provider_request_timeout_secs",
                &self.provider_request_timeout_secs,
            )
            .field("provider_user_agent", &self.provider_user_agent)
            .field("provider_max_retries", &self.provider_max_retries)
            .field(
                "provider_retry_backoff_base_ms",
                &self.provider_retry_backoff_base_ms,
            )
            .field("max_concurrent_categories", &self.max_concurrent_categories)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("collection_plan", &self.collection_plan)
            .finish()
    }
}
