use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment, ProviderCredentials};
use crate::plan::{load_collection_plan, CollectionPlan};
use crate::ConfigError;

/// Load application configuration, reading a `.env` file first if present.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the collection plan cannot be loaded.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the process environment only.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the collection plan cannot be loaded.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build configuration from an arbitrary variable lookup, e.g. a map in tests.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid or the collection plan cannot be loaded.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = or_default("DATABASE_URL", "sqlite://businesses.db?mode=rwc");
    let env = parse_environment(&or_default("BIZDB_ENV", "development"))?;

    let bind_addr = or_default("BIZDB_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BIZDB_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("BIZDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("BIZDB_DB_MAX_CONNECTIONS", "5")?;
    if db_max_connections == 0 {
        return Err(invalid(
            "BIZDB_DB_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("BIZDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let credentials = ProviderCredentials {
        google_api_key: optional("GOOGLE_API_KEY"),
        here_api_key: optional("HERE_API_KEY"),
        yelp_api_key: optional("YELP_API_KEY"),
    };

    let provider_request_timeout_secs = parse_u64("BIZDB_PROVIDER_REQUEST_TIMEOUT_SECS", "30")?;
    let provider_user_agent = or_default(
        "BIZDB_PROVIDER_USER_AGENT",
        "bizdb/0.1 (business-listings)",
    );
    let provider_max_retries = parse_u32("BIZDB_PROVIDER_MAX_RETRIES", "2")?;
    let provider_retry_backoff_base_ms = parse_u64("BIZDB_PROVIDER_RETRY_BACKOFF_BASE_MS", "500")?;

    let max_concurrent_categories = or_default("BIZDB_MAX_CONCURRENT_CATEGORIES", "1")
        .parse::<usize>()
        .map_err(|e| invalid("BIZDB_MAX_CONCURRENT_CATEGORIES", e.to_string()))?
        .max(1);

    let scheduler_enabled = parse_bool(&or_default("BIZDB_SCHEDULER_ENABLED", "true"))
        .ok_or_else(|| {
            invalid(
                "BIZDB_SCHEDULER_ENABLED",
                "expected true/false/1/0/yes/no".to_string(),
            )
        })?;

    let collection_plan = match optional("BIZDB_COLLECTION_PLAN_PATH") {
        Some(path) => load_collection_plan(&PathBuf::from(path))?,
        None => CollectionPlan::default(),
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_acquire_timeout_secs,
        credentials,
        provider_request_timeout_secs,
        provider_user_agent,
        provider_max_retries,
        provider_retry_backoff_base_ms,
        max_concurrent_categories,
        scheduler_enabled,
        collection_plan,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BIZDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
