use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub(crate) const DEFAULT_SUPPLIERS_PATH: &str = "./config/suppliers.yaml";
pub(crate) const DEFAULT_USER_AGENT: &str = "partsbin/0.1 (inventory-enrichment)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("PARTSBIN_ENV", "development"))?;
    let log_level = or_default("PARTSBIN_LOG_LEVEL", "info");
    let suppliers_path = PathBuf::from(or_default("PARTSBIN_SUPPLIERS_PATH", DEFAULT_SUPPLIERS_PATH));
    let http_timeout_secs = positive_u64("PARTSBIN_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("PARTSBIN_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("PARTSBIN_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("PARTSBIN_RETRY_BACKOFF_BASE_SECS", "1")?;
    let scrape_cache_ttl_secs = parse_u64("PARTSBIN_SCRAPE_CACHE_TTL_SECS", "900")?;
    let scrape_domain_delay_ms = parse_u64("PARTSBIN_SCRAPE_DOMAIN_DELAY_MS", "1000")?;
    let browser_path = lookup("PARTSBIN_BROWSER_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let browser_timeout_secs = positive_u64("PARTSBIN_BROWSER_TIMEOUT_SECS", "30")?;

    Ok(AppConfig {
        env,
        log_level,
        suppliers_path,
        http_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        scrape_cache_ttl_secs,
        scrape_domain_delay_ms,
        browser_path,
        browser_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PARTSBIN_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
