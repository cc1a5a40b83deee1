use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_accepts_known_names() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("TEST").unwrap(), Environment::Test);
    assert_eq!(parse_environment("prod").unwrap(), Environment::Production);
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "PARTSBIN_ENV"));
}

#[test]
fn build_app_config_uses_defaults_for_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.suppliers_path, PathBuf::from("./config/suppliers.yaml"));
    assert_eq!(cfg.http_timeout_secs, 30);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.retry_backoff_base_secs, 1);
    assert_eq!(cfg.scrape_cache_ttl_secs, 900);
    assert_eq!(cfg.scrape_domain_delay_ms, 1000);
    assert!(cfg.browser_path.is_none());
    assert_eq!(cfg.browser_timeout_secs, 30);
}

#[test]
fn defaults_match_empty_environment() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let defaults = AppConfig::defaults();
    assert_eq!(cfg.suppliers_path, defaults.suppliers_path);
    assert_eq!(cfg.scrape_cache_ttl_secs, defaults.scrape_cache_ttl_secs);
    assert_eq!(cfg.user_agent, defaults.user_agent);
}

#[test]
fn build_app_config_applies_overrides() {
    let mut map = HashMap::new();
    map.insert("PARTSBIN_ENV", "production");
    map.insert("PARTSBIN_LOG_LEVEL", "debug");
    map.insert("PARTSBIN_SUPPLIERS_PATH", "/etc/partsbin/suppliers.yaml");
    map.insert("PARTSBIN_HTTP_TIMEOUT_SECS", "10");
    map.insert("PARTSBIN_USER_AGENT", "custom-agent/2.0");
    map.insert("PARTSBIN_MAX_RETRIES", "5");
    map.insert("PARTSBIN_SCRAPE_CACHE_TTL_SECS", "60");
    map.insert("PARTSBIN_SCRAPE_DOMAIN_DELAY_MS", "250");
    map.insert("PARTSBIN_BROWSER_PATH", "/usr/bin/chromium");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(
        cfg.suppliers_path,
        PathBuf::from("/etc/partsbin/suppliers.yaml")
    );
    assert_eq!(cfg.http_timeout_secs, 10);
    assert_eq!(cfg.user_agent, "custom-agent/2.0");
    assert_eq!(cfg.max_retries, 5);
    assert_eq!(cfg.scrape_cache_ttl_secs, 60);
    assert_eq!(cfg.scrape_domain_delay_ms, 250);
    assert_eq!(cfg.browser_path, Some(PathBuf::from("/usr/bin/chromium")));
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let mut map = HashMap::new();
    map.insert("PARTSBIN_LOG_LEVEL", "  ");
    map.insert("PARTSBIN_BROWSER_PATH", "");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.browser_path.is_none());
}

#[test]
fn invalid_numeric_value_names_the_variable() {
    let mut map = HashMap::new();
    map.insert("PARTSBIN_MAX_RETRIES", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PARTSBIN_MAX_RETRIES"),
        "expected InvalidEnvVar(PARTSBIN_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn zero_http_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PARTSBIN_HTTP_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PARTSBIN_HTTP_TIMEOUT_SECS"),
        "expected InvalidEnvVar(PARTSBIN_HTTP_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn zero_cache_ttl_is_allowed() {
    let mut map = HashMap::new();
    map.insert("PARTSBIN_SCRAPE_CACHE_TTL_SECS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.scrape_cache_ttl_secs, 0);
}
