use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

/// Process-wide settings read from `PARTSBIN_*` environment variables.
///
/// Holds no secrets; supplier credentials come from a credential provider.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub suppliers_path: PathBuf,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub scrape_cache_ttl_secs: u64,
    pub scrape_domain_delay_ms: u64,
    pub browser_path: Option<PathBuf>,
    pub browser_timeout_secs: u64,
}

impl AppConfig {
    /// Defaults used when no environment is available, e.g. in tests.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            env: Environment::Development,
            log_level: "info".to_string(),
            suppliers_path: PathBuf::from(crate::config::DEFAULT_SUPPLIERS_PATH),
            http_timeout_secs: 30,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            max_retries: 2,
            retry_backoff_base_secs: 1,
            scrape_cache_ttl_secs: 900,
            scrape_domain_delay_ms: 1000,
            browser_path: None,
            browser_timeout_secs: 30,
        }
    }
}
