//! Per-adapter HTTP wrapper: pacing, retries and status mapping.

use std::time::Duration;

use partsbin_core::AppConfig;
use partsbin_scraper::{retry_with_backoff, Pacer};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;

use crate::error::SupplierError;

/// Longest error-body excerpt carried in an error message.
const BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::defaults())
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        }
    }

    /// Settings for tests against local mock servers: no retries, short timeout.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// HTTP client owned by one adapter.
///
/// Every request waits for the adapter's pacing slot first, transient
/// failures are retried with backoff, and statuses map onto
/// [`SupplierError`]: 401/403 authentication, 429 rate limit, 5xx and
/// transport failures connection, 404 `Ok(None)`.
pub struct SupplierHttp {
    supplier: String,
    client: Client,
    base_url: Url,
    delay: Duration,
    pacer: Pacer,
    settings: HttpSettings,
}

impl std::fmt::Debug for SupplierHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupplierHttp")
            .field("supplier", &self.supplier)
            .field("base_url", &self.base_url.as_str())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl SupplierHttp {
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] if `base_url` does not parse
    /// or the client cannot be constructed.
    pub fn new(
        supplier: &str,
        base_url: &str,
        settings: &HttpSettings,
        delay: Duration,
    ) -> Result<Self, SupplierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| SupplierError::configuration(supplier, format!("HTTP client: {e}")))?;

        // One trailing slash so relative joins append instead of replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            SupplierError::configuration(supplier, format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            supplier: supplier.to_owned(),
            client,
            base_url,
            delay,
            pacer: Pacer::new(),
            settings: settings.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// `path` relative to the base URL with percent-encoded query pairs.
    #[must_use]
    pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .unwrap_or_else(|_| self.base_url.clone());
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// # Errors
    ///
    /// See the type-level status mapping.
    pub async fn get_json(&self, url: Url, headers: HeaderMap) -> Result<Option<Value>, SupplierError> {
        tracing::debug!(supplier = %self.supplier, url = %url, "GET");
        self.execute(|| self.client.get(url.clone()).headers(headers.clone()))
            .await
    }

    /// # Errors
    ///
    /// See the type-level status mapping.
    pub async fn post_json(
        &self,
        url: Url,
        body: &Value,
        headers: HeaderMap,
    ) -> Result<Option<Value>, SupplierError> {
        tracing::debug!(supplier = %self.supplier, url = %url, "POST");
        self.execute(|| self.client.post(url.clone()).headers(headers.clone()).json(body))
            .await
    }

    /// Form-encoded POST, as used by OAuth token endpoints.
    ///
    /// # Errors
    ///
    /// See the type-level status mapping.
    pub async fn post_form(&self, url: Url, form: &[(&str, &str)]) -> Result<Option<Value>, SupplierError> {
        tracing::debug!(supplier = %self.supplier, url = %url, "POST form");
        self.execute(|| self.client.post(url.clone()).form(form)).await
    }

    async fn execute<F>(&self, build: F) -> Result<Option<Value>, SupplierError>
    where
        F: Fn() -> RequestBuilder,
    {
        let build = &build;
        retry_with_backoff(
            self.settings.max_retries,
            self.settings.backoff_base_secs,
            move || async move {
                self.pacer.wait(&self.supplier, self.delay).await;
                let response = build().send().await.map_err(|e| self.transport_error(&e))?;
                self.read_response(response).await
            },
        )
        .await
    }

    async fn read_response(&self, response: Response) -> Result<Option<Value>, SupplierError> {
        let status = response.status();
        let url = response.url().to_string();

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(supplier = %self.supplier, url, "resource not found");
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            tracing::warn!(supplier = %self.supplier, url, ?retry_after_secs, "rate limited");
            return Err(SupplierError::RateLimit {
                supplier: self.supplier.clone(),
                retry_after_secs,
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(&e))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SupplierError::authentication(
                &self.supplier,
                format!("HTTP {status}: {}", snippet(&body)),
            ));
        }
        if status.is_server_error() {
            return Err(SupplierError::connection(
                &self.supplier,
                format!("HTTP {status} from {url}"),
            ));
        }
        if !status.is_success() {
            return Err(SupplierError::invalid_response(
                &self.supplier,
                format!("HTTP {status}: {}", snippet(&body)),
            ));
        }

        if body.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_str(&body).map(Some).map_err(|e| {
            SupplierError::invalid_response(&self.supplier, format!("response from {url} is not JSON: {e}"))
        })
    }

    fn transport_error(&self, err: &reqwest::Error) -> SupplierError {
        let message = if err.is_timeout() {
            format!("request timed out after {}s", self.settings.timeout_secs)
        } else {
            err.to_string()
        };
        SupplierError::connection(&self.supplier, message)
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_owned(),
    }
}
