//! HTML scraping fallback for suppliers without a usable API.

mod cache;
mod render;
mod selectors;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use partsbin_core::{AppConfig, ExtractionResult};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::origin::extract_domain;
use crate::pacing::Pacer;
use crate::retry::retry_with_backoff;

use self::cache::{cache_key, ScrapeCache};
pub use self::render::{ChromeRenderer, PageAction, PageRenderer, RenderRequest, BROWSER_USER_AGENT};
pub use self::selectors::{selector_map, ScrapedValue, SelectorKind, SelectorMap, SelectorSpec};

const PAGE_NOT_FOUND: &str = "page not found";

/// `true` when a failed scrape was caused by an HTTP 404 rather than a
/// transport or server error.
#[must_use]
pub fn is_page_not_found(result: &ExtractionResult<ScrapedPage>) -> bool {
    !result.success
        && result
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with(PAGE_NOT_FOUND))
}

/// Result payload of one scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    /// Extracted values keyed by selector name; unmatched selectors are absent.
    pub fields: BTreeMap<String, ScrapedValue>,
    /// `true` when the DOM came from the headless renderer.
    pub rendered: bool,
}

impl ScrapedPage {
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(ScrapedValue::as_text)
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.fields.get(name).and_then(ScrapedValue::as_table)
    }
}

/// Options for [`WebScraper::scrape_rendered`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub wait_for_selector: Option<String>,
    pub actions: Vec<PageAction>,
    pub force_refresh: bool,
}

#[derive(Debug, Clone)]
pub struct WebScraperConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub cache_ttl: Duration,
    pub domain_delay: Duration,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl Default for WebScraperConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::defaults())
    }
}

impl WebScraperConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            cache_ttl: Duration::from_secs(config.scrape_cache_ttl_secs),
            domain_delay: Duration::from_millis(config.scrape_domain_delay_ms),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        }
    }
}

/// Static and rendered page scraping with a TTL cache and per-domain pacing.
///
/// Cheap to share behind an `Arc`; the cache and pacing state are internal.
pub struct WebScraper {
    client: Client,
    config: WebScraperConfig,
    cache: ScrapeCache<ScrapedPage>,
    pacer: Pacer,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl std::fmt::Debug for WebScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebScraper")
            .field("config", &self.config)
            .field("cached_pages", &self.cache.len())
            .field("has_renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl WebScraper {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: WebScraperConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            cache: ScrapeCache::new(config.cache_ttl),
            pacer: Pacer::new(),
            renderer: None,
            config,
        })
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Sleeps only the residual of `delay` since the last request to `domain`.
    pub async fn apply_rate_limit(&self, domain: &str, delay: Duration) {
        self.pacer.wait(domain, delay).await;
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Fetches `url` over plain HTTP and resolves each selector independently.
    ///
    /// Served from cache when a fresh entry exists unless `force_refresh`.
    /// Network failures become a failed result with a logged warning.
    pub async fn scrape_simple(
        &self,
        url: &str,
        selectors: &SelectorMap,
        force_refresh: bool,
    ) -> ExtractionResult<ScrapedPage> {
        let page_url = match page_url(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(url, error = %e, "refusing to scrape");
                return ExtractionResult::failed(e.to_string());
            }
        };
        let key = request_key("simple", url, selectors, None, &[]);
        if let Some(hit) = self.cached(&key, url, force_refresh) {
            return hit;
        }

        self.apply_rate_limit(&rate_limit_key(&page_url), self.config.domain_delay)
            .await;

        let html = match self.fetch_html(url).await {
            Ok(html) => html,
            Err(ScrapeError::NotFound { .. }) => {
                tracing::debug!(url, "page not found");
                return ExtractionResult::failed(format!("{PAGE_NOT_FOUND}: {url}"));
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "static scrape failed");
                return ExtractionResult::failed(format!("failed to fetch {url}: {e}"));
            }
        };

        let (fields, warnings) = selectors::extract_fields(&html, &page_url, selectors);
        let page = ScrapedPage {
            url: url.to_owned(),
            fields,
            rendered: false,
        };
        self.cache.insert(key, page.clone());
        ExtractionResult::ok(page).with_warnings(warnings)
    }

    /// Renders `url` in a headless browser, runs `options.actions`, then extracts.
    ///
    /// Falls back to [`Self::scrape_simple`] with a warning when no renderer
    /// is configured or the renderer fails.
    pub async fn scrape_rendered(
        &self,
        url: &str,
        selectors: &SelectorMap,
        options: &RenderOptions,
    ) -> ExtractionResult<ScrapedPage> {
        let page_url = match page_url(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(url, error = %e, "refusing to scrape");
                return ExtractionResult::failed(e.to_string());
            }
        };
        let key = request_key(
            "rendered",
            url,
            selectors,
            options.wait_for_selector.as_deref(),
            &options.actions,
        );
        if let Some(hit) = self.cached(&key, url, options.force_refresh) {
            return hit;
        }

        let Some(renderer) = &self.renderer else {
            tracing::warn!(url, "no page renderer available, falling back to static scrape");
            return self
                .scrape_simple(url, selectors, options.force_refresh)
                .await
                .with_warnings(vec!["rendering unavailable, used static HTML".to_owned()]);
        };

        self.apply_rate_limit(&rate_limit_key(&page_url), self.config.domain_delay)
            .await;

        let request = RenderRequest {
            url,
            user_agent: BROWSER_USER_AGENT,
            wait_for_selector: options.wait_for_selector.as_deref(),
            actions: &options.actions,
        };
        let html = match renderer.render(&request).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url, error = %e, "rendering failed, falling back to static scrape");
                return self
                    .scrape_simple(url, selectors, options.force_refresh)
                    .await
                    .with_warnings(vec![format!("rendering failed ({e}), used static HTML")]);
            }
        };

        let mut warnings = Vec::new();
        if let Some(wait_for) = request.wait_for_selector {
            if !selectors::has_match(&html, wait_for) {
                warnings.push(format!("wait selector '{wait_for}' never appeared"));
            }
        }
        let (fields, extract_warnings) = selectors::extract_fields(&html, &page_url, selectors);
        warnings.extend(extract_warnings);

        let page = ScrapedPage {
            url: url.to_owned(),
            fields,
            rendered: true,
        };
        self.cache.insert(key, page.clone());
        ExtractionResult::ok(page).with_warnings(warnings)
    }

    fn cached(&self, key: &str, url: &str, force_refresh: bool) -> Option<ExtractionResult<ScrapedPage>> {
        if force_refresh {
            return None;
        }
        let page = self.cache.get(key)?;
        tracing::debug!(url, "scrape cache hit");
        Some(ExtractionResult::ok(page))
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, move || async move {
            let response = self
                .client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ScrapeError::RateLimited {
                    domain: extract_domain(url),
                    retry_after_secs,
                });
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ScrapeError::NotFound { url: url.to_owned() });
            }
            if !status.is_success() {
                return Err(ScrapeError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }
            Ok(response.text().await?)
        })
        .await
    }
}

/// Only absolute `http(s)` URLs with a host are scraped.
fn page_url(url: &str) -> Result<Url, ScrapeError> {
    let invalid = |reason: String| ScrapeError::InvalidUrl {
        url: url.to_owned(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("no host".to_owned()));
    }
    Ok(parsed)
}

/// Pacing key: host plus explicit port, so local test servers stay distinct.
fn rate_limit_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    }
}

fn request_key(
    mode: &str,
    url: &str,
    selectors: &SelectorMap,
    wait_for_selector: Option<&str>,
    actions: &[PageAction],
) -> String {
    let selector_parts: Vec<String> = selectors
        .iter()
        .map(|(name, spec)| format!("{name}={}|{:?}", spec.css, spec.kind))
        .collect();
    let action_parts: Vec<String> = actions.iter().map(|a| format!("{a:?}")).collect();
    cache_key(
        [mode, url, wait_for_selector.unwrap_or_default()]
            .into_iter()
            .chain(selector_parts.iter().map(String::as_str))
            .chain(action_parts.iter().map(String::as_str)),
    )
}
