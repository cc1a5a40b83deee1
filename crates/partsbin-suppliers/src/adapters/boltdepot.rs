//! Bolt Depot: no public API, product pages are scraped.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, FieldDefinition, FieldType, PartSearchResult,
    PricingBreak, SupplierCapability, SupplierConfig, SupplierInfo,
};
use partsbin_scraper::{
    is_page_not_found, parse_number, PageRenderer, RenderOptions, ScrapedPage, SelectorMap,
    SelectorSpec, WebScraper, WebScraperConfig,
};
use reqwest::Url;

use super::{connection_result, log_extraction_warnings};
use crate::contract::{validate_settings, PartDetails, SupplierAdapter};
use crate::error::SupplierError;
use crate::http::HttpSettings;

const NAME: &str = "boltdepot";
const DISPLAY_NAME: &str = "Bolt Depot";
const DEFAULT_BASE_URL: &str = "https://www.boltdepot.com";
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);
const CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const CURRENCY: &str = "USD";

pub struct BoltDepotAdapter {
    scraper: WebScraper,
    base_url: Url,
    config: SupplierConfig,
}

impl std::fmt::Debug for BoltDepotAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltDepotAdapter")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BoltDepotAdapter {
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] if the scraper cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, SupplierError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] for an invalid URL.
    pub fn with_base_url(settings: &HttpSettings, base_url: &str) -> Result<Self, SupplierError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SupplierError::configuration(NAME, format!("invalid base URL '{base_url}': {e}")))?;
        let scraper = WebScraper::new(WebScraperConfig {
            timeout_secs: settings.timeout_secs,
            user_agent: settings.user_agent.clone(),
            cache_ttl: CACHE_TTL,
            domain_delay: RATE_LIMIT_DELAY,
            max_retries: settings.max_retries,
            backoff_base_secs: settings.backoff_base_secs,
        })
        .map_err(|e| SupplierError::configuration(NAME, e.to_string()))?;
        Ok(Self {
            scraper,
            base_url,
            config: SupplierConfig::new(),
        })
    }

    /// Enables `use_rendered_scraping` to go through a headless browser.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.scraper = self.scraper.with_renderer(renderer);
        self
    }

    fn product_url(&self, product_number: &str) -> Result<Url, SupplierError> {
        let mut url = self
            .base_url
            .join("Product-Details.aspx")
            .map_err(|e| SupplierError::configuration(NAME, e.to_string()))?;
        url.query_pairs_mut().append_pair("product", product_number);
        Ok(url)
    }

    fn selectors() -> SelectorMap {
        [
            ("description", SelectorSpec::text("h1")),
            ("properties", SelectorSpec::table("#product-property-list, table.product-properties")),
            ("pricing", SelectorSpec::table("#product-pricing, table.product-pricing")),
            ("image", SelectorSpec::infer("#product-image img, .product-image img")),
        ]
        .into_iter()
        .map(|(name, spec)| (name.to_owned(), spec))
        .collect()
    }

    async fn scrape(&self, url: &Url) -> partsbin_core::ExtractionResult<ScrapedPage> {
        let selectors = Self::selectors();
        if self.config.bool_or("use_rendered_scraping", false) {
            let options = RenderOptions {
                wait_for_selector: Some("h1".to_owned()),
                ..RenderOptions::default()
            };
            self.scraper.scrape_rendered(url.as_str(), &selectors, &options).await
        } else {
            self.scraper.scrape_simple(url.as_str(), &selectors, false).await
        }
    }

    fn part_from_page(product_number: &str, page: &ScrapedPage) -> PartSearchResult {
        let mut part = PartSearchResult::new(product_number);
        part.description = page.text("description").map(str::to_owned);
        part.image_url = page.text("image").map(str::to_owned);
        part.product_url = Some(page.url.clone());

        if let Some(properties) = page.table("properties") {
            part.category = properties.get("category").cloned();
            part.specifications = properties
                .iter()
                .filter(|(key, _)| key.as_str() != "category")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        if let Some(table) = page.table("pricing") {
            part.set_pricing(pricing_from_table(table));
        }
        part
    }
}

/// Reads quantity tiers like `1 - 99` / `1,000+` (normalized to `1-99` / `1000`)
/// against per-piece prices; rows without a leading quantity are ignored.
fn pricing_from_table(table: &BTreeMap<String, String>) -> Vec<PricingBreak> {
    table
        .iter()
        .filter_map(|(tier, price)| {
            let digits = tier.split(|c: char| !c.is_ascii_digit()).next()?;
            let quantity: i64 = digits.parse().ok()?;
            let price = parse_number(price)?;
            Some(PricingBreak::new(quantity, price, CURRENCY))
        })
        .collect()
}

#[async_trait]
impl SupplierAdapter for BoltDepotAdapter {
    fn info(&self) -> SupplierInfo {
        SupplierInfo {
            name: NAME.to_owned(),
            display_name: DISPLAY_NAME.to_owned(),
            description: "Fasteners and hardware, read from product pages".to_owned(),
            website_url: DEFAULT_BASE_URL.to_owned(),
            api_documentation_url: None,
            supports_oauth: false,
            rate_limit_info: Some("one page every 2 seconds".to_owned()),
            supported_file_types: Vec::new(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from([
            SupplierCapability::GetPartDetails,
            SupplierCapability::FetchImage,
            SupplierCapability::FetchPricing,
            SupplierCapability::FetchSpecifications,
        ])
    }

    fn configuration_schema(&self) -> Vec<FieldDefinition> {
        vec![FieldDefinition::new("use_rendered_scraping", "Render pages in a browser", FieldType::Boolean)
            .default_value(false)
            .help_text("Only needed if product pages stop rendering server-side")]
    }

    fn configure(&mut self, credentials: Credentials, config: SupplierConfig) -> Result<(), SupplierError> {
        self.config = validate_settings(
            NAME,
            &self.credential_schema(),
            &self.configuration_schema(),
            &credentials,
            &config,
        )?;
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        let selectors: SelectorMap = [("title".to_owned(), SelectorSpec::text("title"))].into_iter().collect();
        let result = self.scraper.scrape_simple(self.base_url.as_str(), &selectors, true).await;
        let outcome = if result.success {
            Ok(format!("{DISPLAY_NAME} website reachable"))
        } else {
            Err(SupplierError::connection(
                NAME,
                result.error.unwrap_or_else(|| "unknown scrape failure".to_owned()),
            ))
        };
        connection_result(NAME, outcome)
    }

    fn rate_limit_delay(&self) -> Duration {
        RATE_LIMIT_DELAY
    }

    fn details(&self) -> Option<&dyn PartDetails> {
        Some(self)
    }
}

#[async_trait]
impl PartDetails for BoltDepotAdapter {
    async fn get_part_details(&self, part_number: &str) -> Result<Option<PartSearchResult>, SupplierError> {
        let product_number = part_number.trim();
        if product_number.is_empty() || !product_number.chars().all(|c| c.is_ascii_digit()) {
            tracing::debug!(supplier = NAME, part_number, "not a Bolt Depot product number");
            return Ok(None);
        }

        let url = self.product_url(product_number)?;
        let result = self.scrape(&url).await;
        if is_page_not_found(&result) {
            return Ok(None);
        }
        if !result.success {
            let error = result.error.unwrap_or_else(|| "unknown scrape failure".to_owned());
            return Err(SupplierError::connection(NAME, error));
        }
        let warnings = result.warnings.clone();
        let Some(page) = result.into_value() else {
            return Ok(None);
        };
        // Unknown product numbers render the generic catalog page with no title.
        if page.text("description").is_none() {
            return Ok(None);
        }

        log_extraction_warnings(NAME, product_number, &warnings);
        Ok(Some(Self::part_from_page(product_number, &page)))
    }
}
