//! DigiKey: Product Information API v4 behind OAuth2 client credentials.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, FieldDefinition, FieldType, FileType,
    OrderInfo, PartSearchResult, SupplierCapability, SupplierConfig, SupplierInfo,
};
use partsbin_scraper::{DataExtractor, PricingKeys};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{connection_result, log_extraction_warnings};
use crate::contract::{validate_settings, OrderImport, PartDetails, PartSearch, SupplierAdapter};
use crate::error::SupplierError;
use crate::http::{HttpSettings, SupplierHttp};
use crate::import::{ColumnMapping, ImportField};

const NAME: &str = "digikey";
const DISPLAY_NAME: &str = "DigiKey";
const PRODUCTION_BASE_URL: &str = "https://api.digikey.com";
const SANDBOX_BASE_URL: &str = "https://sandbox-api.digikey.com";
const RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);
const MAX_RECORDS: usize = 50;
/// Tokens are refreshed this long before DigiKey says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Characters escaped in a part number used as one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

static ORDER_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{6,})").expect("valid order number regex"));

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Clone)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

pub struct DigiKeyAdapter {
    http: SupplierHttp,
    settings: HttpSettings,
    base_override: Option<String>,
    extractor: DataExtractor,
    credentials: Option<ClientCredentials>,
    config: SupplierConfig,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for DigiKeyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigiKeyAdapter")
            .field("http", &self.http)
            .field("configured", &self.credentials.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DigiKeyAdapter {
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] if the HTTP client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, SupplierError> {
        Self::build(settings, None)
    }

    /// Pins the API root regardless of `sandbox_mode` (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] for an invalid URL.
    pub fn with_base_url(settings: &HttpSettings, base_url: &str) -> Result<Self, SupplierError> {
        Self::build(settings, Some(base_url.to_owned()))
    }

    fn build(settings: &HttpSettings, base_override: Option<String>) -> Result<Self, SupplierError> {
        let base = base_override.as_deref().unwrap_or(PRODUCTION_BASE_URL);
        Ok(Self {
            http: SupplierHttp::new(NAME, base, settings, RATE_LIMIT_DELAY)?,
            settings: settings.clone(),
            base_override,
            extractor: DataExtractor::new(NAME),
            credentials: None,
            config: SupplierConfig::new(),
            token: Mutex::new(None),
        })
    }

    fn client_credentials(&self) -> Result<&ClientCredentials, SupplierError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| SupplierError::configuration(NAME, "client ID and secret are not configured"))
    }

    fn currency(&self) -> &str {
        self.config.str_or("locale_currency", "USD")
    }

    /// Cached bearer token, exchanging client credentials when absent or stale.
    async fn access_token(&self) -> Result<String, SupplierError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let credentials = self.client_credentials()?;
        let url = self.http.endpoint("v1/oauth2/token", &[]);
        let response = self
            .http
            .post_form(
                url,
                &[
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ],
            )
            .await
            .map_err(|e| match e {
                SupplierError::InvalidResponse { message, .. } => {
                    SupplierError::authentication(NAME, format!("token request rejected: {message}"))
                }
                other => other,
            })?
            .ok_or_else(|| SupplierError::configuration(NAME, "token endpoint not found"))?;

        let access_token = self
            .extractor
            .first_of::<String>(&response, &["access_token"])
            .ok_or_else(|| SupplierError::invalid_response(NAME, "token response has no access_token"))?;
        let expires_in = self.extractor.get_or(&response, "expires_in", 600u64);
        tracing::info!(supplier = NAME, expires_in, "obtained OAuth access token");

        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });
        Ok(access_token)
    }

    async fn api_headers(&self) -> Result<HeaderMap, SupplierError> {
        let token = self.access_token().await?;
        let credentials = self.client_credentials()?;
        let pairs = [
            (AUTHORIZATION, format!("Bearer {token}")),
            (HeaderName::from_static("x-digikey-client-id"), credentials.client_id.clone()),
            (
                HeaderName::from_static("x-digikey-locale-site"),
                self.config.str_or("locale_site", "US").to_owned(),
            ),
            (
                HeaderName::from_static("x-digikey-locale-language"),
                self.config.str_or("locale_language", "en").to_owned(),
            ),
            (HeaderName::from_static("x-digikey-locale-currency"), self.currency().to_owned()),
        ];

        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| SupplierError::configuration(NAME, format!("invalid header {name}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Drops the cached token after the API rejected it.
    async fn on_error(&self, err: SupplierError) -> SupplierError {
        if matches!(err, SupplierError::Authentication { .. }) {
            self.token.lock().await.take();
        }
        err
    }

    /// Maps one v4 `Product` object; `fallback_part_number` is used when no
    /// DigiKey number is present.
    pub(crate) fn parse_product(&self, product: &Value, fallback_part_number: Option<&str>) -> Option<PartSearchResult> {
        let ex = &self.extractor;
        let numbers = ex.extract_part_numbers(
            product,
            &["ProductVariations.0.DigiKeyProductNumber", "DigiKeyPartNumber"],
            &["ManufacturerProductNumber", "ManufacturerPartNumber"],
            Some(&["Manufacturer.Name", "Manufacturer.Value"]),
        );
        let mut warnings = numbers.warnings.clone();
        let numbers = numbers.value.unwrap_or_default();
        let supplier_part_number = numbers
            .supplier_part_number
            .or_else(|| fallback_part_number.map(str::to_owned))
            .or_else(|| numbers.manufacturer_part_number.clone())?;

        let mut part = PartSearchResult::new(&supplier_part_number);
        part.manufacturer = numbers.manufacturer;
        part.manufacturer_part_number = numbers.manufacturer_part_number;
        part.description = ex
            .extract_clean_text(
                product,
                &[
                    "Description.DetailedDescription",
                    "Description.ProductDescription",
                    "ProductDescription",
                ],
                Some(500),
                true,
            )
            .into_value();
        part.category = ex.first_of::<String>(product, &["Category.Name", "Category.Value"]);
        part.datasheet_url = ex
            .extract_datasheet_url(product, &["DatasheetUrl", "PrimaryDatasheet"], Some("https://www.digikey.com/"))
            .into_value()
            // Many manufacturer datasheet links are extensionless redirects.
            .or_else(|| {
                ex.extract_url(product, &["DatasheetUrl", "PrimaryDatasheet"], Some("https://www.digikey.com/"), None)
                    .into_value()
            });
        part.image_url = ex
            .extract_image_url(product, &["PhotoUrl", "PrimaryPhoto"], Some("https://www.digikey.com/"))
            .into_value();
        part.product_url = ex.extract_url(product, &["ProductUrl"], None, None).into_value();
        part.lifecycle_status = ex.first_of::<String>(product, &["ProductStatus.Status", "ProductStatus"]);

        let stock = ex.extract_stock_quantity(
            product,
            &["QuantityAvailable", "ProductVariations.0.QuantityAvailableforPackageType"],
            &["ProductStatus.Status"],
        );
        warnings.extend(stock.warnings.iter().cloned());
        part.stock_quantity = stock.into_value();

        let keys = PricingKeys {
            quantity: &["BreakQuantity"],
            price: &["UnitPrice"],
            currency: &[],
            default_currency: self.currency(),
        };
        let pricing = ex.extract_pricing(
            product,
            &["ProductVariations.0.StandardPricing", "StandardPricing"],
            &keys,
        );
        warnings.extend(pricing.warnings.iter().cloned());
        if let Some(breaks) = pricing.into_value() {
            part.set_pricing(breaks);
        }

        part.specifications = ex.extract_attribute_list(
            product,
            "Parameters",
            &["ParameterText", "Parameter"],
            &["ValueText", "Value"],
        );

        for (key, paths) in [
            ("packaging", &["ProductVariations.0.PackageType.Name", "Packaging.Value"][..]),
            ("series", &["Series.Name", "Series.Value"][..]),
            ("manufacturer_lead_weeks", &["ManufacturerLeadWeeks"][..]),
            ("minimum_order_quantity", &["ProductVariations.0.MinimumOrderQuantity", "MinimumOrderQuantity"][..]),
        ] {
            if let Some(value) = ex.first_of::<String>(product, paths) {
                part.additional_data.insert(key.to_owned(), Value::String(value));
            }
        }

        log_extraction_warnings(NAME, &supplier_part_number, &warnings);
        Some(part)
    }
}

#[async_trait]
impl SupplierAdapter for DigiKeyAdapter {
    fn info(&self) -> SupplierInfo {
        SupplierInfo {
            name: NAME.to_owned(),
            display_name: DISPLAY_NAME.to_owned(),
            description: "Global distributor with an OAuth2 product information API".to_owned(),
            website_url: "https://www.digikey.com".to_owned(),
            api_documentation_url: Some("https://developer.digikey.com/products".to_owned()),
            supports_oauth: true,
            rate_limit_info: Some("120 requests/minute, 1000 requests/day".to_owned()),
            supported_file_types: [FileType::Csv, FileType::Xlsx]
                .iter()
                .map(|t| t.extension().to_owned())
                .collect(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from([
            SupplierCapability::SearchParts,
            SupplierCapability::GetPartDetails,
            SupplierCapability::FetchDatasheet,
            SupplierCapability::FetchImage,
            SupplierCapability::FetchPricing,
            SupplierCapability::FetchStock,
            SupplierCapability::FetchSpecifications,
            SupplierCapability::ImportOrders,
            SupplierCapability::BulkSearch,
            SupplierCapability::ParametricSearch,
        ])
    }

    fn credential_schema(&self) -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("client_id", "Client ID", FieldType::Text)
                .required()
                .help_text("From your app on developer.digikey.com"),
            FieldDefinition::new("client_secret", "Client Secret", FieldType::Password).required(),
        ]
    }

    fn configuration_schema(&self) -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("sandbox_mode", "Use sandbox API", FieldType::Boolean)
                .default_value(false)
                .description("Send requests to sandbox-api.digikey.com"),
            FieldDefinition::new("locale_site", "Locale site", FieldType::Select)
                .options(&[("US", "United States"), ("CA", "Canada"), ("UK", "United Kingdom"), ("DE", "Germany")])
                .default_value("US"),
            FieldDefinition::new("locale_language", "Locale language", FieldType::Select)
                .options(&[("en", "English"), ("de", "German"), ("fr", "French")])
                .default_value("en"),
            FieldDefinition::new("locale_currency", "Currency", FieldType::Select)
                .options(&[("USD", "US Dollar"), ("CAD", "Canadian Dollar"), ("GBP", "Pound Sterling"), ("EUR", "Euro")])
                .default_value("USD"),
        ]
    }

    fn configure(&mut self, credentials: Credentials, config: SupplierConfig) -> Result<(), SupplierError> {
        let config = validate_settings(
            NAME,
            &self.credential_schema(),
            &self.configuration_schema(),
            &credentials,
            &config,
        )?;
        if self.base_override.is_none() {
            let base = if config.bool_or("sandbox_mode", false) {
                SANDBOX_BASE_URL
            } else {
                PRODUCTION_BASE_URL
            };
            if self.http.base_url().as_str().trim_end_matches('/') != base {
                self.http = SupplierHttp::new(NAME, base, &self.settings, RATE_LIMIT_DELAY)?;
            }
        }
        self.credentials = match (credentials.get("client_id"), credentials.get("client_secret")) {
            (Some(id), Some(secret)) => Some(ClientCredentials {
                client_id: id.to_owned(),
                client_secret: secret.to_owned(),
            }),
            _ => None,
        };
        self.config = config;
        *self.token.get_mut() = None;
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn authenticate(&self) -> Result<bool, SupplierError> {
        self.access_token().await?;
        Ok(true)
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        let outcome = self.authenticate().await.map(|_| {
            let environment = if self.config.bool_or("sandbox_mode", false) {
                "sandbox"
            } else {
                "production"
            };
            format!("DigiKey {environment} API authenticated")
        });
        connection_result(NAME, outcome).with_detail("base_url", self.http.base_url().as_str())
    }

    fn rate_limit_delay(&self) -> Duration {
        RATE_LIMIT_DELAY
    }

    fn search(&self) -> Option<&dyn PartSearch> {
        Some(self)
    }

    fn details(&self) -> Option<&dyn PartDetails> {
        Some(self)
    }

    fn order_import(&self) -> Option<&dyn OrderImport> {
        Some(self)
    }
}

#[async_trait]
impl PartSearch for DigiKeyAdapter {
    async fn search_parts(&self, query: &str, limit: usize) -> Result<Vec<PartSearchResult>, SupplierError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let headers = self.api_headers().await?;
        let body = json!({
            "Keywords": query,
            "Limit": limit.min(MAX_RECORDS),
            "Offset": 0
        });
        let url = self.http.endpoint("products/v4/search/keyword", &[]);
        let response = match self.http.post_json(url, &body, headers).await {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => return Err(self.on_error(e).await),
        };

        let mut parts: Vec<PartSearchResult> = ["ExactMatches", "Products"]
            .iter()
            .filter_map(|key| match self.extractor.safe_get(&response, key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .flatten()
            .filter_map(|p| self.parse_product(p, None))
            .collect();
        let mut seen = std::collections::BTreeSet::new();
        parts.retain(|p| seen.insert(p.supplier_part_number.clone()));
        parts.truncate(limit);
        tracing::debug!(supplier = NAME, query, results = parts.len(), "keyword search");
        Ok(parts)
    }
}

#[async_trait]
impl PartDetails for DigiKeyAdapter {
    async fn get_part_details(&self, part_number: &str) -> Result<Option<PartSearchResult>, SupplierError> {
        let part_number = part_number.trim();
        if part_number.is_empty() {
            return Ok(None);
        }
        let headers = self.api_headers().await?;
        let encoded = utf8_percent_encode(part_number, PATH_SEGMENT).to_string();
        let url = self
            .http
            .endpoint(&format!("products/v4/search/{encoded}/productdetails"), &[]);
        let response = match self.http.get_json(url, headers).await {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.on_error(e).await),
        };
        let Some(product) = self.extractor.safe_get(&response, "Product") else {
            return Ok(None);
        };
        Ok(self.parse_product(product, Some(part_number)))
    }
}

impl OrderImport for DigiKeyAdapter {
    fn supplier_display_name(&self) -> String {
        DISPLAY_NAME.to_owned()
    }

    fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::new()
            .field(ImportField::PartNumber, &["DigiKey Part #", "Digi-Key Part Number", "Part Number"])
            .field(ImportField::ManufacturerPartNumber, &["Manufacturer Part Number", "Mfr Part #"])
            .field(ImportField::Manufacturer, &["Manufacturer", "Manufacturer Name"])
            .field(ImportField::Description, &["Description", "Product Description"])
            .field(ImportField::CustomerReference, &["Customer Reference"])
            .field(ImportField::Quantity, &["Quantity", "Qty", "Quantity Shipped"])
            .field(ImportField::UnitPrice, &["Unit Price", "Unit Price USD"])
            .field(ImportField::ExtendedPrice, &["Extended Price", "Extended Price USD"])
    }

    fn supported_file_types(&self) -> Vec<FileType> {
        vec![FileType::Csv, FileType::Xlsx]
    }

    fn extract_order_info(&self, filename: &str) -> OrderInfo {
        OrderInfo {
            order_number: ORDER_NUMBER_RE.captures(filename).map(|c| c[1].to_owned()),
            order_date: None,
        }
    }
}
