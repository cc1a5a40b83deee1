//! Mouser Electronics: Search API v1 with an API key, XLS order exports.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, FieldDefinition, FieldType, FileType,
    OrderInfo, PartSearchResult, SupplierCapability, SupplierConfig, SupplierInfo,
};
use partsbin_scraper::{DataExtractor, PricingKeys};
use regex::Regex;
use reqwest::header::HeaderMap;
use serde_json::{json, Map, Value};

use super::{connection_result, log_extraction_warnings};
use crate::contract::{validate_settings, OrderImport, PartDetails, PartSearch, SupplierAdapter};
use crate::error::SupplierError;
use crate::http::{HttpSettings, SupplierHttp};
use crate::import::{self, ColumnMapping, ImportField, MappedRow};

const NAME: &str = "mouser";
const DISPLAY_NAME: &str = "Mouser Electronics";
const DEFAULT_BASE_URL: &str = "https://api.mouser.com/api/v1";
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);
const MAX_RECORDS: usize = 50;

static ORDER_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{6,})").expect("valid order number regex"));

#[derive(Debug)]
pub struct MouserAdapter {
    http: SupplierHttp,
    extractor: DataExtractor,
    api_key: Option<String>,
    config: SupplierConfig,
}

impl MouserAdapter {
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] if the HTTP client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, SupplierError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] for an invalid URL.
    pub fn with_base_url(settings: &HttpSettings, base_url: &str) -> Result<Self, SupplierError> {
        Ok(Self {
            http: SupplierHttp::new(NAME, base_url, settings, RATE_LIMIT_DELAY)?,
            extractor: DataExtractor::new(NAME),
            api_key: None,
            config: SupplierConfig::new(),
        })
    }

    fn api_key(&self) -> Result<&str, SupplierError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SupplierError::configuration(NAME, "API key is not configured"))
    }

    fn search_option(&self) -> &str {
        match self.config.str_or("search_option", "None") {
            "None" => "",
            other => other,
        }
    }

    async fn call(&self, operation: &str, body: &Value) -> Result<Option<Value>, SupplierError> {
        let url = self.http.endpoint(operation, &[("apiKey", self.api_key()?)]);
        let Some(response) = self.http.post_json(url, body, HeaderMap::new()).await? else {
            return Ok(None);
        };
        check_api_errors(&response)?;
        Ok(Some(response))
    }

    fn parse_parts(&self, response: &Value) -> Vec<PartSearchResult> {
        match self.extractor.safe_get(response, "SearchResults.Parts") {
            Some(Value::Array(parts)) => parts.iter().filter_map(|p| self.parse_part(p)).collect(),
            _ => Vec::new(),
        }
    }

    /// Maps one entry of `SearchResults.Parts`.
    pub(crate) fn parse_part(&self, data: &Value) -> Option<PartSearchResult> {
        let ex = &self.extractor;
        let numbers = ex.extract_part_numbers(
            data,
            &["MouserPartNumber"],
            &["ManufacturerPartNumber"],
            Some(&["Manufacturer"]),
        );
        let mut warnings = numbers.warnings.clone();
        let numbers = numbers.into_value()?;
        // Mouser lists non-orderable manufacturer parts with this placeholder.
        let supplier_part_number = numbers
            .supplier_part_number
            .filter(|pn| !pn.eq_ignore_ascii_case("N/A"))?;

        let mut part = PartSearchResult::new(&supplier_part_number);
        part.manufacturer = numbers.manufacturer;
        part.manufacturer_part_number = numbers.manufacturer_part_number;
        part.description = ex.extract_clean_text(data, &["Description"], None, true).into_value();
        part.category = ex.first_of::<String>(data, &["Category"]);
        part.datasheet_url = ex
            .extract_datasheet_url(data, &["DataSheetUrl"], Some("https://www.mouser.com/"))
            .into_value();
        part.image_url = ex
            .extract_image_url(data, &["ImagePath"], Some("https://www.mouser.com/"))
            .into_value();
        part.product_url = ex.extract_url(data, &["ProductDetailUrl"], None, None).into_value();
        part.lifecycle_status = ex.first_of::<String>(data, &["LifecycleStatus"]);

        let stock = ex.extract_stock_quantity(
            data,
            &["AvailabilityInStock", "Availability"],
            &["LifecycleStatus"],
        );
        warnings.extend(stock.warnings.iter().cloned());
        part.stock_quantity = stock.into_value();

        let pricing = ex.extract_pricing(
            data,
            &["PriceBreaks"],
            &PricingKeys {
                quantity: &["Quantity"],
                price: &["Price"],
                currency: &["Currency"],
                default_currency: "USD",
            },
        );
        warnings.extend(pricing.warnings.iter().cloned());
        if let Some(breaks) = pricing.into_value() {
            part.set_pricing(breaks);
        }

        part.specifications =
            ex.extract_attribute_list(data, "ProductAttributes", &["AttributeName"], &["AttributeValue"]);

        for (key, path) in [
            ("rohs_status", "ROHSStatus"),
            ("lead_time", "LeadTime"),
            ("minimum_order_quantity", "Min"),
            ("order_multiple", "Mult"),
        ] {
            if let Some(value) = ex.first_of::<String>(data, &[path]) {
                part.additional_data.insert(key.to_owned(), Value::String(value));
            }
        }

        log_extraction_warnings(NAME, &supplier_part_number, &warnings);
        Some(part)
    }
}

/// Mouser reports bad keys and quota problems in an `Errors` array with HTTP 200.
fn check_api_errors(response: &Value) -> Result<(), SupplierError> {
    let Some(Value::Array(errors)) = response.get("Errors") else {
        return Ok(());
    };
    let Some(first) = errors.first() else {
        return Ok(());
    };
    let message = first
        .get("Message")
        .and_then(Value::as_str)
        .unwrap_or("unknown API error")
        .to_owned();
    let lower = message.to_ascii_lowercase();
    if lower.contains("unique identifier") || lower.contains("api key") || lower.contains("unauthorized") {
        return Err(SupplierError::authentication(NAME, message));
    }
    if lower.contains("too many") || lower.contains("exceeded") {
        return Err(SupplierError::RateLimit {
            supplier: NAME.to_owned(),
            retry_after_secs: None,
        });
    }
    Err(SupplierError::invalid_response(NAME, message))
}

#[async_trait]
impl SupplierAdapter for MouserAdapter {
    fn info(&self) -> SupplierInfo {
        SupplierInfo {
            name: NAME.to_owned(),
            display_name: DISPLAY_NAME.to_owned(),
            description: "Authorized distributor with a keyword and part-number search API".to_owned(),
            website_url: "https://www.mouser.com".to_owned(),
            api_documentation_url: Some("https://api.mouser.com/api/docs/ui/index".to_owned()),
            supports_oauth: false,
            rate_limit_info: Some("30 requests/minute, 1000 requests/day".to_owned()),
            supported_file_types: [FileType::Xls, FileType::Xlsx, FileType::Csv]
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
        vec![FieldDefinition::new("api_key", "Search API Key", FieldType::Password)
            .required()
            .description("Mouser Search API key")
            .help_text("Request one under My Mouser > APIs")]
    }

    fn configuration_schema(&self) -> Vec<FieldDefinition> {
        vec![FieldDefinition::new("search_option", "Search filter", FieldType::Select)
            .options(&[
                ("None", "No filter"),
                ("Rohs", "RoHS compliant only"),
                ("InStock", "In stock only"),
                ("RohsAndInStock", "RoHS compliant and in stock"),
            ])
            .default_value("None")]
    }

    fn configure(&mut self, credentials: Credentials, config: SupplierConfig) -> Result<(), SupplierError> {
        self.config = validate_settings(
            NAME,
            &self.credential_schema(),
            &self.configuration_schema(),
            &credentials,
            &config,
        )?;
        self.api_key = credentials.get("api_key").map(str::to_owned);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn authenticate(&self) -> Result<bool, SupplierError> {
        self.search_parts("resistor", 1).await?;
        Ok(true)
    }

    async fn test_connection(&self) -> ConnectionTestResult {
        let outcome = self
            .search_parts("resistor", 1)
            .await
            .map(|parts| format!("Mouser API reachable ({} result(s) for probe search)", parts.len()));
        connection_result(NAME, outcome)
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
impl PartSearch for MouserAdapter {
    async fn search_parts(&self, query: &str, limit: usize) -> Result<Vec<PartSearchResult>, SupplierError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let body = json!({
            "SearchByKeywordRequest": {
                "keyword": query,
                "records": limit.min(MAX_RECORDS),
                "startingRecord": 0,
                "searchOptions": self.search_option(),
                "searchWithYourSignUpLanguage": ""
            }
        });
        let Some(response) = self.call("search/keyword", &body).await? else {
            return Ok(Vec::new());
        };
        let mut parts = self.parse_parts(&response);
        parts.truncate(limit);
        tracing::debug!(supplier = NAME, query, results = parts.len(), "keyword search");
        Ok(parts)
    }
}

#[async_trait]
impl PartDetails for MouserAdapter {
    async fn get_part_details(&self, part_number: &str) -> Result<Option<PartSearchResult>, SupplierError> {
        let part_number = part_number.trim();
        if part_number.is_empty() {
            return Ok(None);
        }
        let body = json!({
            "SearchByPartRequest": {
                "mouserPartNumber": part_number,
                "partSearchOptions": "Exact"
            }
        });
        let Some(response) = self.call("search/partnumber", &body).await? else {
            return Ok(None);
        };
        let exact = self.parse_parts(&response).into_iter().find(|p| {
            p.supplier_part_number.eq_ignore_ascii_case(part_number)
                || p.manufacturer_part_number
                    .as_deref()
                    .is_some_and(|mpn| mpn.eq_ignore_ascii_case(part_number))
        });
        if exact.is_none() {
            tracing::debug!(supplier = NAME, part_number, "no exact match in part-number results");
        }
        Ok(exact)
    }
}

impl OrderImport for MouserAdapter {
    fn supplier_display_name(&self) -> String {
        DISPLAY_NAME.to_owned()
    }

    fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::new()
            .field(ImportField::PartNumber, &["Mouser #", "Mouser Part #", "Mouser No"])
            .field(ImportField::ManufacturerPartNumber, &["Mfr. #", "Mfr Part #", "Manufacturer Part Number"])
            .field(ImportField::Manufacturer, &["Manufacturer"])
            .field(ImportField::CustomerReference, &["Customer #", "Customer Part #"])
            .field(ImportField::Description, &["Description", "Desc."])
            .field(ImportField::Rohs, &["RoHS"])
            .field(ImportField::Quantity, &["Order Qty.", "Qty.", "Quantity"])
            .field(ImportField::UnitPrice, &["Price (USD)", "Unit Price"])
            .field(ImportField::ExtendedPrice, &["Ext.: (USD)", "Ext. (USD)", "Extended Price"])
    }

    fn supported_file_types(&self) -> Vec<FileType> {
        vec![FileType::Xls, FileType::Xlsx, FileType::Csv]
    }

    fn extract_order_info(&self, filename: &str) -> OrderInfo {
        OrderInfo {
            order_number: ORDER_NUMBER_RE
                .captures(filename)
                .map(|c| c[1].to_owned()),
            order_date: None,
        }
    }

    fn build_additional_properties(&self, row: &MappedRow, order: &OrderInfo) -> Map<String, Value> {
        let mut properties = import::standard_additional_properties(DISPLAY_NAME, row, order);
        if let Some(Value::Object(supplier_data)) = properties.get_mut("supplier_data") {
            supplier_data.insert(
                "product_url".to_owned(),
                Value::String(format!(
                    "https://www.mouser.com/ProductDetail/{}",
                    row.supplier_part_number()
                )),
            );
        }
        properties
    }
}
