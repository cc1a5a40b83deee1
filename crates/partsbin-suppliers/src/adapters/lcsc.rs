//! LCSC Electronics: public product-detail JSON, no credentials.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use partsbin_core::{
    CapabilitySet, ConnectionTestResult, Credentials, FieldDefinition, FieldType, FileType,
    OrderInfo, PartSearchResult, SupplierCapability, SupplierConfig, SupplierInfo,
};
use partsbin_scraper::{DataExtractor, PricingKeys};
use regex::Regex;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use super::{connection_result, log_extraction_warnings};
use crate::contract::{validate_settings, OrderImport, PartDetails, SupplierAdapter};
use crate::error::SupplierError;
use crate::http::{HttpSettings, SupplierHttp};
use crate::import::{self, ColumnMapping, ImportField, MappedRow};

const NAME: &str = "lcsc";
const DISPLAY_NAME: &str = "LCSC Electronics";
const DEFAULT_BASE_URL: &str = "https://wmsc.lcsc.com/ftps/wm";
const PRODUCT_PAGE_URL: &str = "https://www.lcsc.com/product-detail/";
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);
/// Stable catalog part used by the connection test.
const PROBE_PART: &str = "C25804";

static EXPORT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)LCSC_Exported__(\d{8})_(\d{6})").expect("valid LCSC export regex")
});

#[derive(Debug)]
pub struct LcscAdapter {
    http: SupplierHttp,
    extractor: DataExtractor,
    config: SupplierConfig,
}

impl LcscAdapter {
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] if the HTTP client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, SupplierError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// Points the adapter at another API root (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError::Configuration`] for an invalid URL.
    pub fn with_base_url(settings: &HttpSettings, base_url: &str) -> Result<Self, SupplierError> {
        Ok(Self {
            http: SupplierHttp::new(NAME, base_url, settings, RATE_LIMIT_DELAY)?,
            extractor: DataExtractor::new(NAME),
            config: SupplierConfig::new().with("currency", "USD"),
        })
    }

    fn currency(&self) -> &str {
        self.config.str_or("currency", "USD")
    }

    /// Maps one `result` object of the product-detail endpoint.
    pub(crate) fn parse_product(&self, product: &Value) -> Option<PartSearchResult> {
        let ex = &self.extractor;
        let numbers = ex.extract_part_numbers(
            product,
            &["productCode"],
            &["productModel"],
            Some(&["brandNameEn", "manufacturer.name"]),
        );
        let mut warnings = numbers.warnings.clone();
        let numbers = numbers.into_value()?;
        let supplier_part_number = numbers.supplier_part_number?;

        let mut part = PartSearchResult::new(&supplier_part_number);
        part.manufacturer = numbers.manufacturer;
        part.manufacturer_part_number = numbers.manufacturer_part_number;
        part.description = ex
            .extract_clean_text(product, &["productIntroEn", "productDescEn", "productNameEn"], Some(500), true)
            .into_value();
        part.category = ex
            .extract_clean_text(product, &["catalogName", "parentCatalogName"], None, false)
            .into_value();
        part.datasheet_url = ex
            .extract_datasheet_url(product, &["pdfUrl", "datasheetUrl"], Some("https://www.lcsc.com/"))
            .into_value();
        part.image_url = ex
            .extract_image_url(
                product,
                &["productImages.0", "productImageUrlBig", "productImageUrl"],
                Some("https://www.lcsc.com/"),
            )
            .into_value();

        let stock = ex.extract_stock_quantity(product, &["stockNumber", "stockCount"], &["productStatus"]);
        warnings.extend(stock.warnings.iter().cloned());
        part.stock_quantity = stock.into_value();

        let keys = PricingKeys {
            quantity: &["ladder", "startQty"],
            price: &["usdPrice", "productPrice", "currencyPrice"],
            currency: &[],
            default_currency: self.currency(),
        };
        let pricing = ex.extract_pricing(product, &["productPriceList", "priceList"], &keys);
        warnings.extend(pricing.warnings.iter().cloned());
        if let Some(breaks) = pricing.into_value() {
            part.set_pricing(breaks);
        }

        part.specifications = ex.extract_attribute_list(
            product,
            "paramVOList",
            &["paramNameEn", "paramName"],
            &["paramValueEn", "paramValue"],
        );
        if let Some(package) = ex.first_of::<String>(product, &["encapStandard"]) {
            part.specifications.entry("package".to_owned()).or_insert(package);
        }

        part.product_url = Some(format!("{PRODUCT_PAGE_URL}{supplier_part_number}.html"));
        part.lifecycle_status = ex.first_of::<String>(product, &["productStatus"]);
        if let Some(min) = ex.first_of::<u64>(product, &["minBuyNumber"]) {
            part.additional_data.insert("minimum_order_quantity".to_owned(), min.into());
        }
        if let Some(multiple) = ex.first_of::<u64>(product, &["productArrange.multiple", "minPacketNumber"]) {
            part.additional_data.insert("order_multiple".to_owned(), multiple.into());
        }

        log_extraction_warnings(NAME, &supplier_part_number, &warnings);
        Some(part)
    }
}

#[async_trait]
impl SupplierAdapter for LcscAdapter {
    fn info(&self) -> SupplierInfo {
        SupplierInfo {
            name: NAME.to_owned(),
            display_name: DISPLAY_NAME.to_owned(),
            description: "Electronic components distributor with a public product catalog API".to_owned(),
            website_url: "https://www.lcsc.com".to_owned(),
            api_documentation_url: None,
            supports_oauth: false,
            rate_limit_info: Some("about 1 request/second".to_owned()),
            supported_file_types: vec![FileType::Csv.extension().to_owned()],
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from([
            SupplierCapability::GetPartDetails,
            SupplierCapability::FetchDatasheet,
            SupplierCapability::FetchImage,
            SupplierCapability::FetchPricing,
            SupplierCapability::FetchStock,
            SupplierCapability::FetchSpecifications,
            SupplierCapability::ImportOrders,
        ])
    }

    fn configuration_schema(&self) -> Vec<FieldDefinition> {
        vec![FieldDefinition::new("currency", "Price currency", FieldType::Select)
            .options(&[("USD", "US Dollar"), ("EUR", "Euro"), ("CNY", "Chinese Yuan")])
            .default_value("USD")
            .help_text("Currency assumed for price breaks that do not state one")]
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
        let outcome = self.get_part_details(PROBE_PART).await.map(|found| match found {
            Some(_) => format!("LCSC catalog reachable ({PROBE_PART} found)"),
            None => "LCSC catalog reachable".to_owned(),
        });
        connection_result(NAME, outcome)
    }

    fn rate_limit_delay(&self) -> Duration {
        RATE_LIMIT_DELAY
    }

    fn details(&self) -> Option<&dyn PartDetails> {
        Some(self)
    }

    fn order_import(&self) -> Option<&dyn OrderImport> {
        Some(self)
    }
}

#[async_trait]
impl PartDetails for LcscAdapter {
    async fn get_part_details(&self, part_number: &str) -> Result<Option<PartSearchResult>, SupplierError> {
        let code = part_number.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Ok(None);
        }
        let url = self.http.endpoint("product/detail", &[("productCode", &code)]);
        let Some(body) = self.http.get_json(url, HeaderMap::new()).await? else {
            return Ok(None);
        };

        if let Some(status) = body.get("code").and_then(Value::as_i64) {
            if status != 200 {
                let message = self
                    .extractor
                    .first_of::<String>(&body, &["msg", "message"])
                    .unwrap_or_else(|| format!("API status {status}"));
                return Err(SupplierError::invalid_response(NAME, message));
            }
        }
        let Some(product) = self.extractor.safe_get(&body, "result") else {
            tracing::debug!(supplier = NAME, part_number = %code, "part not in catalog");
            return Ok(None);
        };
        if !product.is_object() {
            return Err(SupplierError::invalid_response(NAME, "product detail is not an object"));
        }
        Ok(self.parse_product(product))
    }
}

impl OrderImport for LcscAdapter {
    fn supplier_display_name(&self) -> String {
        DISPLAY_NAME.to_owned()
    }

    fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping::new()
            .field(ImportField::PartNumber, &["LCSC Part Number", "LCSC Part #", "LCSC#"])
            .field(
                ImportField::ManufacturerPartNumber,
                &["Manufacture Part Number", "Manufacturer Part Number", "MPN"],
            )
            .field(ImportField::Manufacturer, &["Manufacturer"])
            .field(ImportField::CustomerReference, &["Customer NO.", "Customer #"])
            .field(ImportField::Package, &["Package"])
            .field(ImportField::Description, &["Description"])
            .field(ImportField::Rohs, &["RoHS"])
            .field(ImportField::Quantity, &["Order Qty.", "Quantity"])
            .field(ImportField::UnitPrice, &["Unit Price($)", "Unit Price"])
            .field(ImportField::ExtendedPrice, &["Order Price($)", "Order Price", "Ext. Price"])
    }

    fn extract_order_info(&self, filename: &str) -> OrderInfo {
        let Some(captures) = EXPORT_NAME_RE.captures(filename) else {
            return OrderInfo::default();
        };
        OrderInfo {
            order_number: None,
            order_date: NaiveDate::parse_from_str(&captures[1], "%Y%m%d").ok(),
        }
    }

    fn build_additional_properties(&self, row: &MappedRow, order: &OrderInfo) -> Map<String, Value> {
        let mut properties = import::standard_additional_properties(DISPLAY_NAME, row, order);
        if let Some(Value::Object(supplier_data)) = properties.get_mut("supplier_data") {
            supplier_data.insert(
                "product_url".to_owned(),
                Value::String(format!("{PRODUCT_PAGE_URL}{}.html", row.supplier_part_number())),
            );
        }
        if let Some(min_mult) = row.extra("min-mult-order-qty") {
            if let Some(Value::Object(order_info)) = properties.get_mut("order_info") {
                order_info.insert("min_mult_order_qty".to_owned(), Value::String(min_mult.to_owned()));
            }
        }
        properties
    }
}

#[cfg(test)]
#[path = "lcsc_test.rs"]
mod tests;
