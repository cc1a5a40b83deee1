//! Adapter round trips against local `wiremock` servers.

use partsbin_core::{Credentials, SupplierCapability, SupplierConfig};
use partsbin_suppliers::{
    BoltDepotAdapter, DigiKeyAdapter, EnrichmentOutcome, GatedSupplier, HttpSettings, LcscAdapter, MouserAdapter,
    PartDetails, PartSearch, SupplierAdapter, SupplierError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> HttpSettings {
    HttpSettings::no_retries()
}

// ---------------------------------------------------------------- LCSC

fn lcsc_product() -> serde_json::Value {
    json!({
        "code": 200,
        "msg": null,
        "result": {
            "productCode": "C25804",
            "productModel": "0603WAF1002T5E",
            "brandNameEn": "UNI-ROYAL(Uniroyal Elec)",
            "productIntroEn": "10k&Omega; &plusmn;1% 100mW 0603 Thick Film Resistor",
            "catalogName": "Chip Resistor - Surface Mount",
            "pdfUrl": "https://datasheet.lcsc.com/lcsc/C25804.pdf",
            "productImages": ["https://assets.lcsc.com/images/lcsc/900x900/C25804_front.jpg"],
            "stockNumber": 21_539_400,
            "productPriceList": [
                {"ladder": 1000, "usdPrice": 0.0009},
                {"ladder": 100, "usdPrice": 0.0012}
            ],
            "paramVOList": [{"paramNameEn": "Resistance", "paramValueEn": "10k\u{3a9}"}]
        }
    })
}

#[tokio::test]
async fn lcsc_details_map_product_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/detail"))
        .and(query_param("productCode", "C25804"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lcsc_product()))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = LcscAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    let part = adapter.get_part_details("c25804").await.unwrap().unwrap();

    assert_eq!(part.supplier_part_number, "C25804");
    assert_eq!(part.stock_quantity, Some(21_539_400));
    let pricing = part.pricing().unwrap();
    assert_eq!(pricing[0].quantity, 100);
    assert_eq!(pricing[1].quantity, 1000);
    assert_eq!(part.specifications["resistance"], "10k\u{3a9}");
}

#[tokio::test]
async fn lcsc_null_result_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "result": null})))
        .mount(&server)
        .await;

    let adapter = LcscAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    assert!(adapter.get_part_details("C0").await.unwrap().is_none());
}

#[tokio::test]
async fn lcsc_status_mapping() {
    for (status, expected) in [(404, None), (429, Some("rate_limit")), (500, Some("connection")), (403, Some("authentication"))] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/detail"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let adapter = LcscAdapter::with_base_url(&settings(), &server.uri()).unwrap();
        let outcome = adapter.get_part_details("C25804").await;
        match expected {
            None => assert_eq!(outcome.unwrap(), None, "status {status}"),
            Some(kind) => assert_eq!(outcome.unwrap_err().kind(), kind, "status {status}"),
        }
    }
}

#[tokio::test]
async fn lcsc_connection_test_reports_failure_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = LcscAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    let result = adapter.test_connection().await;

    assert!(!result.success);
    assert_eq!(result.details["supplier"], "lcsc");
    assert_eq!(result.details["error_kind"], "connection");
    assert_eq!(result.details["retryable"], true);
}

#[tokio::test]
async fn gated_enrichment_runs_against_lcsc() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lcsc_product()))
        .mount(&server)
        .await;

    let adapter = LcscAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    let gated = GatedSupplier::new(Box::new(adapter));
    let report = gated
        .enrich(
            "C25804",
            &[SupplierCapability::FetchDatasheet, SupplierCapability::SearchParts],
            |_| {},
        )
        .await;

    assert!(matches!(
        report.outcome(SupplierCapability::FetchDatasheet),
        Some(EnrichmentOutcome::Found { .. })
    ));
    assert_eq!(
        report.outcome(SupplierCapability::SearchParts),
        Some(&EnrichmentOutcome::Unsupported)
    );
}

// ---------------------------------------------------------------- Mouser

fn mouser(server: &MockServer) -> MouserAdapter {
    let mut adapter = MouserAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    adapter
        .configure(Credentials::new().with("api_key", "test-key"), SupplierConfig::new())
        .unwrap();
    adapter
}

#[tokio::test]
async fn mouser_keyword_search_posts_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search/keyword"))
        .and(query_param("apiKey", "test-key"))
        .and(body_partial_json(json!({"SearchByKeywordRequest": {"keyword": "NE555", "records": 5}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Errors": [],
            "SearchResults": {
                "NumberOfResult": 2,
                "Parts": [
                    {
                        "MouserPartNumber": "595-NE555P",
                        "ManufacturerPartNumber": "NE555P",
                        "Manufacturer": "Texas Instruments",
                        "Description": "Precision Timers Single",
                        "DataSheetUrl": "https://www.mouser.com/datasheet/2/405/ne555-1.pdf",
                        "AvailabilityInStock": "5,210",
                        "PriceBreaks": [
                            {"Quantity": 10, "Price": "$0.392", "Currency": "USD"},
                            {"Quantity": 1, "Price": "$0.55", "Currency": "USD"}
                        ]
                    },
                    {"MouserPartNumber": "N/A", "ManufacturerPartNumber": "NE555X"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let parts = mouser(&server).search_parts("NE555", 5).await.unwrap();

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].supplier_part_number, "595-NE555P");
    assert_eq!(parts[0].stock_quantity, Some(5210));
    assert!((parts[0].pricing().unwrap()[0].price - 0.55).abs() < 1e-9);
}

#[tokio::test]
async fn mouser_api_errors_become_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search/partnumber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Errors": [{"Id": 0, "Code": "Invalid", "Message": "Invalid unique identifier.", "PropertyName": "API Key"}],
            "SearchResults": null
        })))
        .mount(&server)
        .await;

    let err = mouser(&server).get_part_details("595-NE555P").await.unwrap_err();
    assert!(matches!(err, SupplierError::Authentication { .. }), "{err:?}");
    assert!(err.is_unusable());
}

#[tokio::test]
async fn mouser_details_ignore_parts_that_do_not_match_exactly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search/partnumber"))
        .and(body_partial_json(json!({"SearchByPartRequest": {"mouserPartNumber": "595-NE555P"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Errors": [],
            "SearchResults": {
                "NumberOfResult": 1,
                "Parts": [{
                    "MouserPartNumber": "595-NE556N",
                    "ManufacturerPartNumber": "NE556N",
                    "Manufacturer": "Texas Instruments",
                    "Description": "Dual Precision Timers"
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let part = mouser(&server).get_part_details("595-NE555P").await.unwrap();
    assert!(part.is_none(), "{part:?}");
}

#[tokio::test]
async fn mouser_details_match_manufacturer_part_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search/partnumber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Errors": [],
            "SearchResults": {
                "NumberOfResult": 2,
                "Parts": [
                    {"MouserPartNumber": "595-NE555PWR", "ManufacturerPartNumber": "NE555PWR", "Description": "Timer TSSOP"},
                    {"MouserPartNumber": "595-NE555P", "ManufacturerPartNumber": "NE555P", "Description": "Timer PDIP"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let part = mouser(&server).get_part_details("ne555p").await.unwrap().unwrap();
    assert_eq!(part.supplier_part_number, "595-NE555P");
}

#[tokio::test]
async fn mouser_http_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = mouser(&server).search_parts("NE555", 5).await.unwrap_err();
    assert!(matches!(
        err,
        SupplierError::RateLimit {
            retry_after_secs: Some(30),
            ..
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn mouser_without_api_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = MouserAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    let err = adapter.search_parts("NE555", 5).await.unwrap_err();
    assert_eq!(err.kind(), "configuration");
}

// ---------------------------------------------------------------- DigiKey

fn digikey(server: &MockServer) -> DigiKeyAdapter {
    let mut adapter = DigiKeyAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    adapter
        .configure(
            Credentials::new()
                .with("client_id", "client-abc")
                .with("client_secret", "s3cret"),
            SupplierConfig::new(),
        )
        .unwrap();
    adapter
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 599,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn digikey_product() -> serde_json::Value {
    json!({
        "Product": {
            "ManufacturerProductNumber": "NE555P",
            "Manufacturer": {"Name": "Texas Instruments"},
            "Description": {"ProductDescription": "IC OSC SINGLE TIMER 100KHZ 8-DIP"},
            "QuantityAvailable": 83_120,
            "ProductVariations": [{
                "DigiKeyProductNumber": "296-1411-5-ND",
                "StandardPricing": [{"BreakQuantity": 1, "UnitPrice": 0.48}]
            }]
        }
    })
}

#[tokio::test]
async fn digikey_token_is_exchanged_once_and_reused() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/products/v4/search/296-1411-5-ND/productdetails"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("x-digikey-client-id", "client-abc"))
        .and(header("x-digikey-locale-currency", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(digikey_product()))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = digikey(&server);
    let first = adapter.get_part_details("296-1411-5-ND").await.unwrap().unwrap();
    let second = adapter.get_part_details("296-1411-5-ND").await.unwrap().unwrap();

    assert_eq!(first.supplier_part_number, "296-1411-5-ND");
    assert_eq!(first.manufacturer_part_number.as_deref(), Some("NE555P"));
    assert_eq!(second.stock_quantity, Some(83_120));
}

#[tokio::test]
async fn digikey_rejected_credentials_are_authentication_errors() {
    for status in [400, 401] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"error": "invalid_client"})))
            .mount(&server)
            .await;

        let adapter = digikey(&server);
        let err = adapter.authenticate().await.unwrap_err();
        assert!(matches!(err, SupplierError::Authentication { .. }), "status {status}: {err:?}");

        let result = adapter.test_connection().await;
        assert!(!result.success);
        assert_eq!(result.details["error_kind"], "authentication");
    }
}

#[tokio::test]
async fn digikey_expired_token_is_dropped_and_refetched() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/products/v4/search/296-1411-5-ND/productdetails"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/v4/search/296-1411-5-ND/productdetails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(digikey_product()))
        .mount(&server)
        .await;

    let adapter = digikey(&server);
    let err = adapter.get_part_details("296-1411-5-ND").await.unwrap_err();
    assert_eq!(err.kind(), "authentication");
    assert!(adapter.get_part_details("296-1411-5-ND").await.unwrap().is_some());
}

#[tokio::test]
async fn digikey_unknown_part_is_not_found() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/products/v4/search/NOPE/productdetails"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(digikey(&server).get_part_details("NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn digikey_keyword_search_merges_exact_matches() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    let product = digikey_product()["Product"].clone();
    Mock::given(method("POST"))
        .and(path("/products/v4/search/keyword"))
        .and(body_partial_json(json!({"Keywords": "NE555P", "Limit": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ExactMatches": [product.clone()],
            "Products": [product, {
                "ManufacturerProductNumber": "NE555DR",
                "ProductVariations": [{"DigiKeyProductNumber": "296-1412-1-ND"}]
            }]
        })))
        .mount(&server)
        .await;

    let parts = digikey(&server).search_parts("NE555P", 10).await.unwrap();
    let numbers: Vec<&str> = parts.iter().map(|p| p.supplier_part_number.as_str()).collect();
    assert_eq!(numbers, vec!["296-1411-5-ND", "296-1412-1-ND"]);
}

// ---------------------------------------------------------------- Bolt Depot

const BOLT_PAGE: &str = r#"<html><head><title>Bolt Depot</title></head><body>
  <h1>Hex cap screw, Stainless steel 18-8, 1/4"-20 x 1"</h1>
  <div id="product-image"><img src="/images/catalog/hex-cap-screw.jpg"></div>
  <table id="product-property-list">
    <tr><td>Category</td><td>Hex cap screws</td></tr>
    <tr><td>Material</td><td>Stainless steel 18-8</td></tr>
    <tr><td>Diameter</td><td>1/4"</td></tr>
  </table>
  <table id="product-pricing">
    <tr><th>Quantity</th><th>Price each</th></tr>
    <tr><td>1 - 99</td><td>$0.21</td></tr>
    <tr><td>100+</td><td>$0.15</td></tr>
  </table>
</body></html>"#;

#[tokio::test]
async fn boltdepot_scrapes_product_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Product-Details.aspx"))
        .and(query_param("product", "15183"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BOLT_PAGE))
        .mount(&server)
        .await;

    let adapter = BoltDepotAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    let part = adapter.get_part_details("15183").await.unwrap().unwrap();

    assert_eq!(part.supplier_part_number, "15183");
    assert!(part.description.as_deref().unwrap().starts_with("Hex cap screw"));
    assert_eq!(part.category.as_deref(), Some("Hex cap screws"));
    assert_eq!(part.specifications["material"], "Stainless steel 18-8");
    assert!(!part.specifications.contains_key("category"));
    assert_eq!(
        part.image_url,
        Some(format!("{}/images/catalog/hex-cap-screw.jpg", server.uri()))
    );
    let pricing = part.pricing().unwrap();
    assert_eq!(pricing.len(), 2);
    assert_eq!(pricing[1].quantity, 100);
    assert!((pricing[1].price - 0.15).abs() < 1e-9);
}

#[tokio::test]
async fn boltdepot_missing_page_is_not_found_and_errors_are_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("product", "99999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("product", "500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let adapter = BoltDepotAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    assert!(adapter.get_part_details("99999").await.unwrap().is_none());
    let err = adapter.get_part_details("500").await.unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
}

#[tokio::test]
async fn boltdepot_rendered_mode_falls_back_to_static_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Product-Details.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BOLT_PAGE))
        .mount(&server)
        .await;

    let mut adapter = BoltDepotAdapter::with_base_url(&settings(), &server.uri()).unwrap();
    adapter
        .configure(Credentials::new(), SupplierConfig::new().with("use_rendered_scraping", true))
        .unwrap();
    let part = adapter.get_part_details("15183").await.unwrap().unwrap();
    assert_eq!(part.specifications["diameter"], "1/4\"");
}
