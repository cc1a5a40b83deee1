use chrono::NaiveDate;
use partsbin_core::FileType;
use serde_json::json;

use super::*;

fn adapter() -> LcscAdapter {
    LcscAdapter::new(&HttpSettings::no_retries()).unwrap()
}

fn product() -> Value {
    json!({
        "productCode": "C25804",
        "productModel": "0603WAF1002T5E",
        "brandNameEn": "UNI-ROYAL(Uniroyal Elec)",
        "encapStandard": "0603",
        "productIntroEn": "100mW Thick Film Resistors 75V &plusmn;100ppm/&#8451; &plusmn;1% 10k&Omega; 0603 Chip Resistor",
        "catalogName": "Chip Resistor - Surface Mount",
        "pdfUrl": "https://datasheet.lcsc.com/lcsc/2206010216_UNI-ROYAL-0603WAF1002T5E_C25804.pdf",
        "productImages": ["https://assets.lcsc.com/images/lcsc/900x900/C25804_front.jpg"],
        "stockNumber": 21_539_400,
        "minBuyNumber": 100,
        "productPriceList": [
            {"ladder": 1000, "usdPrice": 0.0009, "currencySymbol": "US$"},
            {"ladder": 100, "usdPrice": 0.0012, "currencySymbol": "US$"},
            {"ladder": 10000, "usdPrice": "0.0007", "currencySymbol": "US$"}
        ],
        "paramVOList": [
            {"paramNameEn": "Resistance", "paramValueEn": "10k\u{3a9}"},
            {"paramNameEn": "Tolerance", "paramValueEn": "\u{b1}1%"},
            {"paramNameEn": "Power(Watts)", "paramValueEn": "100mW"}
        ]
    })
}

#[test]
fn parses_product_detail() {
    let part = adapter().parse_product(&product()).unwrap();

    assert_eq!(part.supplier_part_number, "C25804");
    assert_eq!(part.manufacturer_part_number.as_deref(), Some("0603WAF1002T5E"));
    assert_eq!(part.manufacturer.as_deref(), Some("UNI-ROYAL(Uniroyal Elec)"));
    assert_eq!(part.category.as_deref(), Some("Chip Resistor - Surface Mount"));
    assert!(part.datasheet_url.unwrap().ends_with(".pdf"));
    assert!(part.image_url.unwrap().ends_with("C25804_front.jpg"));
    assert_eq!(part.stock_quantity, Some(21_539_400));
    assert_eq!(part.specifications["resistance"], "10k\u{3a9}");
    assert_eq!(part.specifications["power-watts"], "100mW");
    assert_eq!(part.specifications["package"], "0603");
    assert_eq!(part.additional_data["minimum_order_quantity"], 100);
    assert_eq!(
        part.product_url.as_deref(),
        Some("https://www.lcsc.com/product-detail/C25804.html")
    );
    assert!(part.description.unwrap().contains("\u{b1}1%"));
}

#[test]
fn pricing_is_sorted_and_uses_configured_currency() {
    let mut adapter = adapter();
    adapter
        .configure(Credentials::new(), SupplierConfig::new().with("currency", "EUR"))
        .unwrap();
    let part = adapter.parse_product(&product()).unwrap();
    let pricing = part.pricing().unwrap();

    let quantities: Vec<u64> = pricing.iter().map(|b| b.quantity).collect();
    assert_eq!(quantities, vec![100, 1000, 10000]);
    assert!((pricing[2].price - 0.0007).abs() < 1e-12);
    assert!(pricing.iter().all(|b| b.currency == "EUR"));
}

#[test]
fn product_without_code_is_dropped() {
    assert!(adapter().parse_product(&json!({"productModel": "X"})).is_none());
}

#[test]
fn invalid_currency_is_rejected_on_configure() {
    let err = adapter()
        .configure(Credentials::new(), SupplierConfig::new().with("currency", "GBP"))
        .unwrap_err();
    assert!(err.is_unusable());
}

#[test]
fn order_date_comes_from_export_filename() {
    let info = adapter().extract_order_info("LCSC_Exported__20240115_093012.csv");
    assert_eq!(info.order_date, NaiveDate::from_ymd_opt(2024, 1, 15));
    assert!(adapter().extract_order_info("parts.csv").is_empty());
}

#[test]
fn imports_lcsc_export() {
    let csv = "LCSC Part Number,Manufacture Part Number,Manufacturer,Customer NO.,Package,Description,RoHS,Order Qty.,Min\\Mult Order Qty.,Unit Price($),Order Price($)\n\
               C25804,0603WAF1002T5E,UNI-ROYAL(Uniroyal Elec),R1,0603,100mW Thick Film Resistor 10k,YES,100,100/100,0.0012,0.12\n\
               C14663,CL10B104KB8NNNC,SAMSUNG,,0603,100nF 50V X7R Capacitor,YES,50,50/50,0.0025,0.13\n";
    let result = adapter().import_order_file(csv.as_bytes(), FileType::Csv, "LCSC_Exported__20240115_093012.csv");

    assert!(result.success, "{result:?}");
    assert_eq!(result.parts_count, 2);
    let first = &result.parts[0];
    assert_eq!(first.supplier, "LCSC Electronics");
    assert_eq!(first.supplier_part_number, "C25804");
    assert_eq!(first.quantity, 100);
    assert_eq!(first.extended_price, Some(0.12));
    assert_eq!(first.additional_properties["supplier_data"]["customer_reference"], "R1");
    assert_eq!(first.additional_properties["technical_specs"]["package"], "0603");
    assert_eq!(first.additional_properties["compliance"]["rohs_compliant"], true);
    assert_eq!(first.additional_properties["order_info"]["min_mult_order_qty"], "100/100");
    assert_eq!(first.additional_properties["order_info"]["order_date"], "2024-01-15");
}

#[test]
fn recognizes_lcsc_files_only() {
    let adapter = adapter();
    assert!(adapter.can_import_file(
        "LCSC_Exported__20240115_093012.csv",
        Some(b"LCSC Part Number,Description,Order Qty.\n")
    ));
    assert!(!adapter.can_import_file(
        "digikey.csv",
        Some(b"DigiKey Part #,Manufacturer Part Number,Description,Quantity\n")
    ));
    assert!(!adapter.can_import_file("order.xlsx", None));
}
