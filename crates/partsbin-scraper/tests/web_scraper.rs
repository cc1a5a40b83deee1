//! Integration tests for `WebScraper` against local `wiremock` servers.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use partsbin_scraper::{
    is_page_not_found, selector_map, PageAction, PageRenderer, RenderError, RenderOptions, RenderRequest,
    WebScraper, WebScraperConfig,
};

const PRODUCT_PAGE: &str = r#"<html><body>
  <h1 class="name">Hex Cap Screw</h1>
  <table id="details">
    <tr><td>Material</td><td>Stainless steel 18-8</td></tr>
    <tr><td>Thread</td><td>1/4"-20</td></tr>
  </table>
</body></html>"#;

fn config(ttl: Duration, delay: Duration) -> WebScraperConfig {
    WebScraperConfig {
        timeout_secs: 5,
        user_agent: "partsbin-test/0.1".to_owned(),
        cache_ttl: ttl,
        domain_delay: delay,
        max_retries: 0,
        backoff_base_secs: 0,
    }
}

fn scraper(ttl: Duration) -> WebScraper {
    WebScraper::new(config(ttl, Duration::ZERO)).expect("failed to build test WebScraper")
}

async fn product_server(expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn scrape_simple_extracts_text_and_table() {
    let server = product_server(1).await;
    let selectors = selector_map(&[("name", "h1.name"), ("details", "table#details"), ("price", ".price")]);

    let result = scraper(Duration::from_secs(60))
        .scrape_simple(&format!("{}/product", server.uri()), &selectors, false)
        .await;

    assert!(result.success, "{:?}", result.error);
    let page = result.value().unwrap();
    assert_eq!(page.text("name"), Some("Hex Cap Screw"));
    assert_eq!(page.table("details").unwrap()["material"], "Stainless steel 18-8");
    assert!(!page.rendered);
    assert!(result.warnings.iter().any(|w| w.contains("price")));
}

#[tokio::test]
async fn second_scrape_is_served_from_cache() {
    let server = product_server(1).await;
    let scraper = scraper(Duration::from_secs(60));
    let selectors = selector_map(&[("name", "h1.name")]);
    let url = format!("{}/product", server.uri());

    let first = scraper.scrape_simple(&url, &selectors, false).await;
    let second = scraper.scrape_simple(&url, &selectors, false).await;

    assert_eq!(first.value(), second.value());
    assert_eq!(scraper.cache_len(), 1);
}

#[tokio::test]
async fn expired_entry_triggers_refetch() {
    let server = product_server(2).await;
    let scraper = scraper(Duration::from_millis(50));
    let selectors = selector_map(&[("name", "h1.name")]);
    let url = format!("{}/product", server.uri());

    scraper.scrape_simple(&url, &selectors, false).await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    let again = scraper.scrape_simple(&url, &selectors, false).await;

    assert!(again.success);
}

#[tokio::test]
async fn force_refresh_bypasses_cache() {
    let server = product_server(2).await;
    let scraper = scraper(Duration::from_secs(60));
    let selectors = selector_map(&[("name", "h1.name")]);
    let url = format!("{}/product", server.uri());

    scraper.scrape_simple(&url, &selectors, false).await;
    let refreshed = scraper.scrape_simple(&url, &selectors, true).await;

    assert!(refreshed.success);
}

#[tokio::test]
async fn different_selectors_do_not_share_cache_entries() {
    let server = product_server(2).await;
    let scraper = scraper(Duration::from_secs(60));
    let url = format!("{}/product", server.uri());

    scraper.scrape_simple(&url, &selector_map(&[("name", "h1.name")]), false).await;
    scraper.scrape_simple(&url, &selector_map(&[("details", "table#details")]), false).await;

    assert_eq!(scraper.cache_len(), 2);
}

#[tokio::test]
async fn clear_cache_forces_refetch() {
    let server = product_server(2).await;
    let scraper = scraper(Duration::from_secs(60));
    let selectors = selector_map(&[("name", "h1.name")]);
    let url = format!("{}/product", server.uri());

    scraper.scrape_simple(&url, &selectors, false).await;
    scraper.clear_cache();
    assert_eq!(scraper.cache_len(), 0);
    scraper.scrape_simple(&url, &selectors, false).await;
}

#[tokio::test]
async fn same_domain_requests_are_spaced_by_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .mount(&server)
        .await;
    let scraper = WebScraper::new(config(Duration::from_secs(60), Duration::from_millis(300))).unwrap();
    let selectors = selector_map(&[("name", "h1.name")]);

    let start = Instant::now();
    scraper.scrape_simple(&format!("{}/a", server.uri()), &selectors, false).await;
    scraper.scrape_simple(&format!("{}/b", server.uri()), &selectors, false).await;

    assert!(start.elapsed() >= Duration::from_millis(280), "elapsed {:?}", start.elapsed());
}

#[tokio::test]
async fn cached_requests_are_not_paced() {
    let server = product_server(1).await;
    let scraper = WebScraper::new(config(Duration::from_secs(60), Duration::from_secs(5))).unwrap();
    let selectors = selector_map(&[("name", "h1.name")]);
    let url = format!("{}/product", server.uri());

    scraper.scrape_simple(&url, &selectors, false).await;
    let start = Instant::now();
    scraper.scrape_simple(&url, &selectors, false).await;

    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn http_error_becomes_failed_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = scraper(Duration::from_secs(60))
        .scrape_simple(&format!("{}/gone", server.uri()), &selector_map(&[("name", "h1")]), false)
        .await;

    assert!(!result.success);
    assert!(is_page_not_found(&result));
    assert!(result.error.unwrap().contains("not found"));
}

#[tokio::test]
async fn failed_scrape_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    let scraper = scraper(Duration::from_secs(60));
    let selectors = selector_map(&[("name", "h1")]);
    let url = format!("{}/down", server.uri());

    scraper.scrape_simple(&url, &selectors, false).await;
    scraper.scrape_simple(&url, &selectors, false).await;

    assert_eq!(scraper.cache_len(), 0);
}

#[tokio::test]
async fn rendered_scrape_without_renderer_falls_back_to_static() {
    let server = product_server(1).await;
    let selectors = selector_map(&[("name", "h1.name")]);

    let result = scraper(Duration::from_secs(60))
        .scrape_rendered(&format!("{}/product", server.uri()), &selectors, &RenderOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.value().unwrap().text("name"), Some("Hex Cap Screw"));
    assert!(!result.value().unwrap().rendered);
    assert!(result.warnings.iter().any(|w| w.contains("rendering unavailable")));
}

struct FixedRenderer;

#[async_trait]
impl PageRenderer for FixedRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        if request.actions.iter().any(PageAction::is_interactive) {
            return Err(RenderError::Unavailable("no scripting".to_owned()));
        }
        Ok(r#"<div id="results"><span class="stock">In stock: 1,200</span></div>"#.to_owned())
    }
}

#[tokio::test]
async fn rendered_scrape_uses_renderer_dom() {
    let scraper = scraper(Duration::from_secs(60)).with_renderer(Arc::new(FixedRenderer));
    let options = RenderOptions {
        wait_for_selector: Some("#results".to_owned()),
        ..RenderOptions::default()
    };

    let result = scraper
        .scrape_rendered("https://js.example.com/search", &selector_map(&[("stock", "span.stock")]), &options)
        .await;

    let page = result.value().unwrap();
    assert!(page.rendered);
    assert_eq!(page.text("stock"), Some("In stock: 1,200"));
    assert!(result.warnings.is_empty());
}

/// Replays fill/click actions against a tiny search form and records them.
#[derive(Default)]
struct SearchFormRenderer {
    performed: Mutex<Vec<PageAction>>,
}

#[async_trait]
impl PageRenderer for SearchFormRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let mut query = String::new();
        let mut submitted = false;
        for action in request.actions {
            match action {
                PageAction::Fill { selector, value } if selector == "#q" => query.clone_from(value),
                PageAction::Click { selector } if selector == "button#go" => submitted = true,
                _ => {}
            }
        }
        self.performed
            .lock()
            .unwrap()
            .extend(request.actions.iter().cloned());

        let results = if submitted {
            format!(r#"<ul id="results"><li class="hit">Results for {query}</li></ul>"#)
        } else {
            String::new()
        };
        Ok(format!(r#"<form><input id="q"><button id="go">Go</button></form>{results}"#))
    }
}

#[tokio::test]
async fn rendered_scrape_runs_page_actions_before_extraction() {
    let renderer = Arc::new(SearchFormRenderer::default());
    let scraper = scraper(Duration::from_secs(60)).with_renderer(renderer.clone());
    let actions = vec![
        PageAction::Fill {
            selector: "#q".to_owned(),
            value: "M3 socket cap".to_owned(),
        },
        PageAction::Click {
            selector: "button#go".to_owned(),
        },
    ];
    let options = RenderOptions {
        wait_for_selector: Some("#results".to_owned()),
        actions: actions.clone(),
        ..RenderOptions::default()
    };

    let result = scraper
        .scrape_rendered("https://js.example.com/search", &selector_map(&[("hit", "li.hit")]), &options)
        .await;

    assert!(result.success, "{:?}", result.error);
    let page = result.value().unwrap();
    assert!(page.rendered);
    assert_eq!(page.text("hit"), Some("Results for M3 socket cap"));
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(*renderer.performed.lock().unwrap(), actions);
}

#[tokio::test]
async fn renderer_failure_falls_back_to_static() {
    let server = product_server(1).await;
    let scraper = scraper(Duration::from_secs(60)).with_renderer(Arc::new(FixedRenderer));
    let options = RenderOptions {
        actions: vec![PageAction::Click {
            selector: "button".to_owned(),
        }],
        ..RenderOptions::default()
    };

    let result = scraper
        .scrape_rendered(&format!("{}/product", server.uri()), &selector_map(&[("name", "h1.name")]), &options)
        .await;

    assert!(result.success);
    assert!(!result.value().unwrap().rendered);
    assert!(result.warnings.iter().any(|w| w.contains("rendering failed")));
}

#[tokio::test]
async fn invalid_url_fails_without_network() {
    let scraper = scraper(Duration::from_secs(60));
    let selectors = selector_map(&[("name", "h1")]);

    let result = scraper.scrape_simple("not a url", &selectors, false).await;
    assert!(!result.success);

    let result = scraper
        .scrape_rendered("mailto:sales@example.com", &selectors, &RenderOptions::default())
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("invalid URL"));
    assert_eq!(scraper.cache_len(), 0);
}
