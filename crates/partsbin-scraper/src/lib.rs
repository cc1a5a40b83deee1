pub mod error;
pub mod extract;
pub mod origin;
pub mod pacing;
pub mod retry;
pub mod text;
pub mod web;

pub use error::{RenderError, ScrapeError};
pub use extract::{parse_number, safe_cast, Coerce, DataExtractor, PartNumbers, PricingKeys};
pub use pacing::Pacer;
pub use retry::{retry_with_backoff, Retriable};
pub use text::{clean_text, normalize_key};
pub use web::{
    is_page_not_found, selector_map, ChromeRenderer, PageAction, PageRenderer, RenderOptions, RenderRequest,
    ScrapedPage, ScrapedValue, SelectorKind, SelectorMap, SelectorSpec, WebScraper,
    WebScraperConfig,
};
