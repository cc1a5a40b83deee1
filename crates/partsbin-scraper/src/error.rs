use std::time::Duration;

use thiserror::Error;

use crate::retry::Retriable;

/// Transport-level failures inside the scraper.
///
/// Public scrape operations convert these into failed
/// [`partsbin_core::ExtractionResult`]s; they surface directly only from
/// [`crate::retry::retry_with_backoff`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl Retriable for ScrapeError {
    fn is_retriable(&self) -> bool {
        match self {
            ScrapeError::RateLimited { .. } => true,
            ScrapeError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ScrapeError::UnexpectedStatus { status, .. } => *status >= 500,
            ScrapeError::NotFound { .. } | ScrapeError::InvalidUrl { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ScrapeError::RateLimited {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

/// Failures of the headless page renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No usable browser, or the request needs something this renderer cannot do.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("failed to launch browser {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rendering {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("browser session failed while rendering {url}: {message}")]
    Session { url: String, message: String },

    #[error("browser exited with {status} while rendering {url}: {stderr}")]
    Failed {
        url: String,
        status: String,
        stderr: String,
    },
}
