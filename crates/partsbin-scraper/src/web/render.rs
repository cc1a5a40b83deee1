//! Headless-browser rendering for JavaScript-heavy pages.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Browser-like user agent sent with rendered requests.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default budget of page time allowed for scripts and waits.
const DEFAULT_SETTLE_MS: u64 = 5_000;
const STDERR_LIMIT: usize = 500;
const SELECTOR_POLL: Duration = Duration::from_millis(200);

/// A page interaction performed after navigation and before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum PageAction {
    /// Let the page run for this long.
    Wait { millis: u64 },
    Click { selector: String },
    Fill { selector: String, value: String },
    Press { key: String },
}

impl PageAction {
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        !matches!(self, PageAction::Wait { .. })
    }
}

/// Everything a renderer needs for one page.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
    pub user_agent: &'a str,
    pub wait_for_selector: Option<&'a str>,
    pub actions: &'a [PageAction],
}

/// Produces the post-JavaScript DOM of a page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders `request.url` and returns the serialized DOM.
    ///
    /// # Errors
    ///
    /// [`RenderError::Unavailable`] when this renderer cannot serve the
    /// request at all; callers fall back to static scraping.
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError>;
}

/// Renders by launching a headless Chromium per call.
///
/// Requests without interactive actions use `--dump-dom`. Requests that click,
/// fill or press keys drive a DevTools session instead. Either way the
/// browser is torn down when the call finishes, times out or is dropped.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    binary: PathBuf,
    timeout: Duration,
}

const BROWSER_CANDIDATES: [&str; 5] = [
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

impl ChromeRenderer {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Uses `explicit` when given, otherwise the first known browser on `PATH`.
    #[must_use]
    pub fn discover(explicit: Option<&Path>, timeout: Duration) -> Option<Self> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Some(Self::new(path, timeout));
            }
            tracing::warn!(path = %path.display(), "configured browser path does not exist");
            return None;
        }

        let search_path = std::env::var_os("PATH")?;
        std::env::split_paths(&search_path)
            .flat_map(|dir| BROWSER_CANDIDATES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .map(|binary| Self::new(binary, timeout))
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn stealth_args(user_agent: &str) -> Vec<String> {
        vec![
            "--disable-gpu".to_owned(),
            "--no-sandbox".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
            "--disable-blink-features=AutomationControlled".to_owned(),
            "--disable-extensions".to_owned(),
            "--no-first-run".to_owned(),
            "--hide-scrollbars".to_owned(),
            "--mute-audio".to_owned(),
            "--lang=en-US".to_owned(),
            "--window-size=1920,1080".to_owned(),
            format!("--user-agent={user_agent}"),
        ]
    }

    fn args(request: &RenderRequest<'_>) -> Vec<String> {
        let waited: u64 = request
            .actions
            .iter()
            .map(|a| match a {
                PageAction::Wait { millis } => *millis,
                _ => 0,
            })
            .sum();
        let budget = DEFAULT_SETTLE_MS.saturating_add(waited);

        let mut args = vec!["--headless=new".to_owned()];
        args.extend(Self::stealth_args(request.user_agent));
        args.extend([
            format!("--virtual-time-budget={budget}"),
            "--dump-dom".to_owned(),
            request.url.to_owned(),
        ]);
        args
    }

    /// Drives a DevTools session: navigate, run the actions in order, wait
    /// for `wait_for_selector`, then serialize the DOM.
    async fn render_scripted(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let config = BrowserConfig::builder()
            .chrome_executable(&self.binary)
            .args(Self::stealth_args(request.user_agent))
            .build()
            .map_err(|e| RenderError::Unavailable(format!("cannot configure browser session: {e}")))?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Unavailable(format!("cannot start browser session: {e}")))?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = tokio::time::timeout(self.timeout, run_session(&browser, request)).await;

        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "browser session did not close cleanly");
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "browser process did not exit cleanly");
        }
        events.abort();

        match outcome {
            Ok(Ok(dom)) => Ok(dom),
            Ok(Err(e)) => Err(RenderError::Session {
                url: request.url.to_owned(),
                message: e.to_string(),
            }),
            Err(_) => Err(RenderError::Timeout {
                url: request.url.to_owned(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}

async fn run_session(browser: &Browser, request: &RenderRequest<'_>) -> Result<String, CdpError> {
    let page = browser.new_page(request.url).await?;
    for action in request.actions {
        match action {
            PageAction::Wait { millis } => tokio::time::sleep(Duration::from_millis(*millis)).await,
            PageAction::Click { selector } => {
                page.find_element(selector.as_str()).await?.click().await?;
            }
            PageAction::Fill { selector, value } => {
                page.find_element(selector.as_str())
                    .await?
                    .click()
                    .await?
                    .type_str(value)
                    .await?;
            }
            PageAction::Press { key } => {
                page.find_element(":focus").await?.press_key(key).await?;
            }
        }
        tracing::debug!(url = request.url, ?action, "page action performed");
    }

    let settle = Duration::from_millis(DEFAULT_SETTLE_MS);
    match request.wait_for_selector {
        Some(selector) => {
            if !wait_for_selector(&page, selector, settle).await {
                tracing::debug!(url = request.url, selector, "wait selector did not appear");
            }
        }
        None => tokio::time::sleep(SELECTOR_POLL).await,
    }
    page.content().await
}

async fn wait_for_selector(page: &Page, selector: &str, budget: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + budget;
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(SELECTOR_POLL).await;
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        if request.actions.iter().any(PageAction::is_interactive) {
            return self.render_scripted(request).await;
        }

        let binary = self.binary.display().to_string();
        let child = tokio::process::Command::new(&self.binary)
            .args(Self::args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    RenderError::Unavailable(format!("browser not found at {binary}"))
                } else {
                    RenderError::Launch {
                        binary: binary.clone(),
                        source,
                    }
                }
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout {
                url: request.url.to_owned(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|source| RenderError::Launch {
                binary: binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed {
                url: request.url.to_owned(),
                status: output.status.to_string(),
                stderr: stderr.chars().take(STDERR_LIMIT).collect(),
            });
        }

        let dom = String::from_utf8_lossy(&output.stdout).into_owned();
        if dom.trim().is_empty() {
            return Err(RenderError::Failed {
                url: request.url.to_owned(),
                status: output.status.to_string(),
                stderr: "browser produced an empty DOM".to_owned(),
            });
        }
        tracing::debug!(url = request.url, bytes = dom.len(), "rendered page");
        Ok(dom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(actions: &[PageAction]) -> RenderRequest<'_> {
        RenderRequest {
            url: "https://example.com/",
            user_agent: BROWSER_USER_AGENT,
            wait_for_selector: None,
            actions,
        }
    }

    #[test]
    fn args_hide_automation_and_extend_time_budget() {
        let actions = [PageAction::Wait { millis: 1500 }];
        let args = ChromeRenderer::args(&request(&actions));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_owned()));
        assert!(args.contains(&"--virtual-time-budget=6500".to_owned()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn interactive_session_without_browser_is_unavailable() {
        let renderer = ChromeRenderer::new("/nonexistent/chromium", Duration::from_secs(1));
        let actions = [PageAction::Fill {
            selector: "#q".to_owned(),
            value: "M3".to_owned(),
        }];
        let err = renderer.render(&request(&actions)).await.unwrap_err();
        assert!(matches!(err, RenderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let renderer = ChromeRenderer::new("/nonexistent/chromium", Duration::from_secs(1));
        let err = renderer.render(&request(&[])).await.unwrap_err();
        assert!(matches!(err, RenderError::Unavailable(_)), "{err:?}");
    }

    #[test]
    fn discover_rejects_missing_explicit_path() {
        assert!(ChromeRenderer::discover(Some(Path::new("/nonexistent/chrome")), Duration::from_secs(1)).is_none());
    }

    #[test]
    fn action_wire_shape_is_tagged() {
        let json = serde_json::to_value(PageAction::Click {
            selector: "button.search".to_owned(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"action": "click", "selector": "button.search"}));
    }
}
