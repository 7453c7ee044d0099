//! Chromium session driven over CDP with chromiumoxide.
//!
//! Everything the scrape script does on the live page goes through
//! [`BrowserSession`]: navigation, locator waits, clicks, typing and DOM
//! snapshots. Extraction itself happens on the snapshot, not here.

mod locator;

pub use locator::Locator;

use crate::error::{Result, ScrapeError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use locator::TARGET_ATTR;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/119.0.0.0 Safari/537.36";

const WINDOW: (u32, u32) = (1366, 768);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Hides the usual automation fingerprints before any page script runs.
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['th-TH', 'en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3] });
const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
if (originalQuery) {
  window.navigator.permissions.query = (parameters) => (
    parameters.name === 'notifications'
      ? Promise.resolve({ state: Notification.permission })
      : originalQuery(parameters)
  );
}
"#;

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub slow_mo: Duration,
    pub timeout: Duration,
    pub chrome_path: Option<PathBuf>,
}

/// Pick the browser binary: explicit path first, then a system Chrome, then
/// whatever Chromium is on `PATH`. `None` leaves detection to chromiumoxide.
pub fn find_chrome(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("Chrome path {} does not exist, falling back", path.display());
    }

    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    slow_mo: Duration,
    timeout: Duration,
}

impl BrowserSession {
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(WINDOW.0, WINDOW.1)
            .viewport(Viewport {
                width: WINDOW.0,
                height: WINDOW.1,
                ..Default::default()
            })
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=th-TH")
            .arg("--accept-lang=th-TH,th,en-US,en")
            .arg(format!("--user-agent={USER_AGENT}"));

        if !options.headless {
            builder = builder.with_head();
        }

        if let Some(path) = find_chrome(options.chrome_path.as_deref()) {
            info!("Using browser at {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(ScrapeError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await?;

        info!(
            "Browser launched ({})",
            if options.headless { "headless" } else { "headful" }
        );

        Ok(Self {
            browser,
            page,
            handler,
            slow_mo: options.slow_mo,
            timeout: options.timeout,
        })
    }

    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        closed?;
        info!("Browser closed");
        Ok(())
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            sleep(self.slow_mo).await;
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: impl Into<String>) -> Result<T> {
        let result = self.page.evaluate(script.into()).await?;
        Ok(result.into_value()?)
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.pace().await;
        debug!("Navigating to {}", url);

        match tokio::time::timeout(self.timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ScrapeError::Timeout(format!("navigation to {url}"))),
        }

        self.wait_for_dom_ready(self.timeout).await;
        Ok(())
    }

    pub async fn url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    pub async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    pub async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    pub async fn is_visible(&self, locator: &Locator) -> bool {
        self.eval::<bool>(locator.visible_script())
            .await
            .unwrap_or(false)
    }

    /// Poll until the first match of `locator` is visible. A zero timeout
    /// checks once.
    pub async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_visible(locator).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// First locator in the chain whose first match becomes visible.
    pub async fn first_visible<'a>(
        &self,
        locators: &'a [Locator],
        timeout: Duration,
    ) -> Option<&'a Locator> {
        for locator in locators {
            if self.wait_visible(locator, timeout).await {
                debug!("Found visible element via {}", locator);
                return Some(locator);
            }
        }
        None
    }

    /// Click the first match of `locator` with real mouse events.
    pub async fn click(&self, locator: &Locator) -> Result<bool> {
        if !self.eval::<bool>(locator.mark_script()).await? {
            return Ok(false);
        }
        self.click_marked().await?;
        Ok(true)
    }

    /// Click the first link inside the first match of `locator`.
    pub async fn click_link_within(&self, locator: &Locator) -> Result<bool> {
        if !self.eval::<bool>(locator.mark_link_within_script()).await? {
            return Ok(false);
        }
        self.click_marked().await?;
        Ok(true)
    }

    async fn click_marked(&self) -> Result<()> {
        self.pace().await;
        let element = self.page.find_element(format!("[{TARGET_ATTR}]")).await?;
        element.click().await?;
        Ok(())
    }

    /// Try each locator in order; the first one that shows up within
    /// `timeout` and accepts the click wins.
    pub async fn try_click(&self, locators: &[Locator], timeout: Duration) -> bool {
        for locator in locators {
            if !self.wait_visible(locator, timeout).await {
                continue;
            }
            match self.click(locator).await {
                Ok(true) => {
                    debug!("Clicked {}", locator);
                    return true;
                }
                Ok(false) => continue,
                Err(e) => {
                    debug!("Click on {} failed: {}", locator, e);
                    continue;
                }
            }
        }
        false
    }

    /// Clear the field and type `text` with native key events.
    pub async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        if !self.eval::<bool>(locator.mark_script()).await? {
            return Err(ScrapeError::NotFound(locator.to_string()));
        }
        self.eval::<bool>(format!(
            "(() => {{ const el = document.querySelector('[{TARGET_ATTR}]'); \
             if (!el) return false; el.value = ''; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); return true; }})()"
        ))
        .await?;

        self.pace().await;
        let element = self.page.find_element(format!("[{TARGET_ATTR}]")).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    pub async fn press_enter(&self, locator: &Locator) -> Result<()> {
        if !self.eval::<bool>(locator.mark_script()).await? {
            return Err(ScrapeError::NotFound(locator.to_string()));
        }
        self.pace().await;
        let element = self.page.find_element(format!("[{TARGET_ATTR}]")).await?;
        element.press_key("Enter").await?;
        Ok(())
    }

    pub async fn wait_for_dom_ready(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let state = self
                .eval::<String>("document.readyState")
                .await
                .unwrap_or_default();
            if state == "interactive" || state == "complete" {
                return;
            }
            sleep(POLL_INTERVAL).await;
        }
        debug!("DOM not ready after {:?}", timeout);
    }

    /// Wait until the document is complete and no new resources have loaded
    /// for a second. Running out of time is not an error.
    pub async fn wait_for_network_idle(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let idle = Duration::from_secs(1);
        let interval = Duration::from_millis(250);
        let mut last_count = None;
        let mut stable = Duration::ZERO;

        while Instant::now() < deadline {
            let snapshot = self
                .eval::<(String, u64)>(
                    "[document.readyState, performance.getEntriesByType('resource').length]",
                )
                .await
                .ok();

            match snapshot {
                Some((state, count)) if state == "complete" && last_count == Some(count) => {
                    stable += interval;
                    if stable >= idle {
                        return;
                    }
                }
                Some((_, count)) => {
                    stable = Duration::ZERO;
                    last_count = Some(count);
                }
                None => stable = Duration::ZERO,
            }
            sleep(interval).await;
        }
        debug!("Network not idle after {:?}", timeout);
    }

    /// Poll until the inner text of the first `selector` match is longer than
    /// `min_len` characters.
    pub async fn wait_for_text(&self, selector: &str, min_len: usize, timeout: Duration) -> bool {
        let selector = serde_json::to_string(selector).unwrap_or_default();
        let script = format!(
            "(() => {{ const el = document.querySelector({selector}); \
             return el && el.innerText ? el.innerText.length : 0; }})()"
        );
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<usize>(script.as_str()).await.unwrap_or(0) > min_len {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Whether a visible `inner` element exists under the first `container`.
    pub async fn has_visible_within(&self, container: &str, inner: &str) -> bool {
        let container = serde_json::to_string(container).unwrap_or_default();
        let inner = serde_json::to_string(inner).unwrap_or_default();
        let script = format!(
            "(() => {{ const root = document.querySelector({container}); \
             if (!root) return false; const el = root.querySelector({inner}); \
             return !!el && el.getClientRects().length > 0; }})()"
        );
        self.eval::<bool>(script).await.unwrap_or(false)
    }
}
