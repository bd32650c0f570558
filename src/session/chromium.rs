//! Chromium-backed sessions using chromiumoxide.

use super::{Automation, ElementHandle, Interaction, PageSession};
use crate::errors::HarvestError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use chromiumoxide::Element;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. FORAGE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("FORAGE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.forage/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".forage/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".forage/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".forage/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".forage/chromium/chrome-linux64/chrome"),
                home.join(".forage/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-backed automation engine.
pub struct ChromiumAutomation {
    browser: Browser,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumAutomation {
    /// Launch a headless Chromium instance.
    pub async fn launch() -> Result<Self, HarvestError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            HarvestError::Navigation {
                url: String::new(),
                reason: "Chromium not found; set FORAGE_CHROMIUM_PATH".to_string(),
            }
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(|e| HarvestError::Navigation {
                url: String::new(),
                reason: format!("failed to build browser config: {e}"),
            })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            HarvestError::Navigation {
                url: String::new(),
                reason: format!("failed to launch Chromium: {e}"),
            }
        })?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Automation for ChromiumAutomation {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, HarvestError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| HarvestError::Navigation {
                url: "about:blank".to_string(),
                reason: format!("failed to create page: {e}"),
            })?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumSession {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<(), HarvestError> {
        // Browser process exits when ChromiumAutomation is dropped.
        Ok(())
    }

    fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium tab.
pub struct ChromiumSession {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), HarvestError> {
        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        match result {
            Ok(Ok(_)) => {
                // Best-effort wait for the load event; slow subresources
                // must not turn a successful navigation into a failure.
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(HarvestError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(HarvestError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {timeout_ms}ms"),
            }),
        }
    }

    async fn query_all(&self, locator: &str) -> Vec<Box<dyn ElementHandle>> {
        self.page
            .find_elements(locator)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|el| Box::new(ChromiumElement { el }) as Box<dyn ElementHandle>)
            .collect()
    }

    async fn query_one(&self, locator: &str) -> Option<Box<dyn ElementHandle>> {
        self.page
            .find_element(locator)
            .await
            .ok()
            .map(|el| Box::new(ChromiumElement { el }) as Box<dyn ElementHandle>)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, HarvestError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| HarvestError::Script(e.to_string()))?;

        // `undefined` has no JSON representation; surface it as null.
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn wait_for_quiescence(&self, timeout_ms: u64) -> Result<(), HarvestError> {
        let budget = Duration::from_millis(timeout_ms);
        let deadline = Instant::now() + budget;

        loop {
            let state = self
                .page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|r| r.into_value::<String>().ok())
                .unwrap_or_default();

            if state == "complete" {
                // Settle window for late script-driven inserts.
                tokio::time::sleep(Duration::from_millis(500).min(budget)).await;
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarvestError::Timeout(budget));
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn content(&self) -> Result<String, HarvestError> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| HarvestError::Script(e.to_string()))?;

        result
            .into_value::<String>()
            .map_err(|e| HarvestError::Script(format!("failed to read document HTML: {e:?}")))
    }

    async fn current_url(&self) -> String {
        self.page
            .url()
            .await
            .unwrap_or_default()
            .map(|u| u.to_string())
            .unwrap_or_default()
    }

    async fn title(&self) -> String {
        self.page
            .evaluate("document.title")
            .await
            .ok()
            .and_then(|r| r.into_value::<String>().ok())
            .unwrap_or_default()
    }

    async fn close(self: Box<Self>) -> Result<(), HarvestError> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

/// Handle wrapping a chromiumoxide element.
pub struct ChromiumElement {
    el: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> String {
        self.el
            .inner_text()
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    async fn attribute(&self, name: &str) -> Option<String> {
        self.el.attribute(name).await.ok().flatten()
    }

    async fn is_visible(&self) -> bool {
        self.el
            .call_js_fn("function() { return this.offsetParent !== null; }", false)
            .await
            .ok()
            .and_then(|ret| ret.result.value)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    async fn interact(&self, kind: Interaction) -> Result<(), HarvestError> {
        let result = match kind {
            Interaction::Click => self.el.click().await.map(|_| ()),
            Interaction::Hover => self.el.hover().await.map(|_| ()),
            Interaction::ScrollIntoView => self.el.scroll_into_view().await.map(|_| ()),
        };
        result.map_err(|e| HarvestError::Interaction(e.to_string()))
    }
}
