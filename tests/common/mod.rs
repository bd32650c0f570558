//! Scripted in-memory automation backend for integration tests.
//!
//! `FakeSite` serves static HTML fixtures keyed by URL; `FakeAutomation`
//! hands out sessions over it and tracks how many are open so tests can
//! assert that every worker released its session.

use async_trait::async_trait;
use forage::errors::HarvestError;
use forage::session::{Automation, ElementHandle, Interaction, PageSession};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Static site fixture: URL → HTML, plus URLs that refuse to load.
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    visits: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigation to this URL fails with a `Navigation` error.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

/// Automation engine over a `FakeSite`.
pub struct FakeAutomation {
    site: Arc<FakeSite>,
    active: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl FakeAutomation {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            active: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn site(&self) -> Arc<FakeSite> {
        Arc::clone(&self.site)
    }

    /// Total sessions ever opened.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Automation for FakeAutomation {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, HarvestError> {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            html: String::new(),
            url: String::new(),
            active: Arc::clone(&self.active),
        }))
    }

    async fn shutdown(&self) -> Result<(), HarvestError> {
        Ok(())
    }

    fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

/// One scripted page session over the fake site.
pub struct FakeSession {
    site: Arc<FakeSite>,
    html: String,
    url: String,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<(), HarvestError> {
        self.site.visits.lock().unwrap().push(url.to_string());
        if self.site.failing.contains(url) {
            return Err(HarvestError::Navigation {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        match self.site.pages.get(url) {
            Some(html) => {
                self.html = html.clone();
                self.url = url.to_string();
                Ok(())
            }
            None => Err(HarvestError::Navigation {
                url: url.to_string(),
                reason: "no such page".to_string(),
            }),
        }
    }

    async fn query_all(&self, locator: &str) -> Vec<Box<dyn ElementHandle>> {
        select_elements(&self.html, locator)
            .into_iter()
            .map(|el| Box::new(el) as Box<dyn ElementHandle>)
            .collect()
    }

    async fn query_one(&self, locator: &str) -> Option<Box<dyn ElementHandle>> {
        select_elements(&self.html, locator)
            .into_iter()
            .next()
            .map(|el| Box::new(el) as Box<dyn ElementHandle>)
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, HarvestError> {
        // Scripted pages carry no clickable affordances; reveal scripts
        // report "nothing clicked".
        Ok(serde_json::Value::Null)
    }

    async fn wait_for_quiescence(&self, _timeout_ms: u64) -> Result<(), HarvestError> {
        Ok(())
    }

    async fn settle(&self, _ms: u64) {}

    async fn content(&self) -> Result<String, HarvestError> {
        Ok(self.html.clone())
    }

    async fn current_url(&self) -> String {
        self.url.clone()
    }

    async fn title(&self) -> String {
        select_elements(&self.html, "title")
            .into_iter()
            .next()
            .map(|el| el.text)
            .unwrap_or_default()
    }

    async fn close(self: Box<Self>) -> Result<(), HarvestError> {
        self.active.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Element snapshot with owned text and attributes.
pub struct FakeElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn text(&self) -> String {
        self.text.clone()
    }

    async fn attribute(&self, name: &str) -> Option<String> {
        self.attrs.get(name).cloned()
    }

    async fn is_visible(&self) -> bool {
        true
    }

    async fn interact(&self, _kind: Interaction) -> Result<(), HarvestError> {
        Ok(())
    }
}

fn select_elements(html: &str, locator: &str) -> Vec<FakeElement> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse(locator) else {
        return Vec::new();
    };
    doc.select(&sel)
        .map(|el| FakeElement {
            text: el.text().collect::<Vec<_>>().join(" ").trim().to_string(),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
        .collect()
}
