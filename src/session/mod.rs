//! Browser capability interface consumed by the harvest engine.
//!
//! Defines the `Automation`, `PageSession`, and `ElementHandle` traits that
//! abstract over the browser engine (currently Chromium via chromiumoxide).
//! The engine only ever talks to these traits, so tests drive it with a
//! scripted in-memory implementation instead of a real browser.

pub mod chromium;

use crate::errors::HarvestError;
use async_trait::async_trait;

/// Synthetic interactions a session can perform on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Click,
    Hover,
    ScrollIntoView,
}

/// A browser engine that can open page sessions.
#[async_trait]
pub trait Automation: Send + Sync {
    /// Open a new page session (tab).
    async fn new_session(&self) -> Result<Box<dyn PageSession>, HarvestError>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<(), HarvestError>;
    /// Number of currently open sessions.
    fn active_sessions(&self) -> usize;
}

/// One controllable document view.
///
/// Query methods never fail on zero matches — `query_all` returns an empty
/// sequence and `query_one` returns `None`, so fallback chains can probe
/// locators freely.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to a URL, waiting for the document to load, bounded by `timeout_ms`.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), HarvestError>;

    /// All elements matching a CSS locator (empty on no match).
    async fn query_all(&self, locator: &str) -> Vec<Box<dyn ElementHandle>>;

    /// First element matching a CSS locator, if any.
    async fn query_one(&self, locator: &str) -> Option<Box<dyn ElementHandle>>;

    /// Execute read-only script against the rendered document.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, HarvestError>;

    /// Wait until pending network/render activity has settled, bounded by `timeout_ms`.
    async fn wait_for_quiescence(&self, timeout_ms: u64) -> Result<(), HarvestError>;

    /// Unconditional bounded pause, used for post-interaction settling and
    /// rate shaping. Scripted test sessions override this to return
    /// immediately.
    async fn settle(&self, ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }

    /// Full HTML snapshot of the current document.
    async fn content(&self) -> Result<String, HarvestError>;

    /// Current document URL (empty if unavailable).
    async fn current_url(&self) -> String;

    /// Document title (empty if unavailable).
    async fn title(&self) -> String;

    /// Close the session, releasing its browser resources.
    async fn close(self: Box<Self>) -> Result<(), HarvestError>;
}

/// Handle to one rendered element.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Visible text content (empty string if unreadable).
    async fn text(&self) -> String;

    /// Attribute value, if present.
    async fn attribute(&self, name: &str) -> Option<String>;

    /// Whether the element participates in layout (offsetParent check).
    async fn is_visible(&self) -> bool;

    /// Perform a synthetic interaction on this element.
    async fn interact(&self, kind: Interaction) -> Result<(), HarvestError>;
}
