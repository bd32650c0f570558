//! Error taxonomy for the harvest engine.
//!
//! Per-item and per-interaction failures are downgraded to skip-and-log at
//! the smallest enclosing scope; only persistence failures on the final
//! output (and configuration errors such as a missing manifest) abort a run.

use std::time::Duration;

/// All failure modes of a harvest run.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Timeout or network failure reaching a URL.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Target control not found, not visible, or not clickable.
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// No extraction tier produced a usable result.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// In-page script evaluation failed.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// Quiescence (or another bounded wait) not reached within budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Manifest or output read/write failure.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for HarvestError {
    fn from(e: std::io::Error) -> Self {
        HarvestError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(e: serde_json::Error) -> Self {
        HarvestError::Persistence(e.to_string())
    }
}
