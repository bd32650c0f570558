//! `forage enumerate` — phase 1 only: collect candidate links into a manifest.

use super::output;
use crate::pipeline::{HarvestPipeline, PipelineConfig, DEFAULT_WORKERS};
use crate::profile::{default_regions, CatalogProfile};
use crate::session::chromium::ChromiumAutomation;
use crate::session::Automation;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Enumerate all regions and persist the manifest.
pub async fn run(out: &str) -> Result<()> {
    let automation = Arc::new(
        ChromiumAutomation::launch()
            .await
            .context("failed to launch browser")?,
    );

    let config = PipelineConfig {
        workers: DEFAULT_WORKERS,
        manifest_path: PathBuf::from(out),
        ..PipelineConfig::default()
    };

    let pipeline = HarvestPipeline::new(
        automation.clone(),
        CatalogProfile::default(),
        default_regions(),
        config,
        None,
    );

    let refs = pipeline.enumerate().await;
    let _ = automation.shutdown().await;
    let refs = refs.context("enumeration failed")?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "links": refs.len(),
            "manifest": out,
        }));
    } else {
        output::status(&format!("[PHASE 1 COMPLETE] {} links -> {out}", refs.len()));
    }
    Ok(())
}
