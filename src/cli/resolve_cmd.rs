//! `forage resolve` — phase 2 only: resolve details from an existing manifest.

use super::output;
use crate::pipeline::{HarvestPipeline, PipelineConfig};
use crate::profile::{default_regions, CatalogProfile};
use crate::progress;
use crate::session::chromium::ChromiumAutomation;
use crate::session::Automation;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Resolve an existing manifest across the worker pool.
pub async fn run(manifest: &str, workers: usize, out: &str, metadata: &str) -> Result<()> {
    let automation = Arc::new(
        ChromiumAutomation::launch()
            .await
            .context("failed to launch browser")?,
    );

    let config = PipelineConfig {
        workers,
        manifest_path: PathBuf::from(manifest),
        output_path: PathBuf::from(out),
        metadata_path: PathBuf::from(metadata),
    };

    let show_bars = !output::is_quiet() && !output::is_json();
    let (tx, rx) = progress::channel();
    let ui = if show_bars {
        Some(tokio::spawn(super::drive_progress_bars(rx)))
    } else {
        drop(rx);
        None
    };

    let pipeline = HarvestPipeline::new(
        automation.clone(),
        CatalogProfile::default(),
        default_regions(),
        config,
        Some(tx),
    );

    let result = pipeline.resolve_from_manifest().await;
    drop(pipeline);
    if let Some(ui) = ui {
        let _ = ui.await;
    }
    let _ = automation.shutdown().await;

    let result = result.context("resolution failed")?;

    if output::is_json() {
        output::print_json(&result.summary);
    } else {
        output::status(&format!(
            "[PHASE 2 COMPLETE] {}/{} resolved ({:.1}%) -> {out}",
            result.summary.resolved,
            result.summary.total,
            result.summary.success_rate * 100.0
        ));
    }
    Ok(())
}
