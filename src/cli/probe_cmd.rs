//! `forage probe` — resolve a single item and print it as JSON.
//!
//! Either probes the first item of a list page (`--url`, defaulting to the
//! first configured region) or resolves one detail page directly
//! (`--detail`).

use super::output;
use crate::extract;
use crate::materialize;
use crate::pipeline;
use crate::profile::{default_regions, region_for_url, CatalogProfile, Region};
use crate::records::{CandidateReference, RecordSequence};
use crate::session::chromium::ChromiumAutomation;
use crate::session::{Automation, PageSession};
use anyhow::{Context, Result};
use std::sync::Arc;

const NAVIGATION_TIMEOUT_MS: u64 = 60_000;
const PROBE_SETTLE_MS: u64 = 1_200;

/// Run a single-item probe.
pub async fn run(url: Option<&str>, detail: Option<&str>) -> Result<()> {
    let automation = Arc::new(
        ChromiumAutomation::launch()
            .await
            .context("failed to launch browser")?,
    );

    let result = if let Some(detail_url) = detail {
        probe_detail(automation.as_ref(), detail_url).await
    } else {
        probe_first_item(automation.as_ref(), url).await
    };
    let _ = automation.shutdown().await;

    match result? {
        Some(record) => output::print_json(&record),
        None => println!("{{}}"),
    }
    Ok(())
}

/// Resolve one detail URL directly, guessing the name from the page title.
async fn probe_detail(
    automation: &dyn Automation,
    detail_url: &str,
) -> Result<Option<crate::records::DetailRecord>> {
    let mut session = automation.new_session().await?;

    let outcome = async {
        session.navigate(detail_url, NAVIGATION_TIMEOUT_MS).await?;
        session.settle(PROBE_SETTLE_MS).await;

        let title = session.title().await;
        let name_guess = title.split('-').next().unwrap_or("").trim().to_string();

        let reference = probe_reference(&name_guess, detail_url, "");
        let record =
            pipeline::resolve_one(session.as_mut(), &reference, &RecordSequence::new()).await?;
        Ok::<_, crate::errors::HarvestError>(Some(record))
    }
    .await;

    let _ = session.close().await;
    Ok(outcome?)
}

/// Materialize a list page and resolve its first discovered item.
async fn probe_first_item(
    automation: &dyn Automation,
    list_url: Option<&str>,
) -> Result<Option<crate::records::DetailRecord>> {
    let regions = default_regions();
    let profile = CatalogProfile::default();
    let target_url = list_url
        .map(|u| u.to_string())
        .unwrap_or_else(|| regions[0].url.clone());
    let region_name = region_for_url(&regions, &target_url)
        .map(|r| r.name.clone())
        .unwrap_or_default();

    let mut session = automation.new_session().await?;

    let outcome = async {
        session.navigate(&target_url, NAVIGATION_TIMEOUT_MS).await?;
        session.settle(PROBE_SETTLE_MS).await;
        materialize::materialize_catalog(session.as_ref(), &profile).await;

        let html = session.content().await.unwrap_or_default();
        let Some(link) = extract::extract_candidate_links(&html, &profile).into_iter().next()
        else {
            return Ok(None);
        };

        let reference = probe_reference(&link.name, &link.url, &region_name);
        let record =
            pipeline::resolve_one(session.as_mut(), &reference, &RecordSequence::new()).await?;
        Ok::<_, crate::errors::HarvestError>(Some(record))
    }
    .await;

    let _ = session.close().await;
    Ok(outcome?)
}

fn probe_reference(name: &str, url: &str, region_name: &str) -> CandidateReference {
    let region = Region {
        key: "probe".to_string(),
        name: region_name.to_string(),
        url: String::new(),
    };
    CandidateReference::new(&region, 1, name, url)
}
