//! `forage counts` — report the advertised item total per region without
//! harvesting anything.
//!
//! Reads the "맛집 (N곳)" banner from each list page.

use super::output;
use crate::profile::default_regions;
use crate::session::chromium::ChromiumAutomation;
use crate::session::{Automation, PageSession};
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::Arc;

const NAVIGATION_TIMEOUT_MS: u64 = 60_000;
const SETTLE_MS: u64 = 1_500;

/// Probe each configured region's advertised count.
pub async fn run() -> Result<()> {
    let automation = Arc::new(
        ChromiumAutomation::launch()
            .await
            .context("failed to launch browser")?,
    );
    let mut session = automation.new_session().await?;

    let banner = Regex::new(r"맛집\s*\((\d+)곳\)").unwrap();
    let mut results: Vec<(String, Option<u32>)> = Vec::new();

    for region in default_regions() {
        let count = match session.navigate(&region.url, NAVIGATION_TIMEOUT_MS).await {
            Ok(()) => {
                session.settle(SETTLE_MS).await;
                banner_count(session.as_ref(), &banner).await
            }
            Err(e) => {
                output::status(&format!("- {}: 확인 실패 ({e})", region.name));
                results.push((region.name.clone(), None));
                continue;
            }
        };

        match count {
            Some(n) => output::status(&format!("- {}: {n}", region.name)),
            None => output::status(&format!("- {}: 미확인", region.name)),
        }
        results.push((region.name.clone(), count));
    }

    let _ = session.close().await;
    let _ = automation.shutdown().await;

    if output::is_json() {
        let map: serde_json::Map<String, serde_json::Value> = results
            .into_iter()
            .map(|(name, count)| (name, serde_json::json!(count)))
            .collect();
        output::print_json(&map);
    }
    Ok(())
}

async fn banner_count(session: &dyn PageSession, banner: &Regex) -> Option<u32> {
    // Whole-page text first, then title-adjacent elements.
    let scripts = [
        "document.body && document.body.innerText",
        r#"Array.from(document.querySelectorAll('h1, h2, .title, .tit, .result'))
            .map(e => e.innerText).join('\n')"#,
    ];

    for script in scripts {
        let text = session
            .evaluate(script)
            .await
            .ok()
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default();
        if let Some(n) = banner
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            return Some(n);
        }
    }
    None
}
