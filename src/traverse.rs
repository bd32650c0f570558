//! Pagination traversal: materialize each list page, extract its links, and
//! advance until no next page is found or the page ceiling is hit.
//!
//! `LoadingPage → Materializing → ExtractingLinks → SeekingNext` and back,
//! with `Terminated` as the only exit. The ceiling bounds worst-case runtime
//! against pagination loops and mislabeled controls.

use crate::errors::HarvestError;
use crate::extract::{self, RawLink};
use crate::materialize;
use crate::profile::CatalogProfile;
use crate::session::{Interaction, PageSession};
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hard ceiling on page transitions per traversal run.
pub const MAX_PAGE_TRANSITIONS: usize = 200;

const NAVIGATION_TIMEOUT_MS: u64 = 60_000;
const RETRY_NAVIGATION_TIMEOUT_MS: u64 = 90_000;
const NEXT_CLICK_TIMEOUT_MS: u64 = 2_500;
const POST_TRANSITION_SETTLE_MS: u64 = 1_500;
const POST_LOAD_SETTLE_MS: u64 = 2_000;

/// Coordinator states; every page visit walks the full cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraversalState {
    LoadingPage,
    Materializing,
    ExtractingLinks,
    SeekingNext,
    Terminated,
}

/// What one traversal run produced.
#[derive(Debug)]
pub struct TraversalOutcome {
    /// Deduplicated links in first-discovery order.
    pub links: Vec<RawLink>,
    /// List pages visited.
    pub pages: usize,
}

/// Traverse a catalog's list pages from `start_url`, accumulating
/// deduplicated candidate links.
pub async fn collect_catalog_links(
    session: &mut dyn PageSession,
    profile: &CatalogProfile,
    start_url: &str,
) -> Result<TraversalOutcome, HarvestError> {
    // Initial load, with one slower retry for cold CDN responses.
    if let Err(e) = session.navigate(start_url, NAVIGATION_TIMEOUT_MS).await {
        warn!("initial load of {start_url} failed ({e}), retrying");
        session.settle(POST_TRANSITION_SETTLE_MS).await;
        session
            .navigate(start_url, RETRY_NAVIGATION_TIMEOUT_MS)
            .await?;
    }

    let strategies: [&dyn NextPageStrategy; 2] = [&NextControlStrategy, &NextLabelStrategy];

    let mut state = TraversalState::LoadingPage;
    let mut links: Vec<RawLink> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0usize;
    let mut transitions = 0usize;

    loop {
        state = match state {
            TraversalState::LoadingPage => {
                session.settle(POST_LOAD_SETTLE_MS).await;
                TraversalState::Materializing
            }
            TraversalState::Materializing => {
                let outcome = materialize::materialize_catalog(&*session, profile).await;
                debug!(
                    "page {} materialized: {} items ({} rounds, converged={})",
                    pages + 1,
                    outcome.item_count,
                    outcome.rounds,
                    outcome.converged
                );
                TraversalState::ExtractingLinks
            }
            TraversalState::ExtractingLinks => {
                let html = session.content().await.unwrap_or_default();
                let found = extract::extract_candidate_links(&html, profile);
                let added = merge_links(&mut links, &mut seen, found);
                pages += 1;
                debug!("page {pages}: {added} new links ({} total)", links.len());
                TraversalState::SeekingNext
            }
            TraversalState::SeekingNext => {
                if transitions >= MAX_PAGE_TRANSITIONS {
                    info!("page-transition ceiling reached after {pages} pages");
                    TraversalState::Terminated
                } else {
                    let mut moved = false;
                    for strategy in strategies {
                        if strategy.attempt(&mut *session, profile, start_url).await {
                            debug!("next page via '{}'", strategy.name());
                            moved = true;
                            break;
                        }
                    }
                    if moved {
                        transitions += 1;
                        session.settle(POST_TRANSITION_SETTLE_MS).await;
                        TraversalState::LoadingPage
                    } else {
                        TraversalState::Terminated
                    }
                }
            }
            TraversalState::Terminated => break,
        };
    }

    info!(
        "traversal of {start_url} finished: {} links over {pages} pages",
        links.len()
    );
    Ok(TraversalOutcome { links, pages })
}

/// Fold newly extracted links into the run-scoped set.
///
/// A link is kept when its URL is unseen in this traversal and its trimmed
/// name has at least two characters; first discovery wins.
fn merge_links(
    links: &mut Vec<RawLink>,
    seen: &mut HashSet<String>,
    found: Vec<RawLink>,
) -> usize {
    let mut added = 0;
    for link in found {
        let name = link.name.trim();
        if name.chars().count() < 2 {
            continue;
        }
        if seen.insert(link.url.clone()) {
            links.push(RawLink {
                name: name.to_string(),
                url: link.url,
            });
            added += 1;
        }
    }
    added
}

/// One way of advancing to the next list page.
#[async_trait]
trait NextPageStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns true when a page transition was performed.
    async fn attempt(
        &self,
        session: &mut dyn PageSession,
        profile: &CatalogProfile,
        base_url: &str,
    ) -> bool;
}

/// Explicit next controls: navigate via their target when present, click
/// otherwise.
struct NextControlStrategy;

#[async_trait]
impl NextPageStrategy for NextControlStrategy {
    fn name(&self) -> &'static str {
        "next-control"
    }

    async fn attempt(
        &self,
        session: &mut dyn PageSession,
        profile: &CatalogProfile,
        base_url: &str,
    ) -> bool {
        for locator in &profile.next_control_locators {
            let Some(el) = session.query_one(locator).await else {
                continue;
            };
            if !el.is_visible().await {
                continue;
            }

            if let Some(href) = el.attribute("href").await {
                let target = resolve_against(base_url, &href);
                match session.navigate(&target, NAVIGATION_TIMEOUT_MS).await {
                    Ok(()) => return true,
                    Err(e) => {
                        warn!("next-page navigation to {target} failed: {e}");
                        continue;
                    }
                }
            }
            if el.interact(Interaction::Click).await.is_ok() {
                return true;
            }
        }
        false
    }
}

/// Label-vocabulary click with a bounded timeout.
struct NextLabelStrategy;

#[async_trait]
impl NextPageStrategy for NextLabelStrategy {
    fn name(&self) -> &'static str {
        "next-label"
    }

    async fn attempt(
        &self,
        session: &mut dyn PageSession,
        profile: &CatalogProfile,
        _base_url: &str,
    ) -> bool {
        let script = materialize::label_click_script(&profile.next_label_vocab);
        let clicked = tokio::time::timeout(
            Duration::from_millis(NEXT_CLICK_TIMEOUT_MS),
            session.evaluate(&script),
        )
        .await;
        matches!(clicked, Ok(Ok(serde_json::Value::Bool(true))))
    }
}

fn resolve_against(base_url: &str, href: &str) -> String {
    match url::Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(name: &str, url: &str) -> RawLink {
        RawLink {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_merge_dedups_by_url_first_discovery_wins() {
        let mut links = Vec::new();
        let mut seen = HashSet::new();

        let added = merge_links(
            &mut links,
            &mut seen,
            vec![link("곰탕집", "https://x/P/1"), link("분식당", "https://x/P/2")],
        );
        assert_eq!(added, 2);

        // Second page repeats P/1 under a different name.
        let added = merge_links(
            &mut links,
            &mut seen,
            vec![link("곰탕집 본점", "https://x/P/1"), link("국밥집", "https://x/P/3")],
        );
        assert_eq!(added, 1);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].name, "곰탕집");
    }

    #[test]
    fn test_merge_rejects_short_names() {
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let added = merge_links(
            &mut links,
            &mut seen,
            vec![link(" x ", "https://x/P/1"), link("ab", "https://x/P/2")],
        );
        assert_eq!(added, 1);
        assert_eq!(links[0].name, "ab");
    }

    #[test]
    fn test_resolve_against_base() {
        assert_eq!(
            resolve_against("https://www.diningcode.com/list.dc?query=a", "/list.dc?page=2"),
            "https://www.diningcode.com/list.dc?page=2"
        );
        assert_eq!(
            resolve_against("not a url", "https://x/abs"),
            "https://x/abs"
        );
    }
}
