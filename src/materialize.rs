//! Materialization: drive a dynamically-loaded list to its stable, maximal
//! state.
//!
//! The source never says when it has no more items, so completion is
//! inferred from sustained non-growth: a round that fails to raise the item
//! count increments a stability counter, and enough consecutive quiet rounds
//! end the loop. Exhausting the round cap is a normal, reported outcome,
//! not an error.

use crate::profile::CatalogProfile;
use crate::session::{Interaction, PageSession};
use async_trait::async_trait;
use tracing::{debug, info};

/// Hard cap on reveal/scroll rounds.
pub const MAX_ROUNDS: usize = 1000;

/// Consecutive non-growing rounds before the list is considered complete.
/// The target total is always unknown here, so one constant suffices.
pub const STABLE_ROUNDS: usize = 30;

const INITIAL_QUIESCENCE_MS: u64 = 30_000;
const POST_REVEAL_SETTLE_MS: u64 = 3_000;
const POST_REVEAL_QUIESCENCE_MS: u64 = 15_000;
const POST_SCROLL_SETTLE_MS: u64 = 2_000;

/// Terminal state of one materialization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOutcome {
    /// Item count at termination (peak observed when converged).
    pub item_count: usize,
    /// Rounds executed.
    pub rounds: usize,
    /// Whether the count stabilized before the round cap.
    pub converged: bool,
}

/// Estimate how many catalog items are currently materialized.
///
/// Tries three structural signals in priority order and uses the first one
/// yielding a positive count, so an absent marker convention cannot produce
/// a false zero while another convention is present.
pub async fn count_items(session: &dyn PageSession, profile: &CatalogProfile) -> usize {
    let n = session.query_all(&profile.item_index_locator).await.len();
    if n > 0 {
        return n;
    }

    let n = session.query_all(&profile.item_row_locator).await.len();
    if n > 0 {
        return n;
    }

    for locator in &profile.detail_anchor_locators {
        let n = session.query_all(locator).await.len();
        if n > 0 {
            return n;
        }
    }
    0
}

/// One way of activating the "reveal more" affordance.
#[async_trait]
pub trait RevealStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns true when an interaction was performed.
    async fn attempt(&self, session: &dyn PageSession, profile: &CatalogProfile) -> bool;
}

/// Structural locators for the reveal control.
struct ControlLocatorReveal;

#[async_trait]
impl RevealStrategy for ControlLocatorReveal {
    fn name(&self) -> &'static str {
        "control-locator"
    }

    async fn attempt(&self, session: &dyn PageSession, profile: &CatalogProfile) -> bool {
        for locator in &profile.more_control_locators {
            for el in session.query_all(locator).await {
                if el.is_visible().await && el.interact(Interaction::Click).await.is_ok() {
                    debug!("reveal control clicked via {locator}");
                    return true;
                }
            }
        }
        false
    }
}

/// Exact label matching against the "more" vocabulary.
struct LabelVocabReveal;

#[async_trait]
impl RevealStrategy for LabelVocabReveal {
    fn name(&self) -> &'static str {
        "label-vocab"
    }

    async fn attempt(&self, session: &dyn PageSession, profile: &CatalogProfile) -> bool {
        let script = label_click_script(&profile.more_label_vocab);
        matches!(
            session.evaluate(&script).await,
            Ok(serde_json::Value::Bool(true))
        )
    }
}

/// Last resort: synthetic click on any visible clickable element whose text
/// contains a vocabulary phrase.
struct SyntheticClickReveal;

#[async_trait]
impl RevealStrategy for SyntheticClickReveal {
    fn name(&self) -> &'static str {
        "synthetic-click"
    }

    async fn attempt(&self, session: &dyn PageSession, profile: &CatalogProfile) -> bool {
        let script = synthetic_click_script(&profile.more_label_vocab);
        matches!(
            session.evaluate(&script).await,
            Ok(serde_json::Value::Bool(true))
        )
    }
}

fn js_string_array(labels: &[String]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn label_click_script(labels: &[String]) -> String {
    format!(
        r#"(() => {{
            const labels = {labels};
            const nodes = Array.from(document.querySelectorAll('button, a, div, span'));
            for (const el of nodes) {{
                if (!el.offsetParent) continue;
                const text = (el.innerText || el.textContent || '').trim();
                if (labels.some(l => text === l || text.startsWith(l + ' '))) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()"#,
        labels = js_string_array(labels)
    )
}

fn synthetic_click_script(labels: &[String]) -> String {
    let lowered: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    format!(
        r#"(() => {{
            const patterns = {labels};
            const elements = Array.from(document.querySelectorAll('*'));
            for (const el of elements) {{
                if (!el.offsetParent) continue;
                const text = (el.innerText || el.textContent || '').trim().toLowerCase();
                const clickable = el.tagName === 'BUTTON' || el.tagName === 'A' ||
                                  el.onclick || el.getAttribute('onclick') ||
                                  window.getComputedStyle(el).cursor === 'pointer';
                if (clickable && patterns.some(p => text.includes(p))) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()"#,
        labels = js_string_array(&lowered)
    )
}

/// Scroll-simulation fallback for infinite-scroll lists; every step is
/// best-effort.
async fn simulate_scroll(session: &dyn PageSession, profile: &CatalogProfile) {
    // Whole-document scrolls, several flavors for stubborn layouts.
    let document_scrolls = [
        "window.scrollTo(0, document.body.scrollHeight)",
        "window.scrollTo(0, document.documentElement.scrollHeight)",
        "document.documentElement.scrollTop = document.documentElement.scrollHeight",
        "window.scrollBy(0, window.innerHeight * 3)",
    ];
    for script in document_scrolls {
        let _ = session.evaluate(script).await;
        session.settle(800).await;
    }

    // Inner scroll of the first list container that exists.
    for locator in &profile.list_region_locators {
        if let Some(el) = session.query_one(locator).await {
            let _ = el.interact(Interaction::ScrollIntoView).await;
            let _ = el.interact(Interaction::Hover).await;
            let selector = serde_json::to_string(locator).unwrap_or_default();
            let script = format!(
                r#"(() => {{
                    const el = document.querySelector({selector});
                    if (!el) return false;
                    for (let i = 0; i < 5; i++) el.scrollBy(0, el.clientHeight);
                    return true;
                }})()"#
            );
            let _ = session.evaluate(&script).await;
            break;
        }
    }

    // Key-driven scroll.
    let _ = session
        .evaluate(
            r#"['End', 'PageDown'].forEach(key =>
                document.body.dispatchEvent(new KeyboardEvent('keydown', {key, bubbles: true})))"#,
        )
        .await;

    // Wheel simulation.
    let _ = session
        .evaluate(
            r#"(() => {
                window.dispatchEvent(new WheelEvent('wheel', {deltaY: 2000, bubbles: true}));
                window.scrollBy(0, 2000);
            })()"#,
        )
        .await;
}

/// Drive the list to a stable, maximal materialized state.
///
/// Never errors: a failed interaction just falls through to scrolling, and
/// hitting the round cap is reported through the outcome.
pub async fn materialize_catalog(
    session: &dyn PageSession,
    profile: &CatalogProfile,
) -> MaterializeOutcome {
    let _ = session.wait_for_quiescence(INITIAL_QUIESCENCE_MS).await;

    let strategies: [&dyn RevealStrategy; 3] =
        [&ControlLocatorReveal, &LabelVocabReveal, &SyntheticClickReveal];

    let mut stable_rounds = 0usize;
    let mut rounds = 0usize;
    let mut peak = 0usize;
    let mut last = 0usize;

    while rounds < MAX_ROUNDS {
        rounds += 1;
        let before = count_items(session, profile).await;
        peak = peak.max(before);

        let mut revealed = false;
        for strategy in strategies {
            if strategy.attempt(session, profile).await {
                debug!("reveal via '{}' at {} items", strategy.name(), before);
                revealed = true;
                break;
            }
        }

        if revealed {
            session.settle(POST_REVEAL_SETTLE_MS).await;
            let _ = session.wait_for_quiescence(POST_REVEAL_QUIESCENCE_MS).await;
        } else {
            simulate_scroll(session, profile).await;
            session.settle(POST_SCROLL_SETTLE_MS).await;
        }

        let after = count_items(session, profile).await;
        peak = peak.max(after);
        last = after;

        if after > before {
            debug!("materialized {before} -> {after} (+{})", after - before);
            stable_rounds = 0;
        } else {
            stable_rounds += 1;
        }

        if rounds % 20 == 0 {
            info!("materialize round {rounds}: {after} items");
        }

        if stable_rounds >= STABLE_ROUNDS {
            info!("list stabilized at {peak} items after {rounds} rounds");
            return MaterializeOutcome {
                item_count: peak,
                rounds,
                converged: true,
            };
        }
    }

    info!("materialize round cap reached at {last} items");
    MaterializeOutcome {
        item_count: last,
        rounds,
        converged: false,
    }
}
