//! Tiered link extraction from a materialized list view.
//!
//! Strategies are tried in priority order against the page's HTML snapshot;
//! the first tier producing any links wins and later tiers are not consulted.
//! Tiers never merge — mixing a precise tier with a broad one would reorder
//! and duplicate the precise results.

pub mod detail;
pub mod structured;

use crate::profile::CatalogProfile;
use scraper::{Html, Selector};
use tracing::debug;

/// Maximum usable anchor-text length; beyond this the anchor almost
/// certainly matched a whole card, not the item title.
const NAME_LEN_CEILING: usize = 50;

/// A (display name, detail URL) pair as discovered on a list page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLink {
    pub name: String,
    pub url: String,
}

/// One extraction strategy in the fallback chain.
pub trait LinkTier {
    fn name(&self) -> &'static str;
    fn attempt(&self, doc: &Html, profile: &CatalogProfile) -> Vec<RawLink>;
}

/// Extract candidate links from a materialized page, first productive tier wins.
pub fn extract_candidate_links(html: &str, profile: &CatalogProfile) -> Vec<RawLink> {
    let doc = Html::parse_document(html);
    let tiers: [&dyn LinkTier; 3] = [&IndexMarkerTier, &GenericLocatorTier, &StructuredDataTier];

    for tier in tiers {
        let links = tier.attempt(&doc, profile);
        if !links.is_empty() {
            debug!("tier '{}' extracted {} links", tier.name(), links.len());
            return links;
        }
    }

    debug!("no extraction tier produced links");
    Vec::new()
}

fn parse_selector(locator: &str) -> Option<Selector> {
    Selector::parse(locator).ok()
}

/// Anchor text is unusable when empty, implausibly long, or spanning lines
/// (a strong signal the anchor wraps the whole item card).
fn usable_name(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= NAME_LEN_CEILING && !trimmed.contains('\n')
}

fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Tier 1: items carrying the per-item index marker, detail anchor inside.
struct IndexMarkerTier;

impl LinkTier for IndexMarkerTier {
    fn name(&self) -> &'static str {
        "index-marker"
    }

    fn attempt(&self, doc: &Html, profile: &CatalogProfile) -> Vec<RawLink> {
        let Some(item_sel) = parse_selector(&profile.item_index_locator) else {
            return Vec::new();
        };
        let title_sel = parse_selector(&profile.item_title_locator);
        let mut links = Vec::new();

        for item in doc.select(&item_sel) {
            let anchor = profile
                .detail_anchor_locators
                .iter()
                .filter_map(|loc| parse_selector(loc))
                .find_map(|sel| item.select(&sel).next());
            let Some(anchor) = anchor else { continue };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };

            let mut name = element_text(&anchor);
            if !usable_name(&name) {
                // The anchor matched the wrong element; fall back to a
                // title-like descendant.
                if let Some(ref sel) = title_sel {
                    if let Some(title) = item.select(sel).next() {
                        name = element_text(&title);
                    }
                }
            }

            if !name.trim().is_empty() {
                links.push(RawLink {
                    name: name.trim().to_string(),
                    url: profile.resolve_url(href),
                });
            }
        }

        links
    }
}

/// Tier 2: broader locator patterns, no index marker required.
struct GenericLocatorTier;

impl LinkTier for GenericLocatorTier {
    fn name(&self) -> &'static str {
        "generic-locator"
    }

    fn attempt(&self, doc: &Html, profile: &CatalogProfile) -> Vec<RawLink> {
        let mut locators: Vec<String> = profile.detail_anchor_locators.clone();
        locators.push(format!("{} a", profile.item_row_locator));

        let mut links = Vec::new();
        for locator in &locators {
            let Some(sel) = parse_selector(locator) else {
                continue;
            };
            for anchor in doc.select(&sel) {
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let name = element_text(&anchor);
                if name.chars().count() >= 2 {
                    links.push(RawLink {
                        name,
                        url: profile.resolve_url(href),
                    });
                }
            }
        }

        links
    }
}

/// Tier 3: list entries declared in embedded structured-data blocks.
struct StructuredDataTier;

impl LinkTier for StructuredDataTier {
    fn name(&self) -> &'static str {
        "structured-data"
    }

    fn attempt(&self, doc: &Html, profile: &CatalogProfile) -> Vec<RawLink> {
        structured::list_items(doc)
            .into_iter()
            .filter(|item| !item.name.trim().is_empty())
            .map(|item| RawLink {
                name: item.name.trim().to_string(),
                url: profile.resolve_url(&item.url),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CatalogProfile {
        CatalogProfile::diningcode()
    }

    #[test]
    fn test_index_marker_tier_wins_over_others() {
        // Tier 1 material ([data-idx] + anchor), plus a loose anchor and a
        // JSON-LD block that tiers 2/3 would pick up.
        let html = r#"
        <html><head>
        <script type="application/ld+json">
        {"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {"name": "JSONLD만의 집", "url": "https://www.diningcode.com/P/99"}}]}
        </script>
        </head><body>
        <div data-idx="1"><a href="/P/1">곰탕집</a></div>
        <div data-idx="2"><a href="/P/2">분식당</a></div>
        <a href="/P/77">틈새 링크</a>
        </body></html>
        "#;

        let links = extract_candidate_links(html, &profile());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].name, "곰탕집");
        assert_eq!(links[0].url, "https://www.diningcode.com/P/1");
        assert!(links.iter().all(|l| !l.url.ends_with("/P/99")));
        assert!(links.iter().all(|l| !l.url.ends_with("/P/77")));
    }

    #[test]
    fn test_index_marker_name_fallback_on_card_anchor() {
        // Anchor text spans the whole card (multi-line) — the title element
        // must be used instead.
        let html = r#"
        <html><body>
        <div data-idx="1">
          <a href="/P/1">1. 곰탕집
4.5점 리뷰 120개
서울 중구</a>
          <h3>곰탕집</h3>
        </div>
        </body></html>
        "#;

        let links = extract_candidate_links(html, &profile());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "곰탕집");
    }

    #[test]
    fn test_generic_tier_when_markers_absent() {
        let html = r#"
        <html><body>
        <ul>
          <li><a href="/P/10">국밥 한그릇</a></li>
          <li><a href="/P/11">x</a></li>
        </ul>
        </body></html>
        "#;

        let links = extract_candidate_links(html, &profile());
        // Single-character names are rejected in this tier.
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://www.diningcode.com/P/10");
    }

    #[test]
    fn test_structured_tier_as_last_resort() {
        let html = r#"
        <html><head>
        <script type="application/ld+json">
        {"@type": "ItemList", "itemListElement": [
          {"@type": "ListItem", "item": {"name": "제이슨의 집", "url": "/P/42"}}]}
        </script>
        </head><body><p>no anchors here</p></body></html>
        "#;

        let links = extract_candidate_links(html, &profile());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "제이슨의 집");
        assert_eq!(links[0].url, "https://www.diningcode.com/P/42");
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        assert!(extract_candidate_links("<html><body></body></html>", &profile()).is_empty());
    }
}
