//! Site profile: the locators and label vocabularies that tie the generic
//! harvest engine to one catalog's markup conventions.
//!
//! Everything site-specific lives here as plain data so the materializer,
//! extractor, and traversal coordinator stay markup-agnostic.

use serde::{Deserialize, Serialize};

/// Locators and vocabularies for one catalog site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProfile {
    /// Base URL used to resolve relative detail links.
    pub base_url: String,
    /// Per-item index marker — the most stable item signal.
    pub item_index_locator: String,
    /// Per-item row marker — second counting signal.
    pub item_row_locator: String,
    /// Anchors whose target matches the detail-page URL shape, in priority order.
    pub detail_anchor_locators: Vec<String>,
    /// Title-like elements used when an item's anchor text is unusable.
    pub item_title_locator: String,
    /// Structural locators for the "reveal more" control.
    pub more_control_locators: Vec<String>,
    /// Label vocabulary for "more / load more" controls in the target locale.
    pub more_label_vocab: Vec<String>,
    /// Structural locators for the "next page" control.
    pub next_control_locators: Vec<String>,
    /// Label vocabulary for "next page" controls.
    pub next_label_vocab: Vec<String>,
    /// Candidate scrollable list containers for inner-container scrolling.
    pub list_region_locators: Vec<String>,
}

impl Default for CatalogProfile {
    fn default() -> Self {
        Self::diningcode()
    }
}

impl CatalogProfile {
    /// Profile for diningcode.com list + profile pages.
    pub fn diningcode() -> Self {
        Self {
            base_url: "https://www.diningcode.com".to_string(),
            item_index_locator: "[data-idx]".to_string(),
            item_row_locator: "div[data-v-rid]".to_string(),
            detail_anchor_locators: vec![
                r#"a[href*="/P/"]"#.to_string(),
                r#"a[href*="profile"]"#.to_string(),
            ],
            item_title_locator: ".name, .title, h3, h4".to_string(),
            more_control_locators: vec![
                ".btn_more".to_string(),
                ".more_btn".to_string(),
                ".load-more".to_string(),
                ".btn-load-more".to_string(),
                r#"button[onclick*="more"]"#.to_string(),
                r#"a[onclick*="more"]"#.to_string(),
                ".paging .more".to_string(),
                "#btn_more".to_string(),
                r#"[data-action*="more"]"#.to_string(),
            ],
            more_label_vocab: vec![
                "더보기".to_string(),
                "더 보기".to_string(),
                "더 많은".to_string(),
                "더 많이".to_string(),
                "계속 보기".to_string(),
                "추가 보기".to_string(),
                "more".to_string(),
                "load more".to_string(),
            ],
            next_control_locators: vec![
                r#"a[rel="next"]"#.to_string(),
                "a.next".to_string(),
                ".pagination a.next".to_string(),
                ".paging a.next".to_string(),
            ],
            next_label_vocab: vec![
                "다음".to_string(),
                "›".to_string(),
                ">".to_string(),
                "더보기".to_string(),
                "더 보기".to_string(),
            ],
            list_region_locators: vec![
                "#div_lf".to_string(),
                ".list-area".to_string(),
                ".left-area".to_string(),
                ".dc-list".to_string(),
                ".restaurant-list".to_string(),
                ".search-results".to_string(),
                ".area_lf".to_string(),
            ],
        }
    }

    /// Resolve a possibly-relative detail link against the catalog base URL.
    pub fn resolve_url(&self, href: &str) -> String {
        match url::Url::parse(&self.base_url).and_then(|base| base.join(href)) {
            Ok(u) => u.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

/// One configured catalog source (a list endpoint plus its labels).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Stable key used in link ids and file names (e.g. "namdaemun").
    pub key: String,
    /// Human-readable region name (e.g. "남대문").
    pub name: String,
    /// The list endpoint for this region.
    pub url: String,
}

/// The configured catalog sources: three districts around Seoul Station.
pub fn default_regions() -> Vec<Region> {
    vec![
        Region {
            key: "seoul_station".to_string(),
            name: "서울역".to_string(),
            url: "https://www.diningcode.com/list.dc?query=서울역".to_string(),
        },
        Region {
            key: "namdaemun".to_string(),
            name: "남대문".to_string(),
            url: "https://www.diningcode.com/list.dc?query=남대문".to_string(),
        },
        Region {
            key: "hoehyeon".to_string(),
            name: "회현역".to_string(),
            url: "https://www.diningcode.com/list.dc?query=회현역".to_string(),
        },
    ]
}

/// Find the configured region matching a list URL, if any.
pub fn region_for_url<'a>(regions: &'a [Region], url: &str) -> Option<&'a Region> {
    regions.iter().find(|r| r.url == url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_href() {
        let profile = CatalogProfile::diningcode();
        assert_eq!(
            profile.resolve_url("/P/12345"),
            "https://www.diningcode.com/P/12345"
        );
    }

    #[test]
    fn test_resolve_absolute_href_unchanged() {
        let profile = CatalogProfile::diningcode();
        assert_eq!(
            profile.resolve_url("https://www.diningcode.com/P/9"),
            "https://www.diningcode.com/P/9"
        );
    }

    #[test]
    fn test_region_lookup() {
        let regions = default_regions();
        let hit = region_for_url(&regions, "https://www.diningcode.com/list.dc?query=남대문");
        assert_eq!(hit.map(|r| r.key.as_str()), Some("namdaemun"));
        assert!(region_for_url(&regions, "https://example.com/").is_none());
    }
}
