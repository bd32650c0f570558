//! Record types flowing through the harvest pipeline.
//!
//! `CandidateReference` is what enumeration produces (one JSONL line per
//! manifest entry); `DetailRecord` is what resolution produces (one JSONL
//! line per resolved item). Both are immutable once created — a failed
//! resolution yields no record at all, never a partially-filled one.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Schema version stamped into the run metadata artifact.
pub const SCHEMA_VERSION: &str = "1.0";

/// Identifier of the upstream catalog.
pub const DATA_SOURCE: &str = "diningcode";

/// One enumerated candidate awaiting detail resolution.
///
/// Field names match the persisted manifest format. Uniqueness within a
/// traversal run is by `url`, not by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReference {
    /// Per-region sequence id, e.g. "namdaemun_0007".
    pub link_id: String,
    /// Human-readable region name.
    pub region: String,
    /// Stable region key.
    pub region_key: String,
    /// Display name as discovered on the list page.
    pub name: String,
    /// Absolute detail-page URL.
    pub url: String,
    /// RFC 3339 enumeration timestamp.
    pub collected_at: String,
}

impl CandidateReference {
    /// Tag a raw (name, url) pair with its region and sequence number.
    pub fn new(region: &crate::profile::Region, seq: usize, name: &str, url: &str) -> Self {
        Self {
            link_id: format!("{}_{:04}", region.key, seq),
            region: region.name.clone(),
            region_key: region.key.clone(),
            name: name.to_string(),
            url: url.to_string(),
            collected_at: Local::now().to_rfc3339(),
        }
    }
}

/// The resolved record for one reference — the unified datamart row.
///
/// `rating` is `None` when the source never exposed one; the original
/// feed used 0.0 for both "zero" and "not observed", which is kept apart
/// here on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRecord {
    pub restaurant_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub category: String,
    pub food_genre: String,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub location_description: String,
    pub distance_from_office_m: u32,
    pub walking_time_min: u32,
    pub is_walkable: bool,
    pub distance_category: String,
    pub signature_menu: String,
    pub menu_info: String,
    pub price_range: String,
    pub business_hours: String,
    pub image_url: String,
    pub url: String,
    pub naver_map_link: String,
    pub data_source: String,
    pub last_updated: String,
    pub data_quality_score: f64,
    pub first_review: String,
    /// Provenance carried over from the manifest entry.
    pub link_id: String,
    pub region_key: String,
}

/// Run-scoped monotonic identity counter for `restaurant_id`.
///
/// Threaded explicitly through record construction rather than living as
/// ambient global state; cloning shares the underlying counter so all
/// workers draw from one sequence.
#[derive(Debug, Clone, Default)]
pub struct RecordSequence(Arc<AtomicU32>);

impl RecordSequence {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    /// Next identity: `REST_{n:04}_{sanitized name}`.
    pub fn next_id(&self, name: &str) -> String {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        let sanitized = if name.trim().is_empty() {
            "unknown".to_string()
        } else {
            name.trim().replace(' ', "_")
        };
        format!("REST_{n:04}_{sanitized}")
    }
}

/// Aggregate outcome of a resolution phase.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique id of this run.
    pub run_id: String,
    /// Number of manifest entries attempted.
    pub total: usize,
    /// Number of references successfully resolved.
    pub resolved: usize,
    /// resolved / total, in [0, 1]; 1.0 for an empty manifest.
    pub success_rate: f64,
    /// Wall-clock duration of the resolution phase.
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn new(run_id: String, total: usize, resolved: usize, elapsed_ms: u64) -> Self {
        let success_rate = if total == 0 {
            1.0
        } else {
            resolved as f64 / total as f64
        };
        Self {
            run_id,
            total,
            resolved,
            success_rate,
            elapsed_ms,
        }
    }
}

/// Everything a finished harvest produces: records plus run metadata.
#[derive(Debug)]
pub struct HarvestResult {
    pub records: Vec<DetailRecord>,
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Region;

    fn region() -> Region {
        Region {
            key: "namdaemun".to_string(),
            name: "남대문".to_string(),
            url: "https://www.diningcode.com/list.dc?query=남대문".to_string(),
        }
    }

    #[test]
    fn test_link_id_format() {
        let r = CandidateReference::new(&region(), 7, "한식당", "https://example.com/P/7");
        assert_eq!(r.link_id, "namdaemun_0007");
        assert_eq!(r.region, "남대문");
    }

    #[test]
    fn test_record_sequence_monotonic() {
        let seq = RecordSequence::new();
        assert_eq!(seq.next_id("곰탕 집"), "REST_0001_곰탕_집");
        assert_eq!(seq.next_id(""), "REST_0002_unknown");
        // A clone draws from the same sequence.
        assert_eq!(seq.clone().next_id("x"), "REST_0003_x");
    }

    #[test]
    fn test_success_rate_bounds() {
        assert_eq!(RunSummary::new("r".into(), 0, 0, 0).success_rate, 1.0);
        let s = RunSummary::new("r".into(), 3, 2, 10);
        assert!((s.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
