//! Final run artifacts: the record log and the metadata summary.
//!
//! Records go out as UTF-8 JSONL — one object per line, no enclosing array —
//! so downstream consumers can stream and append. The metadata artifact is a
//! single JSON document summarizing the run.

use crate::classify;
use crate::errors::HarvestError;
use crate::records::{DetailRecord, RunSummary, SCHEMA_VERSION};
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Run-level metadata summarizing counts by classification bucket.
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    pub total_restaurants: usize,
    pub data_quality_distribution: BTreeMap<String, usize>,
    pub food_genre_distribution: BTreeMap<String, usize>,
    pub distance_distribution: BTreeMap<String, usize>,
    pub success_rate: f64,
    pub run_id: String,
    pub created_at: String,
    pub schema_version: String,
}

/// Summarize resolved records into the metadata artifact.
pub fn build_metadata(records: &[DetailRecord], summary: &RunSummary) -> RunMetadata {
    let mut quality: BTreeMap<String, usize> = BTreeMap::new();
    for bucket in ["excellent", "good", "fair", "poor"] {
        quality.insert(bucket.to_string(), 0);
    }
    let mut genres: BTreeMap<String, usize> = BTreeMap::new();
    let mut distances: BTreeMap<String, usize> = BTreeMap::new();

    for r in records {
        *quality
            .entry(classify::quality_bucket(r.data_quality_score).to_string())
            .or_insert(0) += 1;
        *genres.entry(r.food_genre.clone()).or_insert(0) += 1;
        *distances.entry(r.distance_category.clone()).or_insert(0) += 1;
    }

    RunMetadata {
        total_restaurants: records.len(),
        data_quality_distribution: quality,
        food_genre_distribution: genres,
        distance_distribution: distances,
        success_rate: summary.success_rate,
        run_id: summary.run_id.clone(),
        created_at: Local::now().to_rfc3339(),
        schema_version: SCHEMA_VERSION.to_string(),
    }
}

/// Write the final record log. Failure here is fatal to the run.
pub fn write_records(path: &Path, records: &[DetailRecord]) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    for r in records {
        let line = serde_json::to_string(r)?;
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    info!("{} records written to {}", records.len(), path.display());
    Ok(())
}

/// Write the metadata artifact next to the record log.
pub fn write_metadata(path: &Path, metadata: &RunMetadata) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)?;
    info!("run metadata written to {}", path.display());
    Ok(())
}
