//! Two-phase partitioned harvest pipeline.
//!
//! Phase 1 enumerates every configured region into a persisted manifest;
//! phase 2 partitions the manifest across independent workers, each owning
//! its own browser session, and aggregates resolved records through an mpsc
//! channel with a single consuming task. Tokio schedules workers
//! preemptively across await points, so the channel is the explicit
//! synchronization discipline around the shared result collection.

use crate::classify;
use crate::errors::HarvestError;
use crate::extract::detail::{self, DetailFields};
use crate::manifest;
use crate::output;
use crate::profile::{CatalogProfile, Region};
use crate::progress::{HarvestEventKind, HarvestPhase, ProgressContext};
use crate::records::{
    CandidateReference, DetailRecord, HarvestResult, RecordSequence, RunSummary, DATA_SOURCE,
};
use crate::session::{Automation, PageSession};
use crate::traverse;
use chrono::Local;
use rand::Rng;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Default resolution worker count.
pub const DEFAULT_WORKERS: usize = 2;

const DETAIL_NAVIGATION_TIMEOUT_MS: u64 = 60_000;
const DETAIL_SETTLE_MS: u64 = 400;
const JITTER_MIN_MS: u64 = 200;
const JITTER_MAX_MS: u64 = 500;

/// File locations and worker count for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub manifest_path: PathBuf,
    pub output_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            manifest_path: PathBuf::from("phase1_links.jsonl"),
            output_path: PathBuf::from("unified_restaurant_datamart.jsonl"),
            metadata_path: PathBuf::from("datamart_metadata.json"),
        }
    }
}

/// Split `len` manifest entries into `workers` contiguous partitions.
///
/// Pure: `floor(len / workers)` each, with the final partition absorbing the
/// remainder. The union of all partitions is exactly the input range.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let size = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * size;
            let end = if i == workers - 1 { len } else { start + size };
            start..end
        })
        .collect()
}

/// Orchestrates enumeration, resolution, and artifact writes for one run.
pub struct HarvestPipeline {
    automation: Arc<dyn Automation>,
    profile: Arc<CatalogProfile>,
    regions: Vec<Region>,
    config: PipelineConfig,
    progress: ProgressContext,
}

impl HarvestPipeline {
    pub fn new(
        automation: Arc<dyn Automation>,
        profile: CatalogProfile,
        regions: Vec<Region>,
        config: PipelineConfig,
        progress_tx: Option<crate::progress::ProgressSender>,
    ) -> Self {
        let run_id = Uuid::new_v4().to_string();
        Self {
            automation,
            profile: Arc::new(profile),
            regions,
            config,
            progress: ProgressContext::new(progress_tx, &run_id),
        }
    }

    pub fn run_id(&self) -> &str {
        self.progress.run_id()
    }

    /// Full two-phase run: enumerate → manifest → resolve → artifacts.
    ///
    /// The manifest is removed only after the final artifacts are safely on
    /// disk; everything in between survives a resolution crash.
    pub async fn run_full(&self) -> Result<HarvestResult, HarvestError> {
        let refs = self.enumerate().await?;
        if refs.is_empty() {
            return Err(HarvestError::Extraction(
                "enumeration produced no references".to_string(),
            ));
        }

        // Resolution reads the persisted manifest back, not the in-memory
        // list, so a resolution-only rerun sees identical input.
        let entries = manifest::read_manifest(&self.config.manifest_path)?;
        let result = self.resolve(entries).await;

        self.write_artifacts(&result)?;
        manifest::remove_manifest(&self.config.manifest_path);
        Ok(result)
    }

    /// Phase 1 only: enumerate all regions and persist the manifest.
    pub async fn enumerate(&self) -> Result<Vec<CandidateReference>, HarvestError> {
        self.progress.emit(HarvestEventKind::PhaseStarted {
            phase: HarvestPhase::Enumeration,
        });

        let mut all = Vec::new();
        for region in &self.regions {
            self.progress.emit(HarvestEventKind::RegionStarted {
                region: region.name.clone(),
            });

            // One region failing must not discard the others.
            match self.enumerate_region(region).await {
                Ok(outcome) => {
                    info!(
                        "{}: {} links over {} pages",
                        region.name,
                        outcome.links.len(),
                        outcome.pages
                    );
                    self.progress.emit(HarvestEventKind::RegionCompleted {
                        region: region.name.clone(),
                        links: outcome.links.len(),
                        pages: outcome.pages,
                    });
                    all.extend(outcome.links.iter().enumerate().map(|(idx, link)| {
                        CandidateReference::new(region, idx + 1, &link.name, &link.url)
                    }));
                }
                Err(e) => {
                    warn!("region {} enumeration failed: {e}", region.name);
                    self.progress.emit(HarvestEventKind::RegionFailed {
                        region: region.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        manifest::write_manifest(&self.config.manifest_path, &all)?;
        Ok(all)
    }

    async fn enumerate_region(
        &self,
        region: &Region,
    ) -> Result<traverse::TraversalOutcome, HarvestError> {
        let mut session = self.automation.new_session().await?;
        let result =
            traverse::collect_catalog_links(session.as_mut(), &self.profile, &region.url).await;
        // Session released on success and failure alike.
        let _ = session.close().await;
        result
    }

    /// Phase 2 only: resolve manifest entries across the worker pool.
    pub async fn resolve(&self, entries: Vec<CandidateReference>) -> HarvestResult {
        self.progress.emit(HarvestEventKind::PhaseStarted {
            phase: HarvestPhase::Resolution,
        });

        let start = Instant::now();
        let total = entries.len();
        let sequence = RecordSequence::new();
        let partitions = partition(total, self.config.workers);

        let (tx, mut rx) = mpsc::unbounded_channel::<DetailRecord>();
        let mut handles = Vec::new();

        for (worker_id, range) in partitions.into_iter().enumerate() {
            if range.is_empty() {
                continue;
            }
            let batch: Vec<CandidateReference> = entries[range].to_vec();
            info!("worker {}: {} references assigned", worker_id + 1, batch.len());

            handles.push(tokio::spawn(detail_worker(
                worker_id + 1,
                Arc::clone(&self.automation),
                batch,
                sequence.clone(),
                tx.clone(),
                self.progress.clone(),
            )));
        }
        drop(tx);

        // Single aggregating consumer; per-partition send order is the
        // partition's manifest order, cross-partition interleaving is
        // unspecified.
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        for handle in handles {
            let _ = handle.await;
        }

        let summary = RunSummary::new(
            self.run_id().to_string(),
            total,
            records.len(),
            start.elapsed().as_millis() as u64,
        );
        info!(
            "resolution complete: {}/{} ({:.1}%)",
            summary.resolved,
            summary.total,
            summary.success_rate * 100.0
        );
        self.progress.emit(HarvestEventKind::HarvestComplete {
            resolved: summary.resolved,
            total: summary.total,
            success_rate: summary.success_rate,
            elapsed_ms: summary.elapsed_ms,
        });

        HarvestResult { records, summary }
    }

    /// Resolution-only entry point: read an existing manifest and resolve it.
    pub async fn resolve_from_manifest(&self) -> Result<HarvestResult, HarvestError> {
        let entries = manifest::read_manifest(&self.config.manifest_path)?;
        if entries.is_empty() {
            return Err(HarvestError::Persistence(format!(
                "manifest {} holds no references",
                self.config.manifest_path.display()
            )));
        }
        let result = self.resolve(entries).await;
        self.write_artifacts(&result)?;
        Ok(result)
    }

    fn write_artifacts(&self, result: &HarvestResult) -> Result<(), HarvestError> {
        output::write_records(&self.config.output_path, &result.records)?;
        let metadata = output::build_metadata(&result.records, &result.summary);
        output::write_metadata(&self.config.metadata_path, &metadata)
    }
}

/// One resolution worker: exclusive session, strictly sequential items.
async fn detail_worker(
    worker_id: usize,
    automation: Arc<dyn Automation>,
    batch: Vec<CandidateReference>,
    sequence: RecordSequence,
    tx: mpsc::UnboundedSender<DetailRecord>,
    progress: ProgressContext,
) {
    let mut session = match automation.new_session().await {
        Ok(s) => s,
        Err(e) => {
            warn!("worker {worker_id}: could not open session: {e}");
            progress.emit(HarvestEventKind::WorkerFinished {
                worker: worker_id,
                resolved: 0,
                attempted: batch.len(),
            });
            return;
        }
    };

    progress.emit(HarvestEventKind::WorkerStarted {
        worker: worker_id,
        assigned: batch.len(),
    });

    let attempted = batch.len();
    let mut resolved = 0usize;

    for reference in &batch {
        match resolve_one(session.as_mut(), reference, &sequence).await {
            Ok(record) => {
                resolved += 1;
                progress.emit(HarvestEventKind::ItemResolved {
                    worker: worker_id,
                    name: record.name.clone(),
                    ok: true,
                });
                if tx.send(record).is_err() {
                    break;
                }
            }
            Err(e) => {
                // Skip-and-log: one bad reference never stops the worker.
                warn!("worker {worker_id}: '{}' failed: {e}", reference.name);
                progress.emit(HarvestEventKind::ItemResolved {
                    worker: worker_id,
                    name: reference.name.clone(),
                    ok: false,
                });
            }
        }

        let jitter = {
            let mut rng = rand::thread_rng();
            rng.gen_range(JITTER_MIN_MS..=JITTER_MAX_MS)
        };
        session.settle(jitter).await;
    }

    let _ = session.close().await;
    info!("worker {worker_id}: {resolved}/{attempted} resolved");
    progress.emit(HarvestEventKind::WorkerFinished {
        worker: worker_id,
        resolved,
        attempted,
    });
}

/// Resolve one reference into a record: navigate, snapshot, extract, classify.
pub async fn resolve_one(
    session: &mut dyn PageSession,
    reference: &CandidateReference,
    sequence: &RecordSequence,
) -> Result<DetailRecord, HarvestError> {
    session
        .navigate(&reference.url, DETAIL_NAVIGATION_TIMEOUT_MS)
        .await?;
    session.settle(DETAIL_SETTLE_MS).await;

    let html = session.content().await?;
    let fields = detail::extract_detail_fields(&html, &reference.name);
    Ok(build_record(fields, reference, sequence))
}

/// Combine extracted fields with classification and identity.
pub fn build_record(
    fields: DetailFields,
    reference: &CandidateReference,
    sequence: &RecordSequence,
) -> DetailRecord {
    let distance = classify::distance_from_office_m(&reference.region);

    DetailRecord {
        restaurant_id: sequence.next_id(&fields.name),
        name: fields.name.clone(),
        address: fields.address.clone(),
        phone: fields.phone,
        category: fields.category.clone(),
        food_genre: classify::food_genre(&fields.category).to_string(),
        rating: fields.rating,
        review_count: fields.review_count,
        latitude: 0.0,
        longitude: 0.0,
        location_description: format!("{} 일대", reference.region),
        distance_from_office_m: distance,
        walking_time_min: classify::walking_time_min(distance),
        is_walkable: classify::is_walkable(distance),
        distance_category: classify::distance_category(distance).to_string(),
        signature_menu: "추천메뉴".to_string(),
        menu_info: String::new(),
        price_range: String::new(),
        business_hours: String::new(),
        image_url: fields.image_url,
        url: reference.url.clone(),
        naver_map_link: naver_map_link(&fields.name),
        data_source: DATA_SOURCE.to_string(),
        last_updated: Local::now().to_rfc3339(),
        data_quality_score: classify::quality_score(
            fields.rating,
            fields.review_count,
            &fields.address,
        ),
        first_review: fields.first_review,
        link_id: reference.link_id.clone(),
        region_key: reference.region_key.clone(),
    }
}

fn naver_map_link(name: &str) -> String {
    url::Url::parse("https://map.naver.com/p/search/")
        .and_then(|base| base.join(name))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("https://map.naver.com/p/search/{name}"))
}
