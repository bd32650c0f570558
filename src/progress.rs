// Copyright 2026 Forage Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for harvest telemetry.
//!
//! The pipeline emits `HarvestEvent`s which flow through a
//! `tokio::sync::broadcast` channel to all subscribers (CLI progress bars,
//! logs). When no subscriber exists, events are silently dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted during a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: HarvestEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HarvestEventKind {
    /// A pipeline phase has started.
    PhaseStarted { phase: HarvestPhase },
    /// Enumeration of one region has started.
    RegionStarted { region: String },
    /// One region enumerated successfully.
    RegionCompleted {
        region: String,
        links: usize,
        pages: usize,
    },
    /// One region's enumeration failed; the run continues.
    RegionFailed { region: String, message: String },
    /// A resolution worker started on its partition.
    WorkerStarted { worker: usize, assigned: usize },
    /// One reference finished resolving (successfully or not).
    ItemResolved {
        worker: usize,
        name: String,
        ok: bool,
    },
    /// A resolution worker finished its partition.
    WorkerFinished {
        worker: usize,
        resolved: usize,
        attempted: usize,
    },
    /// The whole harvest completed.
    HarvestComplete {
        resolved: usize,
        total: usize,
        success_rate: f64,
        elapsed_ms: u64,
    },
}

/// Identifies which pipeline phase is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarvestPhase {
    /// Phase 1: traverse catalogs and build the manifest.
    Enumeration,
    /// Phase 2: resolve manifest entries into detail records.
    Resolution,
}

impl std::fmt::Display for HarvestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enumeration => write!(f, "Enumeration"),
            Self::Resolution => write!(f, "Resolution"),
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<HarvestEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<HarvestEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// 512 events cover a typical run: a handful of region/worker events plus
/// one event per resolved item.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(512)
}

/// Cloneable emitter shared across pipeline tasks.
///
/// Sequence numbers come from one atomic counter, so events stay globally
/// ordered even when several workers emit concurrently. Emitting without
/// subscribers is free — send errors are silently ignored.
#[derive(Clone)]
pub struct ProgressContext {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl ProgressContext {
    pub fn new(tx: Option<ProgressSender>, run_id: &str) -> Self {
        Self {
            tx,
            run_id: run_id.to_string(),
            seq: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }
    }

    /// Context that drops every event.
    pub fn disabled() -> Self {
        Self::new(None, "")
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit a progress event.
    pub fn emit(&self, event: HarvestEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self
                .seq
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                + 1;
            let _ = sender.send(HarvestEvent {
                run_id: self.run_id.clone(),
                seq,
                event,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = HarvestEvent {
            run_id: "run-1".to_string(),
            seq: 3,
            event: HarvestEventKind::RegionCompleted {
                region: "남대문".to_string(),
                links: 220,
                pages: 4,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("RegionCompleted"));
        assert!(json.contains("남대문"));

        let parsed: HarvestEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.seq, 3);
    }

    #[test]
    fn test_emit_without_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        // Should not panic with zero subscribers.
        let ctx = ProgressContext::new(Some(tx), "run");
        ctx.emit(HarvestEventKind::PhaseStarted {
            phase: HarvestPhase::Enumeration,
        });
    }

    #[test]
    fn test_disabled_context_is_noop() {
        let ctx = ProgressContext::disabled();
        ctx.emit(HarvestEventKind::PhaseStarted {
            phase: HarvestPhase::Resolution,
        });
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let (tx, mut rx) = channel();
        let ctx = ProgressContext::new(Some(tx), "run");
        for _ in 0..3 {
            ctx.emit(HarvestEventKind::RegionStarted {
                region: "서울역".to_string(),
            });
        }
        let mut last = 0;
        for _ in 0..3 {
            let ev = rx.try_recv().unwrap();
            assert!(ev.seq > last);
            last = ev.seq;
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(HarvestPhase::Enumeration.to_string(), "Enumeration");
        assert_eq!(HarvestPhase::Resolution.to_string(), "Resolution");
    }
}
