//! CLI subcommand implementations for the forage binary.

pub mod counts_cmd;
pub mod enumerate_cmd;
pub mod output;
pub mod probe_cmd;
pub mod resolve_cmd;
pub mod run_cmd;

use crate::progress::{HarvestEventKind, ProgressReceiver};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;

/// Drain progress events into per-worker progress bars until the pipeline
/// drops its sender.
pub async fn drive_progress_bars(mut rx: ProgressReceiver) {
    let mp = MultiProgress::new();
    let style = ProgressStyle::with_template("{prefix:>9} [{bar:30}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let mut bars: HashMap<usize, ProgressBar> = HashMap::new();

    loop {
        let event = match rx.recv().await {
            Ok(ev) => ev,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event.event {
            HarvestEventKind::PhaseStarted { phase } => {
                let _ = mp.println(format!("[PHASE] {phase}"));
            }
            HarvestEventKind::RegionStarted { region } => {
                let _ = mp.println(format!("[REGION] {region} 수집 시작"));
            }
            HarvestEventKind::RegionCompleted {
                region,
                links,
                pages,
            } => {
                let _ = mp.println(format!("[REGION] {region}: {links} links / {pages} pages"));
            }
            HarvestEventKind::RegionFailed { region, message } => {
                let _ = mp.println(format!("[REGION] {region} failed: {message}"));
            }
            HarvestEventKind::WorkerStarted { worker, assigned } => {
                let bar = mp.add(ProgressBar::new(assigned as u64));
                bar.set_style(style.clone());
                bar.set_prefix(format!("worker {worker}"));
                bars.insert(worker, bar);
            }
            HarvestEventKind::ItemResolved { worker, name, ok } => {
                if let Some(bar) = bars.get(&worker) {
                    bar.inc(1);
                    bar.set_message(if ok { name } else { format!("FAILED: {name}") });
                }
            }
            HarvestEventKind::WorkerFinished {
                worker,
                resolved,
                attempted,
            } => {
                if let Some(bar) = bars.remove(&worker) {
                    bar.finish_with_message(format!("{resolved}/{attempted} resolved"));
                }
            }
            HarvestEventKind::HarvestComplete {
                resolved,
                total,
                success_rate,
                ..
            } => {
                let _ = mp.println(format!(
                    "[RESULT] {resolved}/{total} ({:.1}%)",
                    success_rate * 100.0
                ));
            }
        }
    }
}
