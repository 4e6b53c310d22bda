// src/watcher.rs
//! The driving loop: reload tracked sources, run one scan cycle, sweep and
//! persist the seen-store, then sleep for whatever the interval controller
//! picked. Nothing short of the store becoming unwritable stops the loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, gauge};

use crate::interval::{CycleDisposition, CycleState, IntervalPolicy};
use crate::notify::Notifier;
use crate::scan::types::{PageFetcher, TrackedSource};
use crate::scan::{self, ScanContext};
use crate::sources;
use crate::store::SeenStore;
use crate::watch_config::WatcherConfig;

/// The expiry sweep runs on every Nth cycle (cycles count from 1), not per
/// cycle, to bound store churn. `every == 0` degrades to every cycle.
fn sweep_due(cycle_no: u64, every: u32) -> bool {
    cycle_no % u64::from(every.max(1)) == 0
}

pub async fn run(
    cfg: WatcherConfig,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    store: Arc<SeenStore>,
) -> Result<()> {
    scan::ensure_metrics_described();

    let interval_policy: IntervalPolicy = cfg.interval_policy();
    let ctx = ScanContext {
        fetcher,
        store: Arc::clone(&store),
        notifier,
        policy: cfg.freshness_policy(),
        limits: cfg.scan_limits(),
        max_parallel_sources: cfg.max_parallel_sources,
        page_timeout: cfg.page_timeout(),
    };

    let mut state = CycleState::new(&interval_policy);
    let mut last_sources: Vec<TrackedSource> = Vec::new();
    let mut cycle_no: u64 = 0;

    loop {
        let started = Utc::now();
        cycle_no += 1;

        // Admin edits land in the file; re-read every cycle so they take
        // effect on the next one. On a read error, keep scanning the last
        // known good set rather than silently dropping every source.
        match sources::load_sources_default() {
            Ok(list) => last_sources = list,
            Err(e) => {
                tracing::warn!(error = %e, "failed to reload tracked sources, keeping previous set");
            }
        }

        let summary = scan::run_cycle(&ctx, &last_sources, started).await;
        counter!("watch_cycles_total").increment(1);

        let mut mutated = summary.found_new;
        if sweep_due(cycle_no, cfg.sweep_every_cycles) {
            let removed = store.sweep(cfg.seen_retention(), Utc::now());
            if removed > 0 {
                tracing::info!(removed, "swept expired seen-records");
                counter!("seen_swept_total").increment(removed as u64);
                mutated = true;
            }
        }
        if mutated {
            store
                .flush()
                .context("persisting seen-store; refusing to continue without durability")?;
        }
        gauge!("seen_store_size").set(store.len() as f64);

        let disposition = summary.disposition();
        if disposition == CycleDisposition::AllFailed {
            tracing::warn!(
                sources = summary.sources,
                "cycle saw only fetch failures; backing off without learning anything about freshness"
            );
            counter!("watch_failure_only_cycles_total").increment(1);
        }

        let delay = state.advance(&interval_policy, disposition, started);
        gauge!("watch_interval_secs").set(delay.as_secs_f64());
        gauge!("watch_last_cycle_ts").set(started.timestamp() as f64);
        tracing::info!(
            cycle = cycle_no,
            delay_secs = delay.as_secs(),
            mode = ?state.mode(),
            "cycle complete, sleeping"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::sweep_due;

    #[test]
    fn sweep_fires_on_exactly_every_nth_cycle() {
        let fired: Vec<u64> = (1..=30).filter(|&c| sweep_due(c, 10)).collect();
        assert_eq!(fired, vec![10, 20, 30]);
    }

    #[test]
    fn zero_cadence_degrades_to_every_cycle() {
        assert!((1..=5).all(|c| sweep_due(c, 0)));
    }

    #[test]
    fn first_cycle_never_sweeps_for_cadence_above_one() {
        assert!(!sweep_due(1, 2));
        assert!(sweep_due(2, 2));
    }
}
