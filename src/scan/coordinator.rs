// src/scan/coordinator.rs
//! Runs one scan cycle: one task per tracked source under a bounded worker
//! cap, a hard per-source timeout, and forwarding to delivery as each source
//! completes. A slow or failing source never blocks the others.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::freshness::FreshnessPolicy;
use crate::interval::CycleDisposition;
use crate::notify::Notifier;
use crate::store::SeenStore;

use super::scanner::{scan_source, ScanLimits};
use super::types::{FetchError, PageFetcher, ScanOutcome, TrackedSource};

/// Everything a cycle needs that outlives any single cycle.
pub struct ScanContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub store: Arc<SeenStore>,
    pub notifier: Arc<dyn Notifier>,
    pub policy: FreshnessPolicy,
    pub limits: ScanLimits,
    pub max_parallel_sources: usize,
    pub page_timeout: std::time::Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSummary {
    pub sources: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub reported: usize,
    pub found_new: bool,
}

impl CycleSummary {
    /// Failure-only cycles must not shorten the interval; they back off like
    /// quiet ones but stay distinguishable for logging.
    pub fn disposition(&self) -> CycleDisposition {
        if self.found_new {
            CycleDisposition::FoundNew
        } else if self.sources > 0 && self.succeeded == 0 {
            CycleDisposition::AllFailed
        } else {
            CycleDisposition::Quiet
        }
    }
}

/// Scan every tracked source once. Results are delivered as sources complete;
/// within a source, items keep their discovery order.
pub async fn run_cycle(
    ctx: &ScanContext,
    sources: &[TrackedSource],
    now: DateTime<Utc>,
) -> CycleSummary {
    let mut summary = CycleSummary {
        sources: sources.len(),
        ..Default::default()
    };
    if sources.is_empty() {
        tracing::warn!("no tracked sources configured, nothing to scan");
        return summary;
    }

    let semaphore = Arc::new(Semaphore::new(ctx.max_parallel_sources.max(1)));
    let mut tasks: JoinSet<ScanOutcome> = JoinSet::new();

    for source in sources.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let fetcher = Arc::clone(&ctx.fetcher);
        let store = Arc::clone(&ctx.store);
        let policy = ctx.policy;
        let limits = ctx.limits;
        let page_timeout = ctx.page_timeout;

        tasks.spawn(async move {
            // Holding the permit inside the task keeps spawning cheap while
            // capping how many page loads are in flight at once.
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            match tokio::time::timeout(
                page_timeout,
                scan_source(fetcher.as_ref(), &source, now, &policy, &limits, &store),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(url = %source.url, "source scan exceeded page timeout, abandoned");
                    ScanOutcome::failed(source, FetchError::Timeout)
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "source scan task panicked");
                summary.failed += 1;
                counter!("scan_source_failures_total").increment(1);
                continue;
            }
        };

        if let Some(failure) = &outcome.failure {
            tracing::warn!(url = %outcome.source.url, error = %failure, "source scan failed");
            summary.failed += 1;
            counter!("scan_source_failures_total").increment(1);
            continue;
        }

        summary.succeeded += 1;
        summary.found_new |= outcome.found_new;

        for item in &outcome.items {
            match ctx.notifier.send(&outcome.source, item).await {
                Ok(()) => {
                    summary.reported += 1;
                    counter!("ads_delivered_total").increment(1);
                }
                Err(e) => {
                    // Already recorded as seen, so it will not come back as
                    // new; losing the message is the lesser evil vs. spam.
                    tracing::warn!(id = %item.raw.id, error = %e, "delivery failed");
                    counter!("ads_delivery_errors_total").increment(1);
                }
            }
        }
    }

    tracing::info!(
        sources = summary.sources,
        succeeded = summary.succeeded,
        failed = summary.failed,
        reported = summary.reported,
        found_new = summary.found_new,
        "scan cycle finished"
    );
    summary
}
