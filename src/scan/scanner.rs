// src/scan/scanner.rs
//! Single-source scan: skip promoted placements, walk the organic listings in
//! page order, classify each, early-exit on a run of stale items, and keep
//! only ads the seen-store has not recorded yet.

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::freshness::{FreshnessPolicy, Tier};
use crate::store::SeenStore;

use super::types::{ClassifiedItem, FetchError, PageFetcher, RawItem, ScanOutcome, TrackedSource};

#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    /// Promoted/sponsored entries pinned to the top. They are not time-ordered
    /// with the organic listings and are never classified or reported.
    pub skip_first_n: usize,
    pub max_items_per_scan: usize,
    pub consecutive_stale_threshold: u32,
}

/// Classify and dedup-filter one source's fetched items. Items must be in the
/// page's native newest-first order.
pub fn filter_new_fresh(
    source: &TrackedSource,
    raw: Vec<RawItem>,
    now: DateTime<Utc>,
    policy: &FreshnessPolicy,
    limits: &ScanLimits,
    store: &SeenStore,
) -> ScanOutcome {
    let mut items = Vec::new();
    let mut consecutive_stale = 0u32;
    let mut examined = 0usize;

    for item in raw
        .into_iter()
        .skip(limits.skip_first_n)
        .take(limits.max_items_per_scan)
    {
        examined += 1;
        let (age, tier) = policy.classify(&item.posted_at, now);

        if tier == Tier::Stale {
            consecutive_stale += 1;
            counter!("scan_items_stale_total").increment(1);
            if consecutive_stale >= limits.consecutive_stale_threshold {
                // Organic listings are time-ordered; a run of stale items
                // means everything below is stale too.
                tracing::debug!(
                    url = %source.url,
                    examined,
                    "early exit after {consecutive_stale} consecutive stale items"
                );
                counter!("scan_early_exits_total").increment(1);
                break;
            }
            continue;
        }

        // A repeat of an already-reported ad is skipped and is neutral for
        // the stale counter: it neither extends nor breaks the run, because
        // an old ad reappearing says nothing about a fresh streak.
        if !store.record_if_new(&item.id, &source.url, now) {
            counter!("scan_items_deduped_total").increment(1);
            continue;
        }
        consecutive_stale = 0;

        items.push(ClassifiedItem {
            raw: item,
            age,
            tier,
        });
    }

    counter!("scan_items_examined_total").increment(examined as u64);
    counter!("scan_items_reported_total").increment(items.len() as u64);

    let found_new = !items.is_empty();
    ScanOutcome {
        source: source.clone(),
        items,
        found_new,
        failure: None,
        examined,
    }
}

/// Fetch one source and run the filter over the result. An Ok-but-empty fetch
/// is a failure outcome (`FetchError::Empty`), not a quiet success.
pub async fn scan_source(
    fetcher: &dyn PageFetcher,
    source: &TrackedSource,
    now: DateTime<Utc>,
    policy: &FreshnessPolicy,
    limits: &ScanLimits,
    store: &SeenStore,
) -> ScanOutcome {
    let fetch_depth = limits.skip_first_n + limits.max_items_per_scan;
    match fetcher.fetch(source, fetch_depth).await {
        Ok(raw) if raw.is_empty() => {
            tracing::warn!(url = %source.url, "page loaded but no listings found");
            ScanOutcome::failed(source.clone(), FetchError::Empty)
        }
        Ok(raw) => filter_new_fresh(source, raw, now, policy, limits, store),
        Err(e) => {
            tracing::warn!(url = %source.url, error = %e, "source fetch failed");
            ScanOutcome::failed(source.clone(), e)
        }
    }
}
