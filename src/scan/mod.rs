// src/scan/mod.rs
pub mod coordinator;
pub mod scanner;
pub mod types;

pub use coordinator::{run_cycle, CycleSummary, ScanContext};
pub use scanner::{filter_new_fresh, scan_source, ScanLimits};
pub use types::{ClassifiedItem, FetchError, PageFetcher, RawItem, ScanOutcome, TrackedSource};

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scan_items_examined_total",
            "Post-skip items classified across all scans."
        );
        describe_counter!("scan_items_stale_total", "Items classified stale.");
        describe_counter!(
            "scan_items_deduped_total",
            "Fresh items skipped because their id was already recorded."
        );
        describe_counter!(
            "scan_items_reported_total",
            "New fresh items selected for delivery."
        );
        describe_counter!(
            "scan_early_exits_total",
            "Scans cut short by a run of consecutive stale items."
        );
        describe_counter!(
            "scan_source_failures_total",
            "Source scans that failed (timeout, empty page, fetch error)."
        );
        describe_counter!("ads_delivered_total", "Ads successfully sent downstream.");
        describe_counter!("ads_delivery_errors_total", "Failed delivery attempts.");
        describe_counter!("watch_cycles_total", "Completed scan cycles.");
        describe_counter!(
            "watch_failure_only_cycles_total",
            "Cycles where no source succeeded."
        );
        describe_counter!("seen_swept_total", "Seen-store records removed by expiry sweeps.");
        describe_gauge!("watch_interval_secs", "Delay chosen before the next cycle.");
        describe_gauge!("watch_last_cycle_ts", "Unix ts when the last cycle started.");
        describe_gauge!("seen_store_size", "Records currently in the seen-store.");
    });
}
