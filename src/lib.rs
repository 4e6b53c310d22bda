// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod fetch;
pub mod freshness;
pub mod interval;
pub mod notify;
pub mod scan;
pub mod sources;
pub mod store;
pub mod watch_config;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::freshness::{FreshnessPolicy, Tier};
pub use crate::interval::{CycleDisposition, CycleState, IntervalPolicy, Mode};
pub use crate::notify::{Notifier, TelegramNotifier};
pub use crate::scan::{
    ClassifiedItem, CycleSummary, FetchError, PageFetcher, RawItem, ScanContext, ScanLimits,
    ScanOutcome, TrackedSource,
};
pub use crate::store::{SeenRecord, SeenStore};
pub use crate::watch_config::WatcherConfig;
