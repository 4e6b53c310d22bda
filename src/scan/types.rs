// src/scan/types.rs
use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::freshness::Tier;

/// One tracked listings URL plus the hashtag appended to its notifications.
/// Identity is the URL; the set is re-read from disk at the start of each
/// cycle, so admin edits take effect on the next cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedSource {
    pub url: String,
    #[serde(default)]
    pub hashtag: String,
}

/// An ad exactly as the page-fetch collaborator returned it. Only `id` is
/// persisted (in the seen-store); everything else lives for one scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    /// Opaque identifier, unique per ad. For OLX this is the offer URL.
    pub id: String,
    pub title: String,
    /// Raw "posted at" text as rendered on the page; parsed by the
    /// freshness classifier, never interpreted anywhere else.
    pub posted_at: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A RawItem that passed classification. Ephemeral; built once per scan and
/// dropped after the dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedItem {
    pub raw: RawItem,
    /// None when the timestamp was unparseable (always Stale then).
    pub age: Option<Duration>,
    pub tier: Tier,
}

/// Why a source scan produced no items.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("page load timed out")]
    Timeout,
    #[error("page loaded but no listings were found")]
    Empty,
    #[error("fetch failed: {0}")]
    Other(String),
}

/// Result of scanning one source within one cycle. A failed fetch is an empty
/// item list plus `failure`; it is deliberately distinct from "scanned fine,
/// nothing new", because a failure says nothing about actual listing
/// freshness and must not shorten the interval.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub source: TrackedSource,
    /// New-and-fresh items, in the page's discovery order.
    pub items: Vec<ClassifiedItem>,
    pub found_new: bool,
    pub failure: Option<FetchError>,
    /// How many post-skip items were actually classified (early exit and the
    /// per-scan cap both bound this).
    pub examined: usize,
}

impl ScanOutcome {
    pub fn failed(source: TrackedSource, failure: FetchError) -> Self {
        Self {
            source,
            items: Vec::new(),
            found_new: false,
            failure: Some(failure),
            examined: 0,
        }
    }
}

/// Page-fetch collaborator boundary. Implementations must return items in the
/// page's native newest-first order — the early-exit heuristic is meaningless
/// otherwise — and honor `max_items` as a scroll/paging depth hint.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        source: &TrackedSource,
        max_items: usize,
    ) -> Result<Vec<RawItem>, FetchError>;
}
