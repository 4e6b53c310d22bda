// src/notify/mod.rs
pub mod telegram;

use anyhow::Result;

use crate::scan::types::{ClassifiedItem, TrackedSource};

pub use telegram::TelegramNotifier;

/// Delivery collaborator boundary. A failed send is the notifier's problem;
/// the ad was already recorded as seen and is never re-queued.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, source: &TrackedSource, item: &ClassifiedItem) -> Result<()>;
}
