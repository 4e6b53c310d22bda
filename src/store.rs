// src/store.rs
//! Durable record of ads we have already reported. The whole point is that a
//! process restart must not re-spam every ad currently on the page, so the
//! map is persisted as JSON and reloaded on startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenRecord {
    pub source: String,
    pub first_seen: DateTime<Utc>,
}

/// Seen-ad store: ad id → (source, first_seen). Uniqueness on id is by map
/// construction; `record_if_new` is the single check-and-insert point, so two
/// sources racing on a cross-posted ad end up with exactly one record and one
/// report between them.
#[derive(Debug)]
pub struct SeenStore {
    inner: Mutex<HashMap<String, SeenRecord>>,
    path: PathBuf,
}

impl SeenStore {
    /// Load the store from `path`, or start empty if the file does not exist
    /// yet. An existing-but-unreadable file is a startup error: silently
    /// starting empty would re-report everything.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing seen-store at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading seen-store at {}", path.display()))
            }
        };
        Ok(Self {
            inner: Mutex::new(map),
            path,
        })
    }

    pub fn is_new(&self, id: &str) -> bool {
        !self.inner.lock().expect("seen-store mutex poisoned").contains_key(id)
    }

    /// Insert a record for `id` unless one already exists. Returns true when
    /// this call inserted it. Idempotent; the existing record is never
    /// overwritten, so first_seen keeps the first sighting.
    pub fn record_if_new(&self, id: &str, source: &str, now: DateTime<Utc>) -> bool {
        let mut map = self.inner.lock().expect("seen-store mutex poisoned");
        if map.contains_key(id) {
            return false;
        }
        map.insert(
            id.to_string(),
            SeenRecord {
                source: source.to_string(),
                first_seen: now,
            },
        );
        true
    }

    /// Drop records whose first sighting is older than `retention`. Returns
    /// the number removed. An id swept here counts as new if it reappears;
    /// that occasional re-report is accepted.
    pub fn sweep(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let mut map = self.inner.lock().expect("seen-store mutex poisoned");
        let before = map.len();
        map.retain(|_, rec| now.signed_duration_since(rec.first_seen) <= retention);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("seen-store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the current map to disk (pretty JSON). Called once per cycle
    /// that mutated the store, not per item. The write goes to a sibling
    /// temp file and is renamed over the target, so an interrupted flush
    /// leaves either the old or the new complete snapshot — never a
    /// truncated file that `open` would refuse on the next start.
    pub fn flush(&self) -> Result<()> {
        let json = {
            let map = self.inner.lock().expect("seen-store mutex poisoned");
            serde_json::to_vec_pretty(&*map).context("serializing seen-store")?
        };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating state dir {}", dir.display()))?;
            }
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .with_context(|| format!("writing seen-store at {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing seen-store at {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
