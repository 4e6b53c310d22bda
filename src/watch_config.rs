// src/watch_config.rs
//! Tunables for the watch loop. Values come from an optional TOML file
//! (`$WATCHER_CONFIG_PATH`, fallback `config/watcher.toml`) with env-var
//! overrides on top, so a deploy can tweak one knob without a config file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::freshness::FreshnessPolicy;
use crate::interval::IntervalPolicy;
use crate::scan::ScanLimits;

pub const ENV_CONFIG_PATH: &str = "WATCHER_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    /// Delay after a cycle that found new ads.
    pub quick_check_interval_secs: u64,
    /// Backoff floor and initial interval.
    pub min_interval_secs: u64,
    /// Backoff ceiling.
    pub max_interval_secs: u64,
    /// Backoff multiplier per quiet cycle.
    pub interval_growth: f64,

    /// Ads at most this old are "very fresh".
    pub very_fresh_age_secs: u64,
    /// Ads older than this are stale and never reported.
    pub max_age_secs: u64,

    /// Promoted placements pinned to the top of each page.
    pub skip_first_n: usize,
    /// Organic items examined per scan at most.
    pub max_items_per_scan: usize,
    /// Consecutive stale items that end a scan early.
    pub consecutive_stale_threshold: u32,

    pub max_parallel_sources: usize,
    pub page_timeout_secs: u64,

    /// Seen records older than this are swept and may re-report.
    pub seen_retention_hours: u64,
    /// Run the expiry sweep once every N cycles, not per cycle.
    pub sweep_every_cycles: u32,

    pub state_path: String,
    /// Prometheus listener address; empty disables the exporter.
    pub metrics_addr: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quick_check_interval_secs: 60,
            min_interval_secs: 180,
            max_interval_secs: 900,
            interval_growth: 1.5,
            very_fresh_age_secs: 600,
            max_age_secs: 3600,
            skip_first_n: 2,
            max_items_per_scan: 30,
            consecutive_stale_threshold: 3,
            max_parallel_sources: 3,
            page_timeout_secs: 60,
            seen_retention_hours: 72,
            sweep_every_cycles: 10,
            state_path: "state/seen_ads.json".to_string(),
            metrics_addr: "127.0.0.1:9184".to_string(),
        }
    }
}

impl WatcherConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading watcher config from {}", path.display()))?;
        let cfg: Self = toml::from_str(&content)
            .with_context(|| format!("parsing watcher config at {}", path.display()))?;
        Ok(cfg)
    }

    /// File if present, defaults otherwise, env overrides on top.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            Self::load_from(&PathBuf::from(p))?
        } else {
            let fallback = PathBuf::from("config/watcher.toml");
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        fn env_u64(key: &str, slot: &mut u64) {
            if let Some(v) = std::env::var(key).ok().and_then(|v| v.parse().ok()) {
                *slot = v;
            }
        }
        env_u64("QUICK_CHECK_INTERVAL_SECS", &mut self.quick_check_interval_secs);
        env_u64("MIN_INTERVAL_SECS", &mut self.min_interval_secs);
        env_u64("MAX_INTERVAL_SECS", &mut self.max_interval_secs);
        env_u64("VERY_FRESH_AGE_SECS", &mut self.very_fresh_age_secs);
        env_u64("MAX_AGE_SECS", &mut self.max_age_secs);
        env_u64("PAGE_TIMEOUT_SECS", &mut self.page_timeout_secs);
        if let Some(v) = std::env::var("MAX_PARALLEL_SOURCES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_parallel_sources = v;
        }
        if let Some(v) = std::env::var("STATE_PATH").ok().filter(|v| !v.is_empty()) {
            self.state_path = v;
        }
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy {
            very_fresh_age: chrono::Duration::seconds(self.very_fresh_age_secs as i64),
            max_age: chrono::Duration::seconds(self.max_age_secs as i64),
        }
    }

    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            skip_first_n: self.skip_first_n,
            max_items_per_scan: self.max_items_per_scan,
            consecutive_stale_threshold: self.consecutive_stale_threshold,
        }
    }

    pub fn interval_policy(&self) -> IntervalPolicy {
        IntervalPolicy {
            quick_check_interval: Duration::from_secs(self.quick_check_interval_secs),
            min_interval: Duration::from_secs(self.min_interval_secs),
            max_interval: Duration::from_secs(self.max_interval_secs),
            growth: self.interval_growth,
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn seen_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.seen_retention_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = WatcherConfig::default();
        assert!(cfg.min_interval_secs <= cfg.max_interval_secs);
        assert!(cfg.quick_check_interval_secs <= cfg.min_interval_secs);
        assert!(cfg.very_fresh_age_secs <= cfg.max_age_secs);
        assert!(cfg.interval_growth > 1.0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg: WatcherConfig =
            toml::from_str("min_interval_secs = 20\nmax_interval_secs = 40").unwrap();
        assert_eq!(cfg.min_interval_secs, 20);
        assert_eq!(cfg.max_interval_secs, 40);
        assert_eq!(cfg.skip_first_n, WatcherConfig::default().skip_first_n);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: std::result::Result<WatcherConfig, _> = toml::from_str("no_such_knob = 1");
        assert!(res.is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply_on_top() {
        std::env::set_var("MIN_INTERVAL_SECS", "33");
        let mut cfg = WatcherConfig::default();
        cfg.apply_env();
        assert_eq!(cfg.min_interval_secs, 33);
        std::env::remove_var("MIN_INTERVAL_SECS");
    }
}
