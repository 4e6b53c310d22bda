// src/interval.rs
//! Adaptive delay between scan cycles. Pure, testable logic: the watcher owns
//! a `CycleState`, feeds each cycle's disposition through `advance`, and
//! sleeps for whatever comes back. No I/O here.

use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct IntervalPolicy {
    /// Delay after a cycle that found something: re-poll aggressively while
    /// activity is occurring.
    pub quick_check_interval: Duration,
    /// Floor for the backoff, also the initial interval. Never poll faster
    /// than this while quiet.
    pub min_interval: Duration,
    /// Ceiling for the backoff; above this we would start missing fresh ads.
    pub max_interval: Duration,
    /// Multiplier applied on each quiet cycle.
    pub growth: f64,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            quick_check_interval: Duration::from_secs(60),
            min_interval: Duration::from_secs(180),
            max_interval: Duration::from_secs(900),
            growth: 1.5,
        }
    }
}

/// How the cycle went, as far as scheduling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDisposition {
    FoundNew,
    Quiet,
    /// Every source failed; scheduled like Quiet but kept distinct so the
    /// watcher can log and meter it separately.
    AllFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fast,
    Slow,
}

#[derive(Debug, Clone, Copy)]
pub struct CycleState {
    pub current: Duration,
    pub quiet_cycles: u32,
    pub last_cycle_start: Option<DateTime<Utc>>,
}

impl CycleState {
    /// Initial state: slow mode at the floor.
    pub fn new(policy: &IntervalPolicy) -> Self {
        Self {
            current: policy.min_interval,
            quiet_cycles: 0,
            last_cycle_start: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.quiet_cycles == 0 && self.last_cycle_start.is_some() {
            Mode::Fast
        } else {
            Mode::Slow
        }
    }

    /// Fold one finished cycle into the state and return the delay before the
    /// next one. FoundNew snaps to the quick-check delay; anything else backs
    /// off multiplicatively, clamped to [min_interval, max_interval].
    pub fn advance(
        &mut self,
        policy: &IntervalPolicy,
        disposition: CycleDisposition,
        started_at: DateTime<Utc>,
    ) -> Duration {
        self.last_cycle_start = Some(started_at);
        match disposition {
            CycleDisposition::FoundNew => {
                self.quiet_cycles = 0;
                self.current = policy.quick_check_interval;
            }
            CycleDisposition::Quiet | CycleDisposition::AllFailed => {
                self.quiet_cycles = self.quiet_cycles.saturating_add(1);
                let scaled = self.current.mul_f64(policy.growth);
                self.current = scaled.min(policy.max_interval).max(policy.min_interval);
            }
        }
        self.current
    }
}
