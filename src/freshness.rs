// src/freshness.rs
//! Maps a listing's raw "posted at" text to an age and a freshness tier.
//! Pure logic, no I/O; the scanner calls this once per examined item.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    VeryFresh,
    Fresh,
    Stale,
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    pub very_fresh_age: Duration,
    pub max_age: Duration,
}

impl FreshnessPolicy {
    /// Both boundaries are inclusive: age == very_fresh_age is VeryFresh,
    /// age == max_age is Fresh.
    pub fn tier_for(&self, age: Duration) -> Tier {
        if age <= self.very_fresh_age {
            Tier::VeryFresh
        } else if age <= self.max_age {
            Tier::Fresh
        } else {
            Tier::Stale
        }
    }

    /// Classify a raw timestamp string. Unparseable input is Stale: an ad of
    /// indeterminate age must never reach the report path.
    pub fn classify(&self, posted_at: &str, now: DateTime<Utc>) -> (Option<Duration>, Tier) {
        match parse_age(posted_at, now) {
            Some(age) => (Some(age), self.tier_for(age)),
            None => (None, Tier::Stale),
        }
    }
}

/// Parse the enumerated timestamp shapes OLX renders into an age relative to
/// `now`. Shapes: relative ("5 minutes ago" / "5 minut temu"), today/yesterday
/// with a wall-clock time ("dzisiaj o 09:22"), and the absolute
/// "DD/MM/YYYY | HH:MM" form used on ad detail pages. Timestamps slightly in
/// the future (clock skew between us and the site) clamp to zero age.
pub fn parse_age(posted_at: &str, now: DateTime<Utc>) -> Option<Duration> {
    let s = posted_at.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(age) = parse_relative(s) {
        return Some(age);
    }
    if let Some(ts) = parse_today_yesterday(s, now).or_else(|| parse_absolute(s)) {
        let age = now.signed_duration_since(ts);
        return Some(age.max(Duration::zero()));
    }
    None
}

fn parse_relative(s: &str) -> Option<Duration> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\s*(sekund|second|sec|minut|min|godzin|hour|hr)\w*\s+(temu|ago)$")
            .unwrap()
    });
    let caps = re.captures(s)?;
    let n: i64 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    let age = if unit.starts_with("sek") || unit.starts_with("sec") {
        Duration::seconds(n)
    } else if unit.starts_with("min") {
        Duration::minutes(n)
    } else {
        Duration::hours(n)
    };
    Some(age)
}

fn parse_today_yesterday(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)^(dzisiaj|today|wczoraj|yesterday)(?:\s+(?:o|at))?\s+(\d{1,2}):(\d{2})$")
            .unwrap()
    });
    let caps = re.captures(s)?;
    let word = caps[1].to_ascii_lowercase();
    let hour: u32 = caps[2].parse().ok()?;
    let minute: u32 = caps[3].parse().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

    let mut date = now.date_naive();
    if word.starts_with("wczoraj") || word.starts_with("yesterday") {
        date = date.pred_opt()?;
    }
    Some(NaiveDateTime::new(date, time).and_utc())
}

fn parse_absolute(s: &str) -> Option<DateTime<Utc>> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})\s*\|\s*(\d{1,2}):(\d{2})$").unwrap()
    });
    let caps = re.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(NaiveDateTime::new(date, time).and_utc())
}
