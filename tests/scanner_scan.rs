// tests/scanner_scan.rs
use chrono::{Duration, Utc};
use olx_watcher::freshness::FreshnessPolicy;
use olx_watcher::scan::types::{FetchError, PageFetcher, RawItem, TrackedSource};
use olx_watcher::scan::{filter_new_fresh, scan_source, ScanLimits};
use olx_watcher::store::SeenStore;
use olx_watcher::Tier;

fn source() -> TrackedSource {
    TrackedSource {
        url: "https://www.olx.pl/rowery/".into(),
        hashtag: "#rowery".into(),
    }
}

fn ad(id: &str, posted_at: &str) -> RawItem {
    RawItem {
        id: id.into(),
        title: format!("ad {id}"),
        posted_at: posted_at.into(),
        price: None,
        location: None,
        image_url: None,
    }
}

fn policy() -> FreshnessPolicy {
    FreshnessPolicy {
        very_fresh_age: Duration::minutes(10),
        max_age: Duration::minutes(50),
    }
}

fn limits() -> ScanLimits {
    ScanLimits {
        skip_first_n: 2,
        max_items_per_scan: 13,
        consecutive_stale_threshold: 3,
    }
}

fn fresh_store() -> (tempfile::TempDir, SeenStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SeenStore::open(dir.path().join("seen.json")).unwrap();
    (dir, store)
}

#[test]
fn early_exit_examines_exactly_the_stale_run() {
    let (_dir, store) = fresh_store();
    let lim = ScanLimits {
        skip_first_n: 0,
        ..limits()
    };
    // 10 stale items; with threshold 3 the scan must stop after item 3 even
    // though max_items_per_scan is 13.
    let raw: Vec<_> = (0..10).map(|i| ad(&format!("s{i}"), "2 hours ago")).collect();

    let outcome = filter_new_fresh(&source(), raw, Utc::now(), &policy(), &lim, &store);
    assert_eq!(outcome.examined, 3);
    assert!(outcome.items.is_empty());
    assert!(!outcome.found_new);
    assert_eq!(store.len(), 0);
}

#[test]
fn promoted_entries_are_never_classified_or_reported() {
    let (_dir, store) = fresh_store();
    // Two very fresh promoted entries at the top; everything organic is stale.
    let raw = vec![
        ad("promo-1", "1 minute ago"),
        ad("promo-2", "1 minute ago"),
        ad("org-1", "3 hours ago"),
        ad("org-2", "3 hours ago"),
        ad("org-3", "3 hours ago"),
    ];

    let outcome = filter_new_fresh(&source(), raw, Utc::now(), &policy(), &limits(), &store);
    assert!(outcome.items.is_empty());
    assert!(store.is_new("promo-1"));
    assert!(store.is_new("promo-2"));
    assert_eq!(outcome.examined, 3);
}

#[test]
fn seen_items_are_excluded_regardless_of_tier() {
    let (_dir, store) = fresh_store();
    let now = Utc::now();
    store.record_if_new("old-friend", "elsewhere", now);

    let raw = vec![
        ad("p1", "1 minute ago"),
        ad("p2", "1 minute ago"),
        ad("old-friend", "2 minutes ago"), // very fresh but already reported
        ad("newcomer", "4 minutes ago"),
    ];

    let outcome = filter_new_fresh(&source(), raw, now, &policy(), &limits(), &store);
    let ids: Vec<_> = outcome.items.iter().map(|i| i.raw.id.as_str()).collect();
    assert_eq!(ids, vec!["newcomer"]);
    assert!(outcome.found_new);
}

#[test]
fn seen_item_does_not_reset_the_stale_run() {
    let (_dir, store) = fresh_store();
    let now = Utc::now();
    store.record_if_new("seen-fresh", "elsewhere", now);

    let lim = ScanLimits {
        skip_first_n: 0,
        ..limits()
    };
    let raw = vec![
        ad("a", "2 hours ago"),
        ad("b", "2 hours ago"),
        ad("seen-fresh", "1 minute ago"), // neutral: neither extends nor breaks
        ad("c", "2 hours ago"),           // third stale in the run, exit here
        ad("never-reached", "1 minute ago"),
    ];

    let outcome = filter_new_fresh(&source(), raw, now, &policy(), &lim, &store);
    assert_eq!(outcome.examined, 4);
    assert!(outcome.items.is_empty());
    assert!(store.is_new("never-reached"));
}

#[test]
fn max_items_cap_holds_without_early_exit() {
    let (_dir, store) = fresh_store();
    let lim = ScanLimits {
        skip_first_n: 0,
        max_items_per_scan: 5,
        consecutive_stale_threshold: 3,
    };
    let raw: Vec<_> = (0..20).map(|i| ad(&format!("f{i}"), "5 minutes ago")).collect();

    let outcome = filter_new_fresh(&source(), raw, Utc::now(), &policy(), &lim, &store);
    assert_eq!(outcome.examined, 5);
    assert_eq!(outcome.items.len(), 5);
}

#[test]
fn end_to_end_scenario_reports_all_three_tiers_correctly() {
    // Source A: [P1, P2 promoted, I3 age=5min, I4 age=45min, I5 age=5min],
    // skip_first_n = 2, very_fresh = 10min, max_age = 50min.
    let (_dir, store) = fresh_store();
    let raw = vec![
        ad("P1", "1 minute ago"),
        ad("P2", "1 minute ago"),
        ad("I3", "5 minutes ago"),
        ad("I4", "45 minutes ago"),
        ad("I5", "5 minutes ago"),
    ];

    let outcome = filter_new_fresh(&source(), raw, Utc::now(), &policy(), &limits(), &store);
    let reported: Vec<_> = outcome
        .items
        .iter()
        .map(|i| (i.raw.id.as_str(), i.tier))
        .collect();
    assert_eq!(
        reported,
        vec![
            ("I3", Tier::VeryFresh),
            ("I4", Tier::Fresh),
            ("I5", Tier::VeryFresh),
        ]
    );
    assert!(outcome.found_new);
    assert!(outcome.failure.is_none());

    // Second run over the same page: everything deduped, nothing new.
    let raw = vec![
        ad("P1", "1 minute ago"),
        ad("P2", "1 minute ago"),
        ad("I3", "6 minutes ago"),
        ad("I4", "46 minutes ago"),
        ad("I5", "6 minutes ago"),
    ];
    let outcome = filter_new_fresh(&source(), raw, Utc::now(), &policy(), &limits(), &store);
    assert!(outcome.items.is_empty());
    assert!(!outcome.found_new);
}

#[test]
fn unparseable_timestamps_count_toward_the_stale_run() {
    let (_dir, store) = fresh_store();
    let lim = ScanLimits {
        skip_first_n: 0,
        ..limits()
    };
    let raw = vec![
        ad("u1", "Unknown date"),
        ad("u2", ""),
        ad("u3", "soon(tm)"),
        ad("fresh-below", "1 minute ago"),
    ];

    let outcome = filter_new_fresh(&source(), raw, Utc::now(), &policy(), &lim, &store);
    assert_eq!(outcome.examined, 3);
    assert!(outcome.items.is_empty());
}

struct EmptyPage;

#[async_trait::async_trait]
impl PageFetcher for EmptyPage {
    async fn fetch(&self, _: &TrackedSource, _: usize) -> Result<Vec<RawItem>, FetchError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn empty_fetch_is_a_failure_not_a_quiet_scan() {
    let (_dir, store) = fresh_store();
    let outcome = scan_source(&EmptyPage, &source(), Utc::now(), &policy(), &limits(), &store).await;
    assert_eq!(outcome.failure, Some(FetchError::Empty));
    assert!(!outcome.found_new);
    assert!(outcome.items.is_empty());
}
