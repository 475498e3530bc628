use eyre::{eyre, Result};
use futures::channel::oneshot;
use futures::executor::block_on;
use parking_lot::Mutex;
use snapshot_timeline::analytics_cache::{
    AnalyticsCache, AnalyticsProvider, AnalyticsState, CommitOutcome, Lookup,
};
use snapshot_timeline::data_types::{AnalyticsKey, CategoryStat, LargestItem, SnapshotAnalytics};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

fn analytics_for(timestamp: i64) -> SnapshotAnalytics {
    SnapshotAnalytics {
        categories: vec![CategoryStat {
            extension: format!("ext{}", timestamp),
            count: 3,
            total_size: 300,
        }],
        top_items: vec![LargestItem {
            name: "big.iso".into(),
            size: 4_000,
            path: format!("/snap/{}/big.iso", timestamp),
        }],
    }
}

fn expect_ticket(lookup: Lookup) -> snapshot_timeline::analytics_cache::FetchTicket {
    match lookup {
        Lookup::Fetch(ticket) => ticket,
        other => panic!("expected a fetch ticket, got {:?}", other),
    }
}

/// Provider whose category query waits on a per-timestamp gate.
#[derive(Default)]
struct GatedProvider {
    gates: Mutex<HashMap<i64, oneshot::Receiver<()>>>,
    failing: HashSet<i64>,
    calls: AtomicUsize,
}

impl GatedProvider {
    fn gate(&self, timestamp: i64) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(timestamp, rx);
        tx
    }
}

impl AnalyticsProvider for GatedProvider {
    async fn fetch_category_breakdown(
        &self,
        _owner_id: &str,
        timestamp: i64,
        limit: usize,
    ) -> Result<Vec<CategoryStat>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().remove(&timestamp);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if self.failing.contains(&timestamp) {
            return Err(eyre!("snapshot {} not found in index", timestamp));
        }
        let mut categories = analytics_for(timestamp).categories;
        categories.truncate(limit);
        Ok(categories)
    }

    async fn fetch_top_items(
        &self,
        _owner_id: &str,
        timestamp: i64,
        limit: usize,
    ) -> Result<Vec<LargestItem>> {
        let mut items = analytics_for(timestamp).top_items;
        items.truncate(limit);
        Ok(items)
    }
}

#[test]
fn test_miss_then_hit() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));
    assert!(cache.state().is_loading());

    assert_eq!(cache.complete(ticket, Ok(analytics_for(1))), CommitOutcome::Stored);
    assert_eq!(cache.state().analytics().map(|a| &**a), Some(&analytics_for(1)));

    match cache.request("job", 1) {
        Lookup::Cached(a) => assert_eq!(*a, analytics_for(1)),
        other => panic!("expected a cache hit, got {:?}", other),
    }
    assert!(!cache.state().is_loading());
}

#[test]
fn test_stale_result_is_discarded() {
    let cache = AnalyticsCache::new();
    let ticket_a = expect_ticket(cache.request("job", 1));
    let ticket_b = expect_ticket(cache.request("job", 2));

    assert_eq!(cache.complete(ticket_a, Ok(analytics_for(1))), CommitOutcome::Discarded);
    assert!(!cache.contains("job", 1));
    assert_eq!(cache.state(), AnalyticsState::Loading(AnalyticsKey::new("job", 2)));

    assert_eq!(cache.complete(ticket_b, Ok(analytics_for(2))), CommitOutcome::Stored);
    assert!(cache.contains("job", 2));
    assert_eq!(cache.state().key(), Some(&AnalyticsKey::new("job", 2)));
}

#[test]
fn test_cache_hit_supersedes_pending_fetch() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));
    cache.complete(ticket, Ok(analytics_for(1)));

    let pending = expect_ticket(cache.request("job", 2));
    assert!(matches!(cache.request("job", 1), Lookup::Cached(_)));

    assert_eq!(cache.complete(pending, Ok(analytics_for(2))), CommitOutcome::Discarded);
    assert!(!cache.contains("job", 2));
    assert_eq!(cache.state().analytics().map(|a| &**a), Some(&analytics_for(1)));
}

#[test]
fn test_owner_is_part_of_the_key() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job-a", 1));
    cache.complete(ticket, Ok(analytics_for(1)));

    assert!(matches!(cache.request("job-b", 1), Lookup::Fetch(_)));
}

#[test]
fn test_duplicate_request_while_in_flight() {
    let cache = AnalyticsCache::new();
    let _ticket = expect_ticket(cache.request("job", 1));
    assert_eq!(cache.request("job", 1), Lookup::InFlight);
}

#[test]
fn test_failure_is_not_cached() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));

    let outcome = cache.complete(ticket, Err(eyre!("transport closed")));
    assert_eq!(outcome, CommitOutcome::Failed);
    assert!(cache.is_empty());
    match cache.state() {
        AnalyticsState::Failed { key, message } => {
            assert_eq!(key, AnalyticsKey::new("job", 1));
            assert!(message.contains("transport closed"));
        }
        other => panic!("expected failure state, got {:?}", other),
    }

    // No poisoning: asking again starts a new fetch.
    assert!(matches!(cache.request("job", 1), Lookup::Fetch(_)));
}

#[test]
fn test_stale_failure_is_discarded() {
    let cache = AnalyticsCache::new();
    let ticket_a = expect_ticket(cache.request("job", 1));
    let _ticket_b = expect_ticket(cache.request("job", 2));
    assert_eq!(cache.complete(ticket_a, Err(eyre!("boom"))), CommitOutcome::Discarded);
    assert!(cache.state().is_loading());
}

#[test]
fn test_cancel_outstanding() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));
    cache.cancel_outstanding();
    assert_eq!(cache.state(), AnalyticsState::Idle);
    assert_eq!(cache.complete(ticket, Ok(analytics_for(1))), CommitOutcome::Discarded);
    assert!(cache.is_empty());
}

#[test]
fn test_async_race_last_selection_wins() {
    let cache = AnalyticsCache::new();
    let provider = GatedProvider::default();
    let open_a = provider.gate(1);
    let open_b = provider.gate(2);

    let (state_a, state_b, ()) = block_on(async {
        futures::join!(
            cache.load(&provider, "job", 1, 10),
            cache.load(&provider, "job", 2, 10),
            async move {
                // Both fetches are parked on their gates by now; A resolves first.
                open_a.send(()).unwrap();
                open_b.send(()).unwrap();
            }
        )
    });

    // A finished while B was outstanding: nothing of A was written or shown.
    assert_eq!(state_a, AnalyticsState::Loading(AnalyticsKey::new("job", 2)));
    assert!(!cache.contains("job", 1));

    assert_eq!(state_b.key(), Some(&AnalyticsKey::new("job", 2)));
    assert_eq!(state_b.analytics().map(|a| &**a), Some(&analytics_for(2)));
    assert!(cache.contains("job", 2));
}

#[test]
fn test_async_load_serves_cache_without_fetching() {
    let cache = AnalyticsCache::new();
    let provider = GatedProvider::default();

    let first = block_on(cache.load(&provider, "job", 5, 10));
    assert!(first.analytics().is_some());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let second = block_on(cache.load(&provider, "job", 5, 10));
    assert_eq!(second, first);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_async_failure_surfaces_error_state() {
    let cache = AnalyticsCache::new();
    let provider = GatedProvider {
        failing: HashSet::from([9]),
        ..Default::default()
    };

    let state = block_on(cache.load(&provider, "job", 9, 10));
    match state {
        AnalyticsState::Failed { message, .. } => {
            assert!(message.contains("category breakdown"), "{}", message);
            assert!(message.contains("not found"), "{}", message);
        }
        other => panic!("expected failure state, got {:?}", other),
    }
    assert!(cache.is_empty());
}

#[test]
fn test_clones_share_state() {
    let cache = AnalyticsCache::new();
    let handle = cache.clone();
    let ticket = expect_ticket(cache.request("job", 1));
    handle.complete(ticket, Ok(analytics_for(1)));
    assert!(cache.contains("job", 1));
    assert_eq!(handle.len(), 1);
}

#[test]
fn test_dropped_ticket_releases_the_key() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));
    drop(ticket);

    assert_eq!(cache.state(), AnalyticsState::Idle);
    assert_eq!(cache.outstanding(), None);
    assert!(matches!(cache.request("job", 1), Lookup::Fetch(_)));
}

#[test]
fn test_dropping_a_stale_ticket_keeps_the_current_request() {
    let cache = AnalyticsCache::new();
    let old = expect_ticket(cache.request("job", 1));
    let _current = expect_ticket(cache.request("job", 2));
    drop(old);

    assert_eq!(cache.state(), AnalyticsState::Loading(AnalyticsKey::new("job", 2)));
    assert_eq!(cache.request("job", 2), Lookup::InFlight);
}

#[test]
fn test_abandoned_load_is_fetched_again() {
    use futures::FutureExt;

    let cache = AnalyticsCache::new();
    let provider = GatedProvider::default();
    let _held = provider.gate(1);

    let mut pending = Box::pin(cache.load(&provider, "job", 1, 10));
    assert!(pending.as_mut().now_or_never().is_none());
    assert!(cache.state().is_loading());
    drop(pending);

    // The host gave up on the first load; the next one must reach the provider.
    let state = block_on(cache.load(&provider, "job", 1, 10));
    assert_eq!(state.analytics().map(|a| &**a), Some(&analytics_for(1)));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalidate_owner_discards_running_fetch() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));
    cache.invalidate_owner("job");

    assert_eq!(cache.state(), AnalyticsState::Idle);
    assert_eq!(cache.complete(ticket, Ok(analytics_for(1))), CommitOutcome::Discarded);
    assert!(!cache.contains("job", 1));
}

#[test]
fn test_invalidate_owner_clears_shown_analytics() {
    let cache = AnalyticsCache::new();
    let ticket = expect_ticket(cache.request("job", 1));
    cache.complete(ticket, Ok(analytics_for(1)));
    assert!(cache.state().analytics().is_some());

    cache.invalidate_owner("job");
    assert_eq!(cache.state(), AnalyticsState::Idle);
    assert!(matches!(cache.request("job", 1), Lookup::Fetch(_)));
}

#[test]
fn test_invalidating_another_owner_keeps_the_view() {
    let cache = AnalyticsCache::new();
    let _ticket = expect_ticket(cache.request("job-a", 1));
    cache.invalidate_owner("job-b");
    assert_eq!(cache.state(), AnalyticsState::Loading(AnalyticsKey::new("job-a", 1)));
}

#[test]
fn test_load_future_is_send() {
    fn assert_send<T: Send>(_: &T) {}

    let cache = AnalyticsCache::new();
    let provider = GatedProvider::default();
    let load = cache.load(&provider, "job", 1, 10);
    assert_send(&load);
    drop(load);
}
