//! Per-snapshot analytics with last-selection-wins commits.
//!
//! A fetch result is only committed if its key is still the outstanding request when it
//! completes. Anything else is a stale completion and is dropped without touching the cache
//! or the panel state.

use crate::data_types::{AnalyticsKey, CategoryStat, LargestItem, SnapshotAnalytics};
use eyre::{Result, WrapErr};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Backend queries behind the analytics panel. Either call may fail (transport, not found).
///
/// The returned futures are `Send` so a load can run on a multi-threaded executor.
pub trait AnalyticsProvider: Sync {
    fn fetch_category_breakdown(
        &self,
        owner_id: &str,
        timestamp: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<CategoryStat>>> + Send;

    fn fetch_top_items(
        &self,
        owner_id: &str,
        timestamp: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LargestItem>>> + Send;
}

/// Runs both provider queries concurrently and bundles the results.
pub async fn fetch_analytics<P: AnalyticsProvider>(
    provider: &P,
    owner_id: &str,
    timestamp: i64,
    limit: usize,
) -> Result<SnapshotAnalytics> {
    let (categories, top_items) = futures::future::join(
        provider.fetch_category_breakdown(owner_id, timestamp, limit),
        provider.fetch_top_items(owner_id, timestamp, limit),
    )
    .await;

    Ok(SnapshotAnalytics {
        categories: categories.wrap_err("Failed to fetch category breakdown")?,
        top_items: top_items.wrap_err("Failed to fetch largest items")?,
    })
}

/// What the analytics panel should show.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AnalyticsState {
    #[default]
    Idle,
    Loading(AnalyticsKey),
    Ready {
        key: AnalyticsKey,
        analytics: Arc<SnapshotAnalytics>,
    },
    Failed {
        key: AnalyticsKey,
        message: String,
    },
}

impl AnalyticsState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    pub fn key(&self) -> Option<&AnalyticsKey> {
        match self {
            Self::Idle => None,
            Self::Loading(key) | Self::Ready { key, .. } | Self::Failed { key, .. } => Some(key),
        }
    }

    pub fn analytics(&self) -> Option<&Arc<SnapshotAnalytics>> {
        match self {
            Self::Ready { analytics, .. } => Some(analytics),
            _ => None,
        }
    }
}

/// Permission to commit one fetch result. Handed out by [`AnalyticsCache::request`].
///
/// Dropping a ticket without completing it abandons the fetch: if it is still the
/// outstanding request, the cache goes back to idle so the key can be fetched again.
#[derive(Debug)]
pub struct FetchTicket {
    key: AnalyticsKey,
    generation: u64,
    cache: Weak<Mutex<CacheState>>,
    settled: bool,
}

impl FetchTicket {
    pub fn key(&self) -> &AnalyticsKey {
        &self.key
    }
}

impl PartialEq for FetchTicket {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.generation == other.generation
    }
}

impl Eq for FetchTicket {}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Some(inner) = self.cache.upgrade() else {
            return;
        };
        let mut state = inner.lock();
        if state.generation == self.generation {
            trace!(key = ?self.key, "analytics fetch abandoned");
            state.reset();
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Lookup {
    /// Served from the cache; no fetch, no loading state.
    Cached(Arc<SnapshotAnalytics>),
    /// The caller must run the fetch and hand the result to [`AnalyticsCache::complete`].
    Fetch(FetchTicket),
    /// The same key is already being fetched.
    InFlight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Stored,
    Failed,
    /// The selection moved on before the fetch finished.
    Discarded,
}

#[derive(Debug)]
struct Entry {
    analytics: Arc<SnapshotAnalytics>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<AnalyticsKey, Entry>,
    /// `last_used` tick -> key, oldest first.
    recency: BTreeMap<u64, AnalyticsKey>,
    tick: u64,
    capacity: Option<usize>,
    outstanding: Option<AnalyticsKey>,
    /// Bumped whenever `outstanding` is replaced or cleared.
    generation: u64,
    view: AnalyticsState,
}

impl CacheState {
    fn lookup(&mut self, key: &AnalyticsKey) -> Option<Arc<SnapshotAnalytics>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = tick;
        self.recency.insert(tick, key.clone());
        Some(entry.analytics.clone())
    }

    fn insert(&mut self, key: AnalyticsKey, analytics: Arc<SnapshotAnalytics>) {
        if self.capacity == Some(0) {
            return;
        }
        self.tick += 1;
        let entry = Entry {
            analytics,
            last_used: self.tick,
        };
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.recency.remove(&old.last_used);
        }
        self.recency.insert(self.tick, key);

        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                let Some((_, oldest)) = self.recency.pop_first() else {
                    break;
                };
                debug!(?oldest, "evicting analytics entry");
                self.entries.remove(&oldest);
            }
        }
    }

    fn set_outstanding(&mut self, key: Option<AnalyticsKey>) {
        self.outstanding = key;
        self.generation += 1;
    }

    fn reset(&mut self) {
        self.set_outstanding(None);
        self.view = AnalyticsState::Idle;
    }
}

/// Session-scoped analytics cache keyed by (owner, snapshot timestamp).
///
/// Cloning shares the same state, so a handle can be moved into the task awaiting a fetch.
#[derive(Clone, Debug, Default)]
pub struct AnalyticsCache {
    inner: Arc<Mutex<CacheState>>,
}

impl AnalyticsCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache keeping at most `capacity` entries, evicting the least recently used.
    pub fn with_capacity(capacity: usize) -> Self {
        let cache = Self::default();
        cache.inner.lock().capacity = Some(capacity);
        cache
    }

    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(cap) => Self::with_capacity(cap),
            None => Self::new(),
        }
    }

    /// Makes `(owner_id, timestamp)` the outstanding request.
    ///
    /// Any fetch still running for a different key becomes stale.
    pub fn request(&self, owner_id: &str, timestamp: i64) -> Lookup {
        let key = AnalyticsKey::new(owner_id, timestamp);
        let mut state = self.inner.lock();

        if let Some(analytics) = state.lookup(&key) {
            trace!(?key, "analytics cache hit");
            state.set_outstanding(Some(key.clone()));
            state.view = AnalyticsState::Ready {
                key,
                analytics: analytics.clone(),
            };
            return Lookup::Cached(analytics);
        }

        if state.outstanding.as_ref() == Some(&key)
            && matches!(&state.view, AnalyticsState::Loading(k) if *k == key)
        {
            return Lookup::InFlight;
        }

        debug!(?key, "analytics cache miss, fetching");
        state.set_outstanding(Some(key.clone()));
        state.view = AnalyticsState::Loading(key.clone());
        Lookup::Fetch(FetchTicket {
            key,
            generation: state.generation,
            cache: Arc::downgrade(&self.inner),
            settled: false,
        })
    }

    /// Commits a finished fetch if its key is still outstanding.
    pub fn complete(&self, mut ticket: FetchTicket, result: Result<SnapshotAnalytics>) -> CommitOutcome {
        ticket.settled = true;
        let key = ticket.key.clone();
        let mut state = self.inner.lock();

        if state.outstanding.as_ref() != Some(&key) {
            trace!(?key, "discarding stale analytics result");
            return CommitOutcome::Discarded;
        }
        // Settled: other tickets for this key must not reset the view when dropped.
        state.generation += 1;

        match result {
            Ok(analytics) => {
                let analytics = Arc::new(analytics);
                state.insert(key.clone(), analytics.clone());
                state.view = AnalyticsState::Ready { key, analytics };
                CommitOutcome::Stored
            }
            Err(err) => {
                warn!(?key, "analytics fetch failed: {err:#}");
                state.view = AnalyticsState::Failed {
                    key,
                    message: format!("{err:#}"),
                };
                CommitOutcome::Failed
            }
        }
    }

    /// Request, fetch on a miss, commit. Returns the panel state once the call settles,
    /// which belongs to whatever is outstanding by then.
    pub async fn load<P: AnalyticsProvider>(
        &self,
        provider: &P,
        owner_id: &str,
        timestamp: i64,
        limit: usize,
    ) -> AnalyticsState {
        let lookup = self.request(owner_id, timestamp);
        self.settle(lookup, provider, limit).await
    }

    /// Runs the fetch a [`Lookup::Fetch`] asks for and commits it. Other lookups need no
    /// work. Returns the panel state once the call settles.
    pub async fn settle<P: AnalyticsProvider>(
        &self,
        lookup: Lookup,
        provider: &P,
        limit: usize,
    ) -> AnalyticsState {
        if let Lookup::Fetch(ticket) = lookup {
            let AnalyticsKey {
                owner_id,
                timestamp,
            } = ticket.key().clone();
            let result = fetch_analytics(provider, &owner_id, timestamp, limit).await;
            self.complete(ticket, result);
        }
        self.state()
    }

    /// Drops the outstanding request; running fetches will be discarded.
    pub fn cancel_outstanding(&self) {
        self.inner.lock().reset();
    }

    pub fn state(&self) -> AnalyticsState {
        self.inner.lock().view.clone()
    }

    pub fn outstanding(&self) -> Option<AnalyticsKey> {
        self.inner.lock().outstanding.clone()
    }

    pub fn get(&self, owner_id: &str, timestamp: i64) -> Option<Arc<SnapshotAnalytics>> {
        let key = AnalyticsKey::new(owner_id, timestamp);
        self.inner.lock().lookup(&key)
    }

    pub fn contains(&self, owner_id: &str, timestamp: i64) -> bool {
        self.inner
            .lock()
            .entries
            .contains_key(&AnalyticsKey::new(owner_id, timestamp))
    }

    /// Drops every entry of one owner, e.g. after its history was re-indexed.
    ///
    /// A fetch for that owner still running is discarded when it lands, and a panel
    /// showing its data goes back to idle.
    pub fn invalidate_owner(&self, owner_id: &str) {
        let mut state = self.inner.lock();
        state.entries.retain(|k, _| k.owner_id != owner_id);
        state.recency.retain(|_, k| k.owner_id != owner_id);

        let outstanding = state.outstanding.as_ref().is_some_and(|k| k.owner_id == owner_id);
        let shown = state.view.key().is_some_and(|k| k.owner_id == owner_id);
        if outstanding || shown {
            debug!(owner = owner_id, "analytics invalidated while in view");
            state.reset();
        }
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
