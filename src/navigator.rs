// TimelineNavigator implementation

use crate::analytics_cache::{AnalyticsCache, AnalyticsProvider, AnalyticsState, Lookup};
use crate::axis_labels::LabelPlanner;
use crate::data_types::{
    normalize_events, Event, Marker, StatusFilter, TimeRange, TimelineConfig, TrackFrame,
};
use crate::decimation::cluster_events;
use crate::selection::{NavigationKey, SelectionController};
use crate::stats::{aggregate_stats, snapshot_density, AggregateStats, DensityPeriod, SnapshotDensity};
use crate::utils::date_formatter::format_timestamp;
use eyre::Result;
use std::future::Future;
use tracing::{debug, info, warn};

/// Host shell hook used to reveal a snapshot on disk. Fire and forget.
pub trait ShellOpener {
    fn open_external(&self, path: &str) -> Result<()>;
}

/// State machine behind the snapshot timeline of one owner (backup job).
///
/// The host feeds it events, a range and input; it answers with [`TrackFrame`]s and keeps
/// the selection and the selected snapshot's analytics consistent.
pub struct TimelineNavigator {
    owner_id: String,
    config: TimelineConfig,
    /// Every event of the owner, normalized.
    events: Vec<Event>,
    /// `events` after the status filter.
    active: Vec<Event>,
    filter: StatusFilter,
    range: Option<TimeRange>,
    selection: SelectionController,
    analytics: AnalyticsCache,
}

impl TimelineNavigator {
    pub fn new(owner_id: impl Into<String>, config: TimelineConfig) -> Self {
        let config = config.sanitized();
        let analytics = AnalyticsCache::from_capacity(config.analytics_cache_capacity);
        Self {
            owner_id: owner_id.into(),
            config,
            events: Vec::new(),
            active: Vec::new(),
            filter: StatusFilter::All,
            range: None,
            selection: SelectionController::new(),
            analytics,
        }
    }

    /// Shares an existing cache, e.g. one kept alive across several navigators.
    pub fn with_cache(mut self, cache: AnalyticsCache) -> Self {
        self.analytics = cache;
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events currently on the track.
    pub fn active_events(&self) -> &[Event] {
        &self.active
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn analytics_cache(&self) -> &AnalyticsCache {
        &self.analytics
    }

    /// Replaces the owner's history. The selection survives if its snapshot still exists.
    pub fn set_events(&mut self, events: Vec<Event>) {
        self.events = normalize_events(events);
        self.refresh_active();
    }

    /// Switches to another owner's history, starting from its most recent snapshot.
    pub fn set_owner(&mut self, owner_id: impl Into<String>, events: Vec<Event>) {
        self.owner_id = owner_id.into();
        info!(owner = %self.owner_id, count = events.len(), "timeline owner changed");
        self.selection.clear();
        self.analytics.cancel_outstanding();
        self.set_events(events);
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        self.refresh_active();
    }

    /// Fixes the visible time range. `None` fits the range to the active events.
    pub fn set_range(&mut self, range: Option<TimeRange>) {
        self.range = range;
    }

    pub fn range(&self) -> TimeRange {
        self.range
            .or_else(|| TimeRange::spanning(&self.active))
            .unwrap_or_default()
    }

    pub fn selection(&self) -> Option<i64> {
        self.selection.selected()
    }

    pub fn selected_event(&self) -> Option<&Event> {
        self.selection.selected_event(&self.active)
    }

    /// Tooltip text for the selected snapshot.
    pub fn selection_caption(&self) -> Option<String> {
        self.selection()
            .map(|ts| format_timestamp(ts, self.config.timezone))
    }

    /// Markers, labels and selection for the current inputs.
    pub fn render(&self) -> TrackFrame {
        let range = self.range();
        TrackFrame {
            markers: self.markers(range),
            labels: LabelPlanner::from_config(&self.config).plan(range),
            selection: self.selection.selected(),
        }
    }

    pub fn on_select(&mut self, timestamp: i64) -> bool {
        self.selection.select(timestamp, &self.active)
    }

    pub fn on_step_next(&mut self) -> bool {
        self.selection.step_next(&self.active)
    }

    pub fn on_step_previous(&mut self) -> bool {
        self.selection.step_previous(&self.active)
    }

    pub fn on_key(&mut self, key: NavigationKey) -> bool {
        self.selection.handle_key(key, &self.active)
    }

    /// Click on the track at `position` (percent), hit-tested against the rendered markers.
    /// Misses are ignored. Returns whether the selection changed.
    pub fn on_click_track(&mut self, position: f64) -> bool {
        let markers = self.markers(self.range());
        self.selection
            .select_nearest_marker(position, &markers, self.config.snap_distance_pct)
    }

    /// Registers the selected snapshot with the analytics cache.
    ///
    /// On [`Lookup::Fetch`] the host runs the fetch and passes the result to
    /// [`AnalyticsCache::complete`] with the returned ticket.
    pub fn request_analytics(&self) -> Option<Lookup> {
        let Some(ts) = self.selection() else {
            self.analytics.cancel_outstanding();
            return None;
        };
        Some(self.analytics.request(&self.owner_id, ts))
    }

    /// Fetches (or serves from cache) analytics for the selected snapshot.
    ///
    /// The request is registered right away; the returned future only runs the fetch and
    /// does not borrow the navigator, so the selection can keep moving while it is pending.
    /// A later `load_analytics` for another snapshot makes this one's result stale.
    pub fn load_analytics<'p, P: AnalyticsProvider>(
        &self,
        provider: &'p P,
    ) -> impl Future<Output = AnalyticsState> + Send + 'p {
        let cache = self.analytics.clone();
        let lookup = self.request_analytics();
        let limit = self.config.analytics_limit;
        async move {
            match lookup {
                Some(lookup) => cache.settle(lookup, provider, limit).await,
                None => AnalyticsState::Idle,
            }
        }
    }

    pub fn analytics_state(&self) -> AnalyticsState {
        self.analytics.state()
    }

    /// Asks the host shell to reveal the selected snapshot. Failures are only logged.
    pub fn reveal_selected<O: ShellOpener>(&self, opener: &O) {
        let Some(path) = self.selected_event().and_then(|e| e.path.as_deref()) else {
            debug!("nothing to reveal");
            return;
        };
        if let Err(err) = opener.open_external(path) {
            warn!(path, "failed to reveal snapshot: {err:#}");
        }
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        aggregate_stats(&self.active)
    }

    pub fn density(&self, period: DensityPeriod) -> Vec<SnapshotDensity> {
        snapshot_density(&self.active, period, self.config.timezone)
    }

    fn markers(&self, range: TimeRange) -> Vec<Marker> {
        cluster_events(
            &self.active,
            range,
            self.config.cluster_threshold_pct,
            self.config.max_markers,
        )
    }

    fn refresh_active(&mut self) {
        self.active = self.filter.apply(&self.events);
        if self.selection.reconcile(&self.active) {
            debug!(selection = ?self.selection.selected(), "selection reconciled");
        }
        if self.selection.selected().is_none() {
            self.analytics.cancel_outstanding();
        }
    }
}
