use crate::data_types::{Event, Marker, TimeRange};
use crate::scales::TrackScale;
use tracing::debug;

/// Keyboard navigation along the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationKey {
    Previous,
    Next,
    First,
    Last,
}

/// SelectionController owns the selected snapshot and the interaction rules around it,
/// independently of any UI toolkit.
///
/// Every operation takes the active event list, which must be ascending by timestamp.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionController {
    selected: Option<i64>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    /// Position of the selection within `events`.
    pub fn selected_index(&self, events: &[Event]) -> Option<usize> {
        let ts = self.selected?;
        events.binary_search_by_key(&ts, |e| e.timestamp).ok()
    }

    pub fn selected_event<'a>(&self, events: &'a [Event]) -> Option<&'a Event> {
        self.selected_index(events).map(|i| &events[i])
    }

    /// Selects `timestamp` if it belongs to `events`. Returns whether the selection changed.
    pub fn select(&mut self, timestamp: i64, events: &[Event]) -> bool {
        if events.binary_search_by_key(&timestamp, |e| e.timestamp).is_err() {
            return false;
        }
        self.set(Some(timestamp))
    }

    /// Selects the event closest to `click_position` if it is within `max_snap_distance`.
    /// A miss leaves the selection alone.
    pub fn select_nearest(
        &mut self,
        click_position: f64,
        events: &[Event],
        range: TimeRange,
        max_snap_distance: f64,
    ) -> bool {
        let scale = TrackScale::new(range);
        let nearest = events
            .iter()
            .map(|e| ((scale.map(e.timestamp) - click_position).abs(), e.timestamp))
            .min_by(|(a, _), (b, _)| a.total_cmp(b));

        match nearest {
            Some((distance, ts)) if distance < max_snap_distance => self.set(Some(ts)),
            _ => false,
        }
    }

    /// Hit-tests rendered markers. A hit on a cluster selects its representative, so the
    /// result is always an event the user can see a marker for.
    pub fn select_nearest_marker(
        &mut self,
        click_position: f64,
        markers: &[Marker],
        max_snap_distance: f64,
    ) -> bool {
        let nearest = markers
            .iter()
            .filter_map(|m| Some(((m.position - click_position).abs(), m.representative()?)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b));

        match nearest {
            Some((distance, event)) if distance < max_snap_distance => {
                self.set(Some(event.timestamp))
            }
            _ => false,
        }
    }

    pub fn step_next(&mut self, events: &[Event]) -> bool {
        match self.selected_index(events) {
            Some(i) if i + 1 < events.len() => self.set(Some(events[i + 1].timestamp)),
            _ => false,
        }
    }

    pub fn step_previous(&mut self, events: &[Event]) -> bool {
        match self.selected_index(events) {
            Some(i) if i > 0 => self.set(Some(events[i - 1].timestamp)),
            _ => false,
        }
    }

    pub fn select_first(&mut self, events: &[Event]) -> bool {
        match events.first() {
            Some(e) => self.set(Some(e.timestamp)),
            None => false,
        }
    }

    pub fn select_last(&mut self, events: &[Event]) -> bool {
        match events.last() {
            Some(e) => self.set(Some(e.timestamp)),
            None => false,
        }
    }

    pub fn handle_key(&mut self, key: NavigationKey, events: &[Event]) -> bool {
        match key {
            NavigationKey::Previous => self.step_previous(events),
            NavigationKey::Next => self.step_next(events),
            NavigationKey::First => self.select_first(events),
            NavigationKey::Last => self.select_last(events),
        }
    }

    pub fn clear(&mut self) -> bool {
        self.set(None)
    }

    /// Keeps the selection if it is still in `events`, otherwise falls back to the most
    /// recent event (or nothing for an empty list).
    pub fn reconcile(&mut self, events: &[Event]) -> bool {
        if self.selected_index(events).is_some() {
            return false;
        }
        self.set(events.last().map(|e| e.timestamp))
    }

    fn set(&mut self, timestamp: Option<i64>) -> bool {
        if self.selected == timestamp {
            return false;
        }
        debug!(from = ?self.selected, to = ?timestamp, "selection changed");
        self.selected = timestamp;
        true
    }
}
