use super::event::Event;
use serde::{Deserialize, Serialize};

/// A renderable point on the track standing for one or more events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Track position in [0, 100]. Average of the members' positions for a cluster.
    pub position: f64,
    /// Never empty, ascending by timestamp.
    pub members: Vec<Event>,
    pub is_cluster: bool,
}

impl Marker {
    pub fn new(position: f64, members: Vec<Event>) -> Self {
        let is_cluster = members.len() > 1;
        Self {
            position,
            members,
            is_cluster,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The most recent member, used when a whole cluster has to stand for one event.
    pub fn representative(&self) -> Option<&Event> {
        self.members.last()
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.members
            .binary_search_by_key(&timestamp, |e| e.timestamp)
            .is_ok()
    }

    /// (earliest, latest) member timestamps.
    pub fn time_span(&self) -> Option<(i64, i64)> {
        Some((self.members.first()?.timestamp, self.members.last()?.timestamp))
    }
}

/// A calendar month tick on the axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub position: f64,
    pub text: String,
    /// First instant of the month, ms since epoch.
    pub timestamp: i64,
    /// January of some year.
    pub is_year_boundary: bool,
}

/// Everything the host needs to draw the track.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFrame {
    pub markers: Vec<Marker>,
    pub labels: Vec<Label>,
    pub selection: Option<i64>,
}

impl TrackFrame {
    /// Marker holding the current selection, if it survived down-sampling.
    pub fn selected_marker(&self) -> Option<&Marker> {
        let ts = self.selection?;
        self.markers.iter().find(|m| m.contains(ts))
    }
}
