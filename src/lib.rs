//! snapshot_timeline crate for navigating backup snapshot history

pub mod analytics_cache;
pub mod axis_labels;
pub mod data_types;
pub mod decimation;
pub mod navigator;
pub mod scales;
pub mod selection;
pub mod stats;
pub mod utils;

pub use analytics_cache::{AnalyticsCache, AnalyticsProvider, AnalyticsState, Lookup};
pub use data_types::{Event, Label, Marker, SnapshotStatus, TimeRange, TimelineConfig, TrackFrame};
pub use navigator::{ShellOpener, TimelineNavigator};
pub use selection::{NavigationKey, SelectionController};
