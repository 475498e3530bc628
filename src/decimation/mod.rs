pub mod cluster;
pub mod stride;

pub use cluster::{anchored_runs, cluster_events};
pub use stride::{sample_stride, stride_indices};
