//! Statistics and metrics for the broadcast hub

pub mod metrics;

pub use metrics::{HubStats, HubStatsSnapshot};
