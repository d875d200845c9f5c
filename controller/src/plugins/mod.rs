//! Session plugins
//!
//! The closed set of lifecycle observers the controller drives: the log
//! collector (always present) and the stats collector (opt-in).

pub mod logs;
pub mod stats;
pub mod summary;

pub use logs::LogCollector;
pub use stats::StatsCollector;
pub use summary::{ClusterStatsSummary, ContainerStats, StatsReport};
