//! Core controller logic
//!
//! Service identity, readiness probing and bounded polling. Everything here
//! talks to the outside world only through the service layer.

pub mod polling;
pub mod prober;
pub mod registry;

pub use polling::{run_health_checks, wait_for_all, wait_until, WaitOptions, MAX_CONCURRENT_CHECKS};
pub use prober::HealthProber;
pub use registry::ServiceRegistry;
