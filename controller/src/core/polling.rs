//! Bounded polling loops with soft timeouts
//!
//! "Not ready yet" is the expected case, so every loop here reports through
//! a boolean and never through an error.

use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, warn};

use crate::traits::HealthCheck;

/// Upper bound on checks evaluated at the same time
pub const MAX_CONCURRENT_CHECKS: usize = 8;

/// Interval and timeout of a readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Poll `check` until it returns true or `deadline` passes
///
/// The check runs at least once. A single wedged check is cut off at the
/// deadline instead of stretching it.
pub async fn poll_until<F, Fut>(mut check: F, interval: Duration, deadline: Instant) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        if let Ok(true) = timeout_at(deadline, check()).await {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep_until(std::cmp::min(now + interval, deadline)).await;
    }
}

/// Poll a single check with its own deadline
pub async fn wait_until<F, Fut>(check: F, options: WaitOptions) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_until(check, options.interval, options.deadline()).await
}

/// Poll every labelled check concurrently against one shared deadline
///
/// True iff every check passed before the deadline.
pub async fn wait_for_all<F, Fut>(checks: Vec<(String, F)>, options: WaitOptions) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = options.deadline();
    let interval = options.interval;

    let results: Vec<(String, bool)> = stream::iter(checks)
        .map(|(label, check)| async move {
            let passed = poll_until(check, interval, deadline).await;
            debug!("Check {} passed: {}", label, passed);
            (label, passed)
        })
        .buffer_unordered(MAX_CONCURRENT_CHECKS)
        .collect()
        .await;

    let failed: Vec<&str> = results
        .iter()
        .filter(|(_, passed)| !passed)
        .map(|(label, _)| label.as_str())
        .collect();

    if failed.is_empty() {
        true
    } else {
        warn!("⏰ Checks did not pass within {:?}: {:?}", options.timeout, failed);
        false
    }
}

/// Run caller supplied health checks in parallel until all pass or time runs out
pub async fn run_health_checks(checks: &[&dyn HealthCheck], options: WaitOptions) -> bool {
    let labelled = checks
        .iter()
        .enumerate()
        .map(|(index, check)| {
            let check: &dyn HealthCheck = *check;
            (format!("health-check-{index}"), move || check.check())
        })
        .collect();
    wait_for_all(labelled, options).await
}
