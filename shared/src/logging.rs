//! Shared logging utilities for consistent tracing across the toolkit

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Crates whose events are shown at the requested level
const WORKSPACE_TARGETS: [&str; 4] = ["controller", "harness", "envctl", "shared"];

/// Build the env filter directive for a base level
///
/// `RUST_LOG` still wins when it is set, so ad-hoc debugging of a single
/// module does not need a rebuild.
pub fn filter_directive(log_level: Option<&str>) -> String {
    if let Ok(from_env) = std::env::var("RUST_LOG") {
        if !from_env.trim().is_empty() {
            return from_env;
        }
    }

    let base_level = log_level.unwrap_or("info");
    let mut directive = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={base_level}"))
        .collect::<Vec<_>>();
    directive.push("reqwest=warn".to_string());
    directive.push("hyper=warn".to_string());
    directive.join(",")
}

/// Initialize tracing subscriber with an optional log level
///
/// Safe to call more than once (e.g. from several tests); only the first
/// call installs the subscriber.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = filter_directive(log_level);

    let _ = fmt()
        .with_env_filter(EnvFilter::new(&directive))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: &str, details: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: &str, reason: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: &str, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: &str, message: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
