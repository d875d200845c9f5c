//! Test harness for container based test environments
//!
//! Layers configuration from files and the environment, wraps the
//! environment controller in a per-run session context and provides HTTP
//! health checks plus an admin client for Wiremock stub services.

pub mod checks;
pub mod config;
pub mod error;
pub mod session;
pub mod stub_admin;

pub use checks::UrlHealthCheck;
pub use self::config::{EnvironmentConfig, EnvironmentConfigBuilder};
pub use error::{HarnessError, HarnessResult};
pub use session::TestSession;
pub use stub_admin::WiremockController;
