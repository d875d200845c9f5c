//! Environment controller for multi-container test environments
//!
//! Brings a compose project up, waits for its services to become ready,
//! injects container level faults with guaranteed recovery and collects
//! per-service logs and resource statistics for the session.

pub mod core;
pub mod environment;
pub mod error;
pub mod faults;
pub mod plugins;
pub mod services;
pub mod settings;
pub mod traits;

// Re-export commonly used types
pub use core::{run_health_checks, HealthProber, ServiceRegistry, WaitOptions};
pub use environment::{EnvironmentController, EnvironmentPhase};
pub use error::{ControllerError, ControllerResult};
pub use faults::RecoveryOptions;
pub use plugins::{LogCollector, StatsCollector};
pub use services::{Compose, ContainerAction, DockerCli, RealCommandRunner};
pub use settings::EnvironmentSettings;
pub use traits::{CommandRunner, CommandSpec, HealthCheck, SessionPlugin, StreamingProcess};
