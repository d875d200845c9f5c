//! Service implementations
//!
//! Real implementations of the external command surfaces: the process
//! invoker, the compose CLI and the container runtime CLI.

pub mod compose;
pub mod docker;
pub mod runner;

pub use compose::Compose;
pub use docker::{ContainerAction, DockerCli};
pub use runner::RealCommandRunner;
