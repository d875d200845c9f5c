//! Trait definitions with mockall annotations for testing
//!
//! These are the seams of the controller: the process invoker every external
//! call goes through, the handle of a streaming child process, the session
//! plugins bound to setup/teardown and user supplied health checks.

use crate::error::ControllerResult;
use std::fmt;

/// Fully resolved external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Variables set on top of the inherited process environment
    pub env: Vec<(String, String)>,
    /// Return stderr together with stdout on success
    pub merge_stderr: bool,
}

impl CommandSpec {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            merge_stderr: false,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: &[(String, String)]) -> Self {
        self.env.extend(env.iter().cloned());
        self
    }

    pub fn merge_stderr(mut self, merge: bool) -> Self {
        self.merge_stderr = merge;
        self
    }

    /// True when the argument list ends with the given arguments
    pub fn ends_with(&self, tail: &[&str]) -> bool {
        self.args.len() >= tail.len()
            && self.args[self.args.len() - tail.len()..]
                .iter()
                .zip(tail)
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Process invoker abstraction
///
/// Every orchestration and runtime call goes through this trait, which keeps
/// the controller testable without a container runtime.
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    ///
    /// # Returns
    /// Trimmed stdout (plus stderr when `merge_stderr` is set), or
    /// `ControllerError::ExternalCommand` carrying the combined output on a
    /// non-zero exit.
    async fn run(&self, command: &CommandSpec) -> ControllerResult<String>;

    /// Start a long running command whose stdout is appended to `output`
    ///
    /// Must not block the caller; the returned handle is the only way to
    /// stop the child again.
    fn spawn_streaming(
        &self,
        command: &CommandSpec,
        output: std::fs::File,
    ) -> ControllerResult<Box<dyn StreamingProcess>>;
}

/// Handle of a streaming child process (log or stats streamer)
#[mockall::automock]
#[async_trait::async_trait]
pub trait StreamingProcess: Send {
    /// OS process id, if the process is still known
    fn id(&self) -> Option<u32>;

    /// Signal the process and wait for it to exit
    async fn terminate(&mut self) -> ControllerResult<()>;
}

/// Session lifecycle observer
///
/// Lifecycle is bound 1:1 to the controller's setup/teardown pair. Failures
/// are logged and skipped by the controller, never escalated.
#[mockall::automock]
#[async_trait::async_trait]
pub trait SessionPlugin: Send {
    /// Human readable plugin name used in logs
    fn name(&self) -> String;

    async fn start(&mut self) -> ControllerResult<()>;

    async fn stop(&mut self) -> ControllerResult<()>;

    /// Interleave a marker message into the plugin output
    fn update(&mut self, message: &str) -> ControllerResult<()>;
}

/// Custom readiness check supplied by the caller
#[mockall::automock]
#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync {
    /// True once the checked service is usable
    async fn check(&self) -> bool;
}
