//! Real process invoker
//!
//! Runs orchestration and runtime commands with `tokio::process`, either to
//! completion or as streaming children writing into a file.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{ControllerError, ControllerResult};
use crate::traits::{CommandRunner, CommandSpec, StreamingProcess};

/// How long a streamer gets to exit after SIGTERM before it is killed
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Command runner backed by real child processes
#[derive(Debug, Default, Clone)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn build(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Join stdout and stderr into one diagnostic blob
fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, _) => stderr.trim().to_string(),
        (false, true) => stdout.trim().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim(), stderr.trim()),
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> ControllerResult<String> {
        debug!(command = %spec, "▶️ Running command");

        let output = Self::build(spec)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ControllerError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ControllerError::ExternalCommand {
                command: spec.to_string(),
                exit_code: output.status.code(),
                output: combine_output(&stdout, &stderr),
            });
        }

        if spec.merge_stderr {
            Ok(combine_output(&stdout, &stderr))
        } else {
            Ok(stdout.trim().to_string())
        }
    }

    fn spawn_streaming(
        &self,
        spec: &CommandSpec,
        output: std::fs::File,
    ) -> ControllerResult<Box<dyn StreamingProcess>> {
        let child = Self::build(spec)
            .stdout(Stdio::from(output))
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ControllerError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        debug!(command = %spec, pid = ?child.id(), "📡 Streaming process started");

        Ok(Box::new(ChildStream {
            child,
            command: spec.to_string(),
        }))
    }
}

/// Streaming child spawned by [`RealCommandRunner`]
struct ChildStream {
    child: Child,
    command: String,
}

impl ChildStream {
    #[cfg(unix)]
    fn send_sigterm(&self) {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id() {
            match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => debug!("📤 Sent SIGTERM to {} ({})", pid, self.command),
                Err(nix::errno::Errno::ESRCH) => debug!("✅ Process {} already gone", pid),
                Err(e) => warn!("⚠️ Failed to signal {} ({}): {}", pid, self.command, e),
            }
        }
    }

    #[cfg(not(unix))]
    fn send_sigterm(&self) {}
}

#[async_trait]
impl StreamingProcess for ChildStream {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn terminate(&mut self) -> ControllerResult<()> {
        self.send_sigterm();

        match tokio::time::timeout(TERMINATE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("🏁 `{}` exited with {}", self.command, status);
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!("🔨 `{}` ignored SIGTERM, killing it", self.command);
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}
