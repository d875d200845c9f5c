//! Container runtime surface
//!
//! Per-container primitives, inspection and label-filtered listing through
//! the `docker` CLI.

use std::fmt;
use std::sync::Arc;

use shared::ContainerStateRecord;

use crate::error::{ControllerError, ControllerResult};
use crate::traits::{CommandRunner, CommandSpec};

pub const PROJECT_LABEL: &str = "com.docker.compose.project";
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// Fields sampled by the stats streamer, one JSON object per line
pub const STATS_FORMAT: &str = r#"{"name": "{{.Name}}", "cpu": "{{.CPUPerc}}", "ram": "{{.MemUsage}}", "net": "{{.NetIO}}", "block": "{{.BlockIO}}"}"#;

/// Runtime primitive applied to a single container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAction {
    Kill,
    Restart,
    Pause,
    Unpause,
    Stop,
    Start,
}

impl ContainerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerAction::Kill => "kill",
            ContainerAction::Restart => "restart",
            ContainerAction::Pause => "pause",
            ContainerAction::Unpause => "unpause",
            ContainerAction::Stop => "stop",
            ContainerAction::Start => "start",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Docker CLI bound to one compose project
#[derive(Clone)]
pub struct DockerCli {
    runner: Arc<dyn CommandRunner>,
    project: String,
    env: Vec<(String, String)>,
}

impl DockerCli {
    pub fn new(runner: Arc<dyn CommandRunner>, project: &str, env: Vec<(String, String)>) -> Self {
        Self {
            runner,
            project: project.to_string(),
            env,
        }
    }

    /// Ask the daemon which API version it speaks
    pub async fn probe_api_version(runner: &dyn CommandRunner) -> ControllerResult<String> {
        let spec = CommandSpec::new("docker").args(["version", "--format", "{{.Server.APIVersion}}"]);
        let version = runner.run(&spec).await?;
        let version = version.trim();
        if version.is_empty() {
            return Err(ControllerError::ExternalCommand {
                command: spec.to_string(),
                exit_code: Some(0),
                output: "daemon reported an empty API version".to_string(),
            });
        }
        Ok(version.to_string())
    }

    pub fn command(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new("docker")
            .args(args.iter().copied())
            .envs(&self.env)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Ids of every container (running or not) carrying the project and service labels
    pub async fn service_container_ids(&self, service: &str) -> ControllerResult<Vec<String>> {
        let project_filter = format!("label={PROJECT_LABEL}={}", self.project);
        let service_filter = format!("label={SERVICE_LABEL}={service}");
        let output = self
            .runner
            .run(&self.command(&[
                "ps",
                "-a",
                "-q",
                "--no-trunc",
                "--filter",
                &project_filter,
                "--filter",
                &service_filter,
            ]))
            .await?;
        Ok(split_lines(&output))
    }

    /// Names of the running containers of the project
    pub async fn project_container_names(&self) -> ControllerResult<Vec<String>> {
        let project_filter = format!("label={PROJECT_LABEL}={}", self.project);
        let output = self
            .runner
            .run(&self.command(&["ps", "--format", "{{.Names}}", "--filter", &project_filter]))
            .await?;
        Ok(split_lines(&output))
    }

    pub async fn apply(&self, action: ContainerAction, container_id: &str) -> ControllerResult<()> {
        self.runner
            .run(&self.command(&[action.as_str(), container_id]).merge_stderr(true))
            .await?;
        Ok(())
    }

    /// Fetch the `State` record of a container
    pub async fn inspect_state(&self, container_id: &str) -> ControllerResult<ContainerStateRecord> {
        let output = self
            .runner
            .run(&self.command(&["inspect", "--format", "{{json .State}}", container_id]))
            .await?;
        ContainerStateRecord::from_json(&output).map_err(|e| ControllerError::Inspect {
            container_id: container_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Run a shell command inside a container and return its output
    pub async fn exec(&self, container_id: &str, command: &str) -> ControllerResult<String> {
        self.runner
            .run(&self.command(&["exec", container_id, "sh", "-c", command]).merge_stderr(true))
            .await
    }

    /// Streaming stats sampler for the given containers
    pub fn stats_command(&self, container_names: &[String]) -> CommandSpec {
        self.command(&["stats", "--format", STATS_FORMAT])
            .args(container_names.iter().cloned())
    }
}

fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
