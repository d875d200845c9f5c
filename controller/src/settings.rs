//! Controller-facing configuration
//!
//! Plain values; reading them from files or the environment is the
//! harness's job.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSettings {
    /// Compose project name, shared by every container of the environment
    pub project_name: String,
    pub compose_path: PathBuf,
    /// Base compose invocation, e.g. `docker compose` or `docker-compose`
    pub compose_command: String,
    /// Combined session log; per-service logs and stats land next to it
    pub log_path: PathBuf,
    pub collect_stats: bool,
    /// Leave containers in place on setup and teardown
    pub reuse_containers: bool,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            project_name: "docker-tests".to_string(),
            compose_path: PathBuf::from("docker-compose.yml"),
            compose_command: "docker compose".to_string(),
            log_path: PathBuf::from("docker-tests.log"),
            collect_stats: false,
            reuse_containers: false,
        }
    }
}

impl EnvironmentSettings {
    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    pub fn with_compose_path(mut self, compose_path: impl Into<PathBuf>) -> Self {
        self.compose_path = compose_path.into();
        self
    }

    pub fn with_compose_command(mut self, compose_command: impl Into<String>) -> Self {
        self.compose_command = compose_command.into();
        self
    }

    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    pub fn with_collect_stats(mut self, collect_stats: bool) -> Self {
        self.collect_stats = collect_stats;
        self
    }

    pub fn with_reuse_containers(mut self, reuse_containers: bool) -> Self {
        self.reuse_containers = reuse_containers;
        self
    }

    /// Directory holding the session artifacts
    pub fn log_dir(&self) -> PathBuf {
        match self.log_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
