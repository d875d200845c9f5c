//! Compose command surface
//!
//! Every invocation shares the configured base command (`docker compose` or
//! `docker-compose`), the `-f <file> -p <project>` prefix and the pinned
//! environment map.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ControllerError, ControllerResult};
use crate::traits::{CommandRunner, CommandSpec};

/// Compose project bound to one compose file
#[derive(Clone)]
pub struct Compose {
    runner: Arc<dyn CommandRunner>,
    program: String,
    prefix: Vec<String>,
    env: Vec<(String, String)>,
}

impl Compose {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        compose_command: &str,
        compose_path: &Path,
        project_name: &str,
        env: Vec<(String, String)>,
    ) -> ControllerResult<Self> {
        let mut parts = compose_command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| ControllerError::InvalidSettings {
            field: "compose_command".to_string(),
            message: "must name the compose executable".to_string(),
        })?;

        let mut prefix: Vec<String> = parts.collect();
        prefix.extend([
            "-f".to_string(),
            compose_path.to_string_lossy().into_owned(),
            "-p".to_string(),
            project_name.to_string(),
        ]);

        Ok(Self {
            runner,
            program,
            prefix,
            env,
        })
    }

    /// Build a compose command with the fixed prefix and environment
    pub fn command(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new(self.program.clone())
            .args(self.prefix.iter().cloned())
            .args(args.iter().copied())
            .envs(&self.env)
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// List configured services in declaration order
    pub async fn services(&self) -> ControllerResult<Vec<String>> {
        let output = self.runner.run(&self.command(&["config", "--services"])).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Which services declare an enabled health check
    pub async fn declared_health_checks(&self) -> ControllerResult<HashMap<String, bool>> {
        let output = self
            .runner
            .run(&self.command(&["config", "--format", "json"]))
            .await?;
        parse_declared_health_checks(&output)
    }

    /// Build and start every service in the background
    pub async fn up(&self) -> ControllerResult<()> {
        let output = self
            .runner
            .run(&self.command(&["up", "--build", "-d"]).merge_stderr(true))
            .await?;
        debug!("compose up output: {}", output);
        Ok(())
    }

    /// Stop and remove every project container
    pub async fn down(&self) -> ControllerResult<()> {
        let output = self
            .runner
            .run(&self.command(&["down"]).merge_stderr(true))
            .await?;
        debug!("compose down output: {}", output);
        Ok(())
    }

    /// Follow the combined, timestamped output of all services
    pub fn logs_command(&self) -> CommandSpec {
        self.command(&["logs", "--no-color", "-f", "-t"])
    }
}

/// Extract the health check declaration of each service from `config --format json`
///
/// A check counts as declared unless it is disabled (`disable: true` or a
/// `NONE` test).
pub fn parse_declared_health_checks(raw: &str) -> ControllerResult<HashMap<String, bool>> {
    let document: serde_json::Value = serde_json::from_str(raw)?;

    let services = match document.get("services").and_then(|s| s.as_object()) {
        Some(services) => services,
        None => return Ok(HashMap::new()),
    };

    Ok(services
        .iter()
        .map(|(name, service)| {
            let declared = match service.get("healthcheck") {
                None | Some(serde_json::Value::Null) => false,
                Some(check) => {
                    let disabled = check.get("disable").and_then(|d| d.as_bool()).unwrap_or(false);
                    let none_test = check
                        .get("test")
                        .and_then(|t| t.as_array())
                        .and_then(|t| t.first())
                        .and_then(|t| t.as_str())
                        == Some("NONE");
                    !disabled && !none_test
                }
            };
            (name.clone(), declared)
        })
        .collect())
}
