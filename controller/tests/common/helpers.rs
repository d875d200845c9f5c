//! Scripted command runner and controller helpers

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use controller::{
    CommandRunner, CommandSpec, ControllerError, ControllerResult, EnvironmentController,
    EnvironmentSettings, StreamingProcess,
};

use super::fixtures::TestFixtures;

const RUNTIME_ACTIONS: [&str; 6] = ["kill", "restart", "pause", "unpause", "stop", "start"];

#[derive(Default)]
struct Script {
    calls: Vec<CommandSpec>,
    services: Vec<String>,
    health_checks: HashMap<String, bool>,
    containers: HashMap<String, Vec<String>>,
    states: HashMap<String, String>,
    failures: Vec<Vec<String>>,
    stream_output: HashMap<String, String>,
    project_containers: Vec<String>,
    frozen: bool,
    terminated: usize,
}

/// In-memory stand-in for the compose and docker CLIs
///
/// Records every invocation and keeps a tiny container state table so that
/// runtime actions are observable through `inspect`.
#[derive(Clone)]
pub struct ScriptedRunner {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    /// Runner for the fixture project: every service has one running container
    pub fn new() -> Self {
        let mut script = Script {
            services: TestFixtures::services(),
            health_checks: TestFixtures::declared_health_checks(),
            project_containers: TestFixtures::services()
                .iter()
                .map(|s| TestFixtures::container_name(s))
                .collect(),
            ..Script::default()
        };
        for service in TestFixtures::services() {
            let id = TestFixtures::container_id(&service);
            script.states.insert(id.clone(), "running".to_string());
            script.containers.insert(service, vec![id]);
        }

        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    pub fn shared(&self) -> Arc<dyn CommandRunner> {
        Arc::new(self.clone())
    }

    /// Fail every command whose arguments end with `tail`
    pub fn fail_on(&self, tail: &[&str]) -> &Self {
        self.lock()
            .failures
            .push(tail.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Output written into the file of a streaming `logs` or `stats` command
    pub fn stream_output(&self, verb: &str, content: impl Into<String>) -> &Self {
        self.lock().stream_output.insert(verb.to_string(), content.into());
        self
    }

    pub fn set_status(&self, service: &str, status: &str) -> &Self {
        self.lock()
            .states
            .insert(TestFixtures::container_id(service), status.to_string());
        self
    }

    pub fn set_containers(&self, service: &str, ids: &[&str]) -> &Self {
        self.lock()
            .containers
            .insert(service.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn set_project_containers(&self, names: &[&str]) -> &Self {
        self.lock().project_containers = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Runtime actions stop changing container state
    pub fn freeze(&self) -> &Self {
        self.lock().frozen = true;
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of recorded commands ending with `tail`
    pub fn count(&self, tail: &[&str]) -> usize {
        self.lock().calls.iter().filter(|c| c.ends_with(tail)).count()
    }

    /// Compose verbs in invocation order, e.g. `["down", "up"]`
    pub fn compose_verbs(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.args.first().map(String::as_str) == Some("compose"))
            .filter_map(|c| c.args.get(5).cloned())
            .collect()
    }

    /// Runtime actions in invocation order, e.g. `["kill web-...", "restart web-..."]`
    pub fn runtime_actions(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.args.len() == 2 && RUNTIME_ACTIONS.contains(&c.args[0].as_str()))
            .map(|c| c.args.join(" "))
            .collect()
    }

    pub fn terminated(&self) -> usize {
        self.lock().terminated
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn respond(&self, spec: &CommandSpec) -> ControllerResult<String> {
        let mut script = self.lock();
        script.calls.push(spec.clone());

        let tails: Vec<Vec<String>> = script.failures.clone();
        for tail in tails {
            let tail: Vec<&str> = tail.iter().map(String::as_str).collect();
            if spec.ends_with(&tail) {
                return Err(ControllerError::ExternalCommand {
                    command: spec.to_string(),
                    exit_code: Some(1),
                    output: format!("scripted failure of {}", tail.join(" ")),
                });
            }
        }

        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
        if args.first() == Some(&"compose") {
            return Ok(match &args[5..] {
                ["config", "--services"] => script.services.join("\n"),
                ["config", "--format", "json"] => declared_config(&script),
                _ => String::new(),
            });
        }

        match args.as_slice() {
            ["version", ..] => Ok(TestFixtures::API_VERSION.to_string()),
            ["ps", "-a", ..] => {
                let service = args
                    .iter()
                    .find_map(|a| a.strip_prefix("label=com.docker.compose.service="))
                    .unwrap_or_default();
                Ok(script.containers.get(service).cloned().unwrap_or_default().join("\n"))
            }
            ["ps", "--format", ..] => Ok(script.project_containers.join("\n")),
            ["inspect", .., id] => inspect_record(&script, id),
            ["exec", _, "sh", "-c", command] => Ok(format!("ran: {command}")),
            [action, id] if RUNTIME_ACTIONS.contains(action) => {
                if !script.frozen {
                    let status = match *action {
                        "kill" | "stop" => "exited",
                        "pause" => "paused",
                        _ => "running",
                    };
                    script.states.insert(id.to_string(), status.to_string());
                }
                Ok(String::new())
            }
            _ => Ok(String::new()),
        }
    }
}

fn declared_config(script: &Script) -> String {
    let services: serde_json::Map<String, serde_json::Value> = script
        .services
        .iter()
        .map(|name| {
            let service = if script.health_checks.get(name).copied().unwrap_or(false) {
                serde_json::json!({"image": "img", "healthcheck": {"test": ["CMD", "true"]}})
            } else {
                serde_json::json!({"image": "img"})
            };
            (name.clone(), service)
        })
        .collect();
    serde_json::json!({ "name": TestFixtures::PROJECT, "services": services }).to_string()
}

fn inspect_record(script: &Script, id: &str) -> ControllerResult<String> {
    let status = script.states.get(id).cloned().ok_or_else(|| ControllerError::ExternalCommand {
        command: format!("docker inspect {id}"),
        exit_code: Some(1),
        output: format!("Error: No such object: {id}"),
    })?;

    let declared = script
        .containers
        .iter()
        .find(|(_, ids)| ids.iter().any(|candidate| candidate == id))
        .map(|(service, _)| script.health_checks.get(service).copied().unwrap_or(false))
        .unwrap_or(false);

    let mut record = serde_json::json!({
        "Status": status,
        "Running": status == "running",
        "Paused": status == "paused",
    });
    if declared {
        let health = if status == "running" { "healthy" } else { "unhealthy" };
        record["Health"] = serde_json::json!({ "Status": health });
    }
    Ok(record.to_string())
}

#[async_trait::async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> ControllerResult<String> {
        self.respond(command)
    }

    fn spawn_streaming(
        &self,
        command: &CommandSpec,
        mut output: std::fs::File,
    ) -> ControllerResult<Box<dyn StreamingProcess>> {
        let content = {
            let mut script = self.lock();
            script.calls.push(command.clone());
            let verb = if command.args.first().map(String::as_str) == Some("stats") {
                "stats"
            } else {
                "logs"
            };
            script.stream_output.get(verb).cloned().unwrap_or_default()
        };
        output.write_all(content.as_bytes())?;

        Ok(Box::new(ScriptedStream {
            script: self.script.clone(),
        }))
    }
}

struct ScriptedStream {
    script: Arc<Mutex<Script>>,
}

#[async_trait::async_trait]
impl StreamingProcess for ScriptedStream {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    async fn terminate(&mut self) -> ControllerResult<()> {
        self.script.lock().unwrap().terminated += 1;
        Ok(())
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Settings writing every session artifact below `dir`
    pub fn settings(dir: &Path) -> EnvironmentSettings {
        EnvironmentSettings::default()
            .with_project_name(TestFixtures::PROJECT)
            .with_compose_path(dir.join("docker-compose.yml"))
            .with_log_path(dir.join("session.log"))
    }

    pub async fn controller(runner: &ScriptedRunner, settings: EnvironmentSettings) -> EnvironmentController {
        EnvironmentController::with_runner(settings, runner.shared())
            .await
            .expect("controller construction")
    }
}
