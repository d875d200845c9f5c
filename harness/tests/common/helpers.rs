//! A command runner for an environment whose single service is always up

use std::sync::{Arc, Mutex};
use std::time::Duration;

use controller::{
    CommandRunner, CommandSpec, ControllerResult, EnvironmentController, EnvironmentSettings,
    StreamingProcess, WaitOptions,
};

use super::fixtures::TestFixtures;

#[derive(Clone, Default)]
pub struct StaticRunner {
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    status: Arc<Mutex<String>>,
}

impl StaticRunner {
    pub fn new() -> Self {
        let runner = Self::default();
        runner.set_status("running");
        runner
    }

    pub fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    /// Compose verbs in invocation order
    pub fn compose_verbs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.args.first().map(String::as_str) == Some("compose"))
            .filter_map(|c| c.args.get(5).cloned())
            .collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for StaticRunner {
    async fn run(&self, command: &CommandSpec) -> ControllerResult<String> {
        self.calls.lock().unwrap().push(command.clone());
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();

        let output = match args.as_slice() {
            ["version", ..] => "1.43".to_string(),
            ["compose", _, _, _, _, "config", "--services"] => TestFixtures::SERVICE.to_string(),
            ["compose", _, _, _, _, "config", "--format", "json"] => {
                let service = TestFixtures::SERVICE;
                serde_json::json!({"services": {service: {"image": "img"}}}).to_string()
            }
            ["ps", "-a", ..] => "api-container".to_string(),
            ["inspect", ..] => {
                let status = self.status.lock().unwrap().clone();
                serde_json::json!({"Status": status, "Running": status == "running", "Paused": false}).to_string()
            }
            _ => String::new(),
        };
        Ok(output)
    }

    fn spawn_streaming(
        &self,
        command: &CommandSpec,
        _output: std::fs::File,
    ) -> ControllerResult<Box<dyn StreamingProcess>> {
        self.calls.lock().unwrap().push(command.clone());
        Ok(Box::new(IdleStream))
    }
}

struct IdleStream;

#[async_trait::async_trait]
impl StreamingProcess for IdleStream {
    fn id(&self) -> Option<u32> {
        None
    }

    async fn terminate(&mut self) -> ControllerResult<()> {
        Ok(())
    }
}

pub struct TestHelpers;

impl TestHelpers {
    pub fn settings(dir: &std::path::Path) -> EnvironmentSettings {
        EnvironmentSettings::default()
            .with_project_name(TestFixtures::PROJECT)
            .with_compose_path(dir.join("docker-compose.yml"))
            .with_log_path(dir.join("session.log"))
    }

    pub async fn controller(runner: &StaticRunner, dir: &std::path::Path) -> EnvironmentController {
        EnvironmentController::with_runner(Self::settings(dir), Arc::new(runner.clone()))
            .await
            .expect("controller construction")
    }

    pub fn fast_wait() -> WaitOptions {
        WaitOptions::new(Duration::from_millis(100), Duration::from_secs(2))
    }
}
