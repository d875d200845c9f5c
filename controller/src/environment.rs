//! Environment controller
//!
//! Owns the compose project for one test session: brings it up, answers
//! readiness questions, applies per-container runtime primitives and drives
//! the session plugins. Lifecycle is Uninitialized -> Up -> Down, one pass
//! per instance.

use std::fmt;
use std::sync::Arc;

use shared::logging::{log_error, log_shutdown, log_startup, log_success};
use shared::{ContainerState, ContainerStateRecord, ServiceName};
use tracing::{debug, info, warn};

use crate::core::{wait_for_all, wait_until, HealthProber, ServiceRegistry, WaitOptions};
use crate::error::{ControllerError, ControllerResult};
use crate::plugins::{LogCollector, StatsCollector};
use crate::services::{Compose, ContainerAction, DockerCli, RealCommandRunner};
use crate::settings::EnvironmentSettings;
use crate::traits::{CommandRunner, HealthCheck, SessionPlugin};

const COMPONENT: &str = "controller";

/// Where a controller instance is in its single setup/teardown pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPhase {
    Uninitialized,
    Up,
    Down,
}

impl fmt::Display for EnvironmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnvironmentPhase::Uninitialized => "uninitialized",
            EnvironmentPhase::Up => "up",
            EnvironmentPhase::Down => "down",
        };
        f.write_str(label)
    }
}

/// A registered plugin and whether it was started in this session
struct PluginSlot {
    plugin: Box<dyn SessionPlugin>,
    active: bool,
}

pub struct EnvironmentController {
    settings: EnvironmentSettings,
    compose: Compose,
    pub(crate) docker: DockerCli,
    registry: Arc<ServiceRegistry>,
    prober: HealthProber,
    plugins: Vec<PluginSlot>,
    phase: EnvironmentPhase,
}

impl EnvironmentController {
    /// Build a controller that drives the real `docker` tooling
    pub async fn connect(settings: EnvironmentSettings) -> ControllerResult<Self> {
        Self::with_runner(settings, Arc::new(RealCommandRunner::new())).await
    }

    /// Build a controller on top of an arbitrary process invoker
    ///
    /// Probes the runtime API version once and loads the service registry;
    /// a failure of either is a construction failure.
    pub async fn with_runner(
        settings: EnvironmentSettings,
        runner: Arc<dyn CommandRunner>,
    ) -> ControllerResult<Self> {
        let api_version = DockerCli::probe_api_version(runner.as_ref()).await?;
        debug!("🔌 Pinning container runtime API version {}", api_version);
        let env = vec![
            ("COMPOSE_API_VERSION".to_string(), api_version.clone()),
            ("DOCKER_API_VERSION".to_string(), api_version),
        ];

        let compose = Compose::new(
            runner.clone(),
            &settings.compose_command,
            &settings.compose_path,
            &settings.project_name,
            env.clone(),
        )?;
        let docker = DockerCli::new(runner, &settings.project_name, env);

        let registry = Arc::new(ServiceRegistry::load(&compose).await?);
        let prober = HealthProber::new(docker.clone(), registry.clone());

        let mut plugins = vec![PluginSlot {
            plugin: Box::new(LogCollector::new(settings.log_path.clone(), compose.clone())) as Box<dyn SessionPlugin>,
            active: false,
        }];
        if settings.collect_stats {
            plugins.push(PluginSlot {
                plugin: Box::new(StatsCollector::new(settings.log_dir(), docker.clone())),
                active: false,
            });
        }

        info!(
            "📦 Environment '{}' loaded with {} services",
            settings.project_name,
            registry.len()
        );

        Ok(Self {
            settings,
            compose,
            docker,
            registry,
            prober,
            plugins,
            phase: EnvironmentPhase::Uninitialized,
        })
    }

    /// Replace the plugin list
    pub fn with_plugins(mut self, plugins: Vec<Box<dyn SessionPlugin>>) -> Self {
        self.plugins = plugins
            .into_iter()
            .map(|plugin| PluginSlot { plugin, active: false })
            .collect();
        self
    }

    /// Append a plugin; it runs after every plugin registered before it
    pub fn add_plugin(&mut self, plugin: Box<dyn SessionPlugin>) {
        self.plugins.push(PluginSlot { plugin, active: false });
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    pub fn services(&self) -> &[ServiceName] {
        self.registry.services()
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn phase(&self) -> EnvironmentPhase {
        self.phase
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|slot| slot.plugin.name()).collect()
    }

    /// Bring the environment up and start every plugin
    ///
    /// If bringing the environment up fails, the controller tears itself
    /// down before returning the original error.
    pub async fn setup(&mut self) -> ControllerResult<()> {
        if self.phase != EnvironmentPhase::Uninitialized {
            return Err(ControllerError::phase("set up", self.phase));
        }

        log_startup(COMPONENT, &format!("environment '{}'", self.settings.project_name));
        self.cleanup().await?;
        self.phase = EnvironmentPhase::Up;

        if let Err(e) = self.compose.up().await {
            log_error(COMPONENT, "Environment setup", &e);
            if let Err(teardown_error) = self.teardown().await {
                warn!("⚠️ Teardown after failed setup also failed: {}", teardown_error);
            }
            return Err(e);
        }

        for slot in &mut self.plugins {
            let name = slot.plugin.name();
            match slot.plugin.start().await {
                Ok(()) => {
                    debug!(plugin = %name, "🔌 Plugin started");
                    slot.active = true;
                }
                Err(e) => warn!(plugin = %name, "⚠️ Plugin failed to start, skipping it: {}", e),
            }
        }

        log_success(COMPONENT, "Environment is up");
        Ok(())
    }

    /// Stop every started plugin, then clean the environment up
    pub async fn teardown(&mut self) -> ControllerResult<()> {
        if self.phase == EnvironmentPhase::Down {
            warn!("⚠️ Environment already torn down");
            return Ok(());
        }

        log_shutdown(COMPONENT, &format!("environment '{}'", self.settings.project_name));
        for slot in self.plugins.iter_mut().filter(|slot| slot.active) {
            let name = slot.plugin.name();
            if let Err(e) = slot.plugin.stop().await {
                warn!(plugin = %name, "⚠️ Plugin failed to stop: {}", e);
            }
            slot.active = false;
        }

        self.phase = EnvironmentPhase::Down;
        self.cleanup().await
    }

    /// Stop and remove the project containers unless reuse is configured
    pub async fn cleanup(&self) -> ControllerResult<()> {
        if self.settings.reuse_containers {
            warn!("♻️ Container reuse is enabled, leaving the environment containers in place");
            return Ok(());
        }

        info!("🧹 Removing environment containers");
        self.compose.down().await
    }

    /// Write a marker message into every running plugin
    pub fn update_plugins(&mut self, message: &str) {
        for slot in self.plugins.iter_mut().filter(|slot| slot.active) {
            if let Err(e) = slot.plugin.update(message) {
                warn!(plugin = %slot.plugin.name(), "⚠️ Plugin update failed: {}", e);
            }
        }
    }

    /// Resolve the single container backing a service
    pub async fn get_container_id(&self, name: &str) -> ControllerResult<String> {
        self.prober.container_id(name).await
    }

    pub async fn inspect_container(&self, name: &str) -> ControllerResult<ContainerStateRecord> {
        self.prober.inspect(name).await
    }

    pub async fn is_container_ready(&self, name: &str) -> bool {
        self.prober.is_ready(name).await
    }

    pub async fn container_status(&self, name: &str) -> ControllerResult<String> {
        self.prober.status(name).await
    }

    pub async fn container_state(&self, name: &str) -> ControllerResult<ContainerState> {
        self.prober.state(name).await
    }

    /// Run a shell command inside the service's container
    pub async fn run_exec_in_container(&self, name: &str, command: &str) -> ControllerResult<String> {
        let container_id = self.get_container_id(name).await?;
        debug!(service = %name, container_id = %container_id, "🐚 exec: {}", command);
        self.docker.exec(&container_id, command).await
    }

    pub async fn kill_container(&self, name: &str) -> ControllerResult<()> {
        self.apply_to_service(name, ContainerAction::Kill).await
    }

    pub async fn restart_container(&self, name: &str) -> ControllerResult<()> {
        self.apply_to_service(name, ContainerAction::Restart).await
    }

    pub async fn pause_container(&self, name: &str) -> ControllerResult<()> {
        self.apply_to_service(name, ContainerAction::Pause).await
    }

    pub async fn unpause_container(&self, name: &str) -> ControllerResult<()> {
        self.apply_to_service(name, ContainerAction::Unpause).await
    }

    pub async fn stop_container(&self, name: &str) -> ControllerResult<()> {
        self.apply_to_service(name, ContainerAction::Stop).await
    }

    pub async fn start_container(&self, name: &str) -> ControllerResult<()> {
        self.apply_to_service(name, ContainerAction::Start).await
    }

    async fn apply_to_service(&self, name: &str, action: ContainerAction) -> ControllerResult<()> {
        let container_id = self.get_container_id(name).await?;
        info!(service = %name, container_id = %container_id, "🔧 {} container", action);
        self.docker.apply(action, &container_id).await
    }

    /// Wait until every named service (all of them by default) is ready
    ///
    /// Unknown names fail before any polling starts; a timeout is `Ok(false)`.
    pub async fn wait_for_services(
        &self,
        services: Option<&[&str]>,
        options: WaitOptions,
    ) -> ControllerResult<bool> {
        let targets: Vec<ServiceName> = match services {
            Some(names) => names
                .iter()
                .map(|name| self.registry.validate(name).cloned())
                .collect::<ControllerResult<_>>()?,
            None => self.registry.services().to_vec(),
        };

        info!("⏳ Waiting for {} services to become ready (timeout: {:?})", targets.len(), options.timeout);
        let prober = &self.prober;
        let checks = targets
            .iter()
            .map(|service| (service.to_string(), move || prober.is_ready(service.as_str())))
            .collect();

        let ready = wait_for_all(checks, options).await;
        if ready {
            info!("✅ All requested services are ready");
        }
        Ok(ready)
    }

    /// Wait for a single service, through a custom check when one is supplied
    pub async fn wait_for_health(
        &self,
        name: &str,
        health_check: Option<&dyn HealthCheck>,
        options: WaitOptions,
    ) -> ControllerResult<bool> {
        self.registry.validate(name)?;

        let ready = match health_check {
            Some(check) => wait_until(move || check.check(), options).await,
            None => {
                let prober = &self.prober;
                wait_until(move || prober.is_ready(name), options).await
            }
        };

        if !ready {
            warn!(service = %name, "⏰ Service not healthy after {:?}", options.timeout);
        }
        Ok(ready)
    }
}
