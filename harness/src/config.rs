//! Environment configuration
//!
//! Values are layered in increasing precedence: built-in (or builder)
//! defaults, the `[environment]` section of an INI file, then `DTT_*`
//! environment variables.

use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use controller::EnvironmentSettings;
use tracing::debug;

use crate::error::HarnessResult;

const SECTION: &str = "environment";

/// One configurable option: file key and environment variable
struct ConfigOption {
    key: &'static str,
    env_var: &'static str,
}

const LOG_PATH: ConfigOption = ConfigOption { key: "log-path", env_var: "DTT_LOG_PATH" };
const PROJECT_NAME: ConfigOption = ConfigOption { key: "project-name", env_var: "DTT_PROJECT_NAME" };
const COMPOSE_PATH: ConfigOption = ConfigOption { key: "docker-compose-path", env_var: "DTT_COMPOSE_PATH" };
const COMPOSE_COMMAND: ConfigOption = ConfigOption { key: "docker-compose-command", env_var: "DTT_COMPOSE_COMMAND" };
const REUSE_CONTAINERS: ConfigOption = ConfigOption { key: "reuse-containers", env_var: "DTT_REUSE_CONTAINERS" };
const COLLECT_STATS: ConfigOption = ConfigOption { key: "collect-stats", env_var: "DTT_COLLECT_STATS" };

const ALL_OPTIONS: [&ConfigOption; 6] = [
    &LOG_PATH,
    &PROJECT_NAME,
    &COMPOSE_PATH,
    &COMPOSE_COMMAND,
    &REUSE_CONTAINERS,
    &COLLECT_STATS,
];

fn path_of(option: &ConfigOption) -> String {
    format!("{SECTION}.{}", option.key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub log_path: PathBuf,
    pub project_name: String,
    pub compose_path: PathBuf,
    pub compose_command: String,
    pub reuse_containers: bool,
    pub collect_stats: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("docker-tests.log"),
            project_name: "docker-tests".to_string(),
            compose_path: PathBuf::from("docker-compose.yml"),
            compose_command: "docker compose".to_string(),
            reuse_containers: false,
            collect_stats: false,
        }
    }
}

impl EnvironmentConfig {
    pub fn builder() -> EnvironmentConfigBuilder {
        EnvironmentConfigBuilder::new()
    }

    /// Load from the process environment on top of the built-in defaults
    pub fn load(config_path: Option<&Path>) -> HarnessResult<Self> {
        Self::builder().config_file_opt(config_path).build()
    }

    /// Settings handed to the environment controller
    pub fn to_settings(&self) -> EnvironmentSettings {
        EnvironmentSettings::default()
            .with_project_name(self.project_name.clone())
            .with_compose_path(self.compose_path.clone())
            .with_compose_command(self.compose_command.clone())
            .with_log_path(self.log_path.clone())
            .with_reuse_containers(self.reuse_containers)
            .with_collect_stats(self.collect_stats)
    }
}

/// Builder for [`EnvironmentConfig`]
///
/// Values set here are the base layer; the file and environment still win.
pub struct EnvironmentConfigBuilder {
    defaults: EnvironmentConfig,
    config_path: Option<PathBuf>,
    env_lookup: Box<dyn Fn(&str) -> Option<String>>,
}

impl EnvironmentConfigBuilder {
    pub fn new() -> Self {
        Self {
            defaults: EnvironmentConfig::default(),
            config_path: None,
            env_lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.defaults.log_path = path.into();
        self
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.defaults.project_name = name.into();
        self
    }

    pub fn compose_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.defaults.compose_path = path.into();
        self
    }

    pub fn compose_command(mut self, command: impl Into<String>) -> Self {
        self.defaults.compose_command = command.into();
        self
    }

    pub fn reuse_containers(mut self, reuse: bool) -> Self {
        self.defaults.reuse_containers = reuse;
        self
    }

    pub fn collect_stats(mut self, collect: bool) -> Self {
        self.defaults.collect_stats = collect;
        self
    }

    /// INI file with an `[environment]` section; it must exist
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn config_file_opt(mut self, path: Option<&Path>) -> Self {
        self.config_path = path.map(Path::to_path_buf);
        self
    }

    /// Source of the `DTT_*` variables, the process environment by default
    pub fn env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        self.env_lookup = Box::new(lookup);
        self
    }

    pub fn build(self) -> HarnessResult<EnvironmentConfig> {
        let defaults = &self.defaults;
        let mut builder = Config::builder()
            .set_default(path_of(&LOG_PATH), defaults.log_path.to_string_lossy().into_owned())?
            .set_default(path_of(&PROJECT_NAME), defaults.project_name.clone())?
            .set_default(path_of(&COMPOSE_PATH), defaults.compose_path.to_string_lossy().into_owned())?
            .set_default(path_of(&COMPOSE_COMMAND), defaults.compose_command.clone())?
            .set_default(path_of(&REUSE_CONTAINERS), defaults.reuse_containers)?
            .set_default(path_of(&COLLECT_STATS), defaults.collect_stats)?;

        if let Some(path) = &self.config_path {
            debug!("📄 Reading environment configuration from {}", path.display());
            builder = builder.add_source(
                File::new(&path.to_string_lossy(), FileFormat::Ini).required(true),
            );
        }

        for option in ALL_OPTIONS {
            let value = (self.env_lookup)(option.env_var).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                debug!("🌍 {} overridden by {}", option.key, option.env_var);
            }
            builder = builder.set_override_option(path_of(option), value)?;
        }

        let layered = builder.build()?;
        Ok(EnvironmentConfig {
            log_path: PathBuf::from(layered.get_string(&path_of(&LOG_PATH))?),
            project_name: layered.get_string(&path_of(&PROJECT_NAME))?,
            compose_path: PathBuf::from(layered.get_string(&path_of(&COMPOSE_PATH))?),
            compose_command: layered.get_string(&path_of(&COMPOSE_COMMAND))?,
            reuse_containers: layered.get_bool(&path_of(&REUSE_CONTAINERS))?,
            collect_stats: layered.get_bool(&path_of(&COLLECT_STATS))?,
        })
    }
}

impl Default for EnvironmentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
