//! Controller-specific error types

use shared::SharedError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Command `{command}` failed ({}), reason: {output}", describe_exit(.exit_code))]
    ExternalCommand {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service name '{name}', known services: {known:?}")]
    InvalidServiceName { name: String, known: Vec<String> },

    #[error("Expected exactly one container for service '{service}', found {matches}")]
    ContainerResolution { service: String, matches: usize },

    #[error("Failed to inspect container {container_id}: {message}")]
    Inspect { container_id: String, message: String },

    #[error("Service '{service}' did not recover within {timeout:?}")]
    RecoveryTimeout { service: String, timeout: Duration },

    #[error("Cannot {operation} while the environment is {phase}")]
    SessionPhase { operation: String, phase: String },

    #[error("Plugin {plugin} failed: {message}")]
    Plugin { plugin: String, message: String },

    #[error("Invalid setting {field}: {message}")]
    InvalidSettings { field: String, message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControllerError {
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        ControllerError::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    pub fn phase(operation: impl Into<String>, phase: impl std::fmt::Display) -> Self {
        ControllerError::SessionPhase {
            operation: operation.into(),
            phase: phase.to_string(),
        }
    }

    /// True for the "service not in registry" programming error
    pub fn is_invalid_service(&self) -> bool {
        matches!(self, ControllerError::InvalidServiceName { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
