//! Core types used throughout the environment toolkit

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Service identifier as declared in the compose file
///
/// Unique within one environment definition and immutable once the
/// environment has been loaded. Every per-service operation is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Create a service name, trimming surrounding whitespace
    pub fn new(name: impl Into<String>) -> SharedResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SharedError::EmptyServiceName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ServiceName {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceName::new(s)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Health sub-record of an inspected container (present only when a health check exists)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(rename = "Status")]
    pub status: String,
}

/// Raw `State` record reported by the container runtime's inspect call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStateRecord {
    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "Health", default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthRecord>,
}

impl ContainerStateRecord {
    /// Parse the JSON emitted by `inspect --format '{{json .State}}'`
    pub fn from_json(raw: &str) -> SharedResult<Self> {
        serde_json::from_str(raw.trim()).map_err(|e| SharedError::InvalidStateRecord {
            message: format!("{e} (input: {raw:?})"),
        })
    }
}

/// Container state as observed at the moment of the query
///
/// Never cached: the fault injection operations exist precisely to make
/// this value change underneath the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Unknown,
    Running,
    Healthy,
    Unhealthy,
    Stopped,
    Paused,
    Absent,
}

impl ContainerState {
    /// Map an inspect record onto a state variant
    pub fn from_record(record: &ContainerStateRecord) -> Self {
        match record.status.as_str() {
            "running" => match record.health.as_ref().map(|h| h.status.as_str()) {
                Some("healthy") => ContainerState::Healthy,
                Some("unhealthy") => ContainerState::Unhealthy,
                _ => ContainerState::Running,
            },
            "paused" => ContainerState::Paused,
            "exited" | "dead" | "created" => ContainerState::Stopped,
            "removing" => ContainerState::Absent,
            _ => ContainerState::Unknown,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContainerState::Unknown => "unknown",
            ContainerState::Running => "running",
            ContainerState::Healthy => "healthy",
            ContainerState::Unhealthy => "unhealthy",
            ContainerState::Stopped => "stopped",
            ContainerState::Paused => "paused",
            ContainerState::Absent => "absent",
        };
        f.write_str(label)
    }
}

/// Per-service rule deciding when a container counts as ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadinessPolicy {
    /// The service declares a health check: ready iff healthy
    RequireHealthy,
    /// No health check declared: ready iff running
    RequireRunning,
}

impl ReadinessPolicy {
    pub fn from_declared_health_check(declared: bool) -> Self {
        if declared {
            ReadinessPolicy::RequireHealthy
        } else {
            ReadinessPolicy::RequireRunning
        }
    }

    /// Evaluate the rule against a freshly inspected record
    ///
    /// A health sub-record always wins, since the runtime only attaches one
    /// when some health check (compose or image level) is in effect.
    pub fn is_satisfied_by(self, record: &ContainerStateRecord) -> bool {
        match (self, &record.health) {
            (_, Some(health)) => health.status == "healthy",
            (ReadinessPolicy::RequireHealthy, None) => false,
            (ReadinessPolicy::RequireRunning, None) => record.status == "running",
        }
    }
}
