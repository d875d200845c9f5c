//! Health prober
//!
//! Readiness is recomputed on every call from a fresh inspect; nothing is
//! cached since fault injection exists to observe state transitions.

use std::sync::Arc;

use shared::{ContainerState, ContainerStateRecord, ReadinessPolicy};
use tracing::debug;

use crate::core::registry::ServiceRegistry;
use crate::error::{ControllerError, ControllerResult};
use crate::services::DockerCli;

#[derive(Clone)]
pub struct HealthProber {
    docker: DockerCli,
    registry: Arc<ServiceRegistry>,
}

impl HealthProber {
    pub fn new(docker: DockerCli, registry: Arc<ServiceRegistry>) -> Self {
        Self { docker, registry }
    }

    /// Resolve the single container backing a service
    ///
    /// The name is validated before any external call is made.
    pub async fn container_id(&self, name: &str) -> ControllerResult<String> {
        let service = self.registry.validate(name)?;
        let mut ids = self.docker.service_container_ids(service.as_str()).await?;

        match ids.len() {
            1 => Ok(ids.remove(0)),
            matches => Err(ControllerError::ContainerResolution {
                service: service.to_string(),
                matches,
            }),
        }
    }

    /// Raw state record of the service's container
    pub async fn inspect(&self, name: &str) -> ControllerResult<ContainerStateRecord> {
        let container_id = self.container_id(name).await?;
        self.docker.inspect_state(&container_id).await
    }

    /// Whether the service satisfies its readiness policy right now
    ///
    /// Any failure to inspect counts as not ready.
    pub async fn is_ready(&self, name: &str) -> bool {
        let policy = self
            .registry
            .policy(name)
            .unwrap_or(ReadinessPolicy::RequireRunning);

        match self.inspect(name).await {
            Ok(record) => policy.is_satisfied_by(&record),
            Err(e) => {
                debug!(service = %name, "Readiness probe failed: {}", e);
                false
            }
        }
    }

    /// Raw top-level status string, for diagnostics
    pub async fn status(&self, name: &str) -> ControllerResult<String> {
        Ok(self.inspect(name).await?.status)
    }

    pub async fn state(&self, name: &str) -> ControllerResult<ContainerState> {
        let service = self.registry.validate(name)?;
        let ids = self.docker.service_container_ids(service.as_str()).await?;
        match ids.as_slice() {
            [] => Ok(ContainerState::Absent),
            [container_id] => {
                let record = self.docker.inspect_state(container_id).await?;
                Ok(ContainerState::from_record(&record))
            }
            _ => Err(ControllerError::ContainerResolution {
                service: service.to_string(),
                matches: ids.len(),
            }),
        }
    }
}
