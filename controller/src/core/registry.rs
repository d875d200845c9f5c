//! Service registry
//!
//! Ordered set of the services declared by the environment, with the
//! readiness policy each one was declared with. Built once at controller
//! construction and read-only afterwards.

use std::collections::HashMap;

use shared::{ReadinessPolicy, ServiceName};
use tracing::debug;

use crate::error::{ControllerError, ControllerResult};
use crate::services::Compose;

#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceName>,
    policies: HashMap<ServiceName, ReadinessPolicy>,
}

impl ServiceRegistry {
    /// Build a registry from service names (duplicates collapse, order is kept)
    pub fn new<I>(names: I, declared_checks: &HashMap<String, bool>) -> ControllerResult<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut services: Vec<ServiceName> = Vec::new();
        let mut policies = HashMap::new();

        for name in names {
            let service = ServiceName::new(name.as_ref())?;
            if policies.contains_key(&service) {
                continue;
            }
            let declared = declared_checks.get(service.as_str()).copied().unwrap_or(false);
            policies.insert(service.clone(), ReadinessPolicy::from_declared_health_check(declared));
            services.push(service);
        }

        Ok(Self { services, policies })
    }

    /// Load the registry through the compose command surface
    pub async fn load(compose: &Compose) -> ControllerResult<Self> {
        let names = compose.services().await?;
        let declared = compose.declared_health_checks().await?;
        debug!("📋 Environment services: {:?}", names);
        Self::new(names, &declared)
    }

    pub fn services(&self) -> &[ServiceName] {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    /// Fail fast on names the environment does not declare
    pub fn validate(&self, name: &str) -> ControllerResult<&ServiceName> {
        self.services
            .iter()
            .find(|service| service.as_str() == name)
            .ok_or_else(|| ControllerError::InvalidServiceName {
                name: name.to_string(),
                known: self.services.iter().map(|s| s.to_string()).collect(),
            })
    }

    pub fn policy(&self, name: &str) -> Option<ReadinessPolicy> {
        self.policies.get(name).copied()
    }
}
