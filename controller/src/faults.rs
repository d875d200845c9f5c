//! Scoped fault injection
//!
//! Each operation disrupts one container, runs the caller's body and then
//! restores the container and waits for it to become ready again. The
//! restore step runs on every exit path of the body, panics included.

use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};

use futures_util::FutureExt;
use tracing::{error, info};

use crate::core::WaitOptions;
use crate::environment::EnvironmentController;
use crate::error::{ControllerError, ControllerResult};
use crate::services::ContainerAction;
use crate::traits::HealthCheck;

/// How a disrupted service is judged recovered
#[derive(Clone, Copy, Default)]
pub struct RecoveryOptions<'a> {
    /// Custom readiness check; the controller's own probe is used when absent
    pub health_check: Option<&'a dyn HealthCheck>,
    pub wait: WaitOptions,
}

impl<'a> RecoveryOptions<'a> {
    pub fn new(wait: WaitOptions) -> Self {
        Self {
            health_check: None,
            wait,
        }
    }

    pub fn with_health_check(mut self, health_check: &'a dyn HealthCheck) -> Self {
        self.health_check = Some(health_check);
        self
    }
}

impl EnvironmentController {
    /// Kill the service's container for the duration of `body`, then restart it
    pub async fn container_down<T, F, Fut>(
        &self,
        name: &str,
        recovery: RecoveryOptions<'_>,
        body: F,
    ) -> ControllerResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.with_fault(name, ContainerAction::Kill, ContainerAction::Restart, recovery, body)
            .await
    }

    /// Pause the service's container for the duration of `body`, then unpause it
    pub async fn container_paused<T, F, Fut>(
        &self,
        name: &str,
        recovery: RecoveryOptions<'_>,
        body: F,
    ) -> ControllerResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.with_fault(name, ContainerAction::Pause, ContainerAction::Unpause, recovery, body)
            .await
    }

    /// Stop the service's container for the duration of `body`, then start it
    pub async fn container_stopped<T, F, Fut>(
        &self,
        name: &str,
        recovery: RecoveryOptions<'_>,
        body: F,
    ) -> ControllerResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.with_fault(name, ContainerAction::Stop, ContainerAction::Start, recovery, body)
            .await
    }

    /// Apply `disrupt`, run `body`, then always apply `restore` and wait for readiness
    ///
    /// A panic in the body is resumed unchanged once recovery was attempted.
    /// Otherwise a failed restore or an expired recovery wait is the error.
    async fn with_fault<T, F, Fut>(
        &self,
        name: &str,
        disrupt: ContainerAction,
        restore: ContainerAction,
        recovery: RecoveryOptions<'_>,
        body: F,
    ) -> ControllerResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let container_id = self.get_container_id(name).await?;

        info!(service = %name, container_id = %container_id, "💥 Injecting fault: {}", disrupt);
        self.docker.apply(disrupt, &container_id).await?;

        let outcome = AssertUnwindSafe(async move { body().await })
            .catch_unwind()
            .await;

        let recovered = self.recover(name, &container_id, restore, &recovery).await;

        match outcome {
            Ok(value) => {
                recovered?;
                Ok(value)
            }
            Err(panic) => {
                if let Err(e) = recovered {
                    error!(service = %name, "❌ Recovery after failed test body also failed: {}", e);
                }
                resume_unwind(panic)
            }
        }
    }

    async fn recover(
        &self,
        name: &str,
        container_id: &str,
        restore: ContainerAction,
        recovery: &RecoveryOptions<'_>,
    ) -> ControllerResult<()> {
        info!(service = %name, container_id = %container_id, "🩹 Restoring container: {}", restore);
        self.docker.apply(restore, container_id).await?;

        if self.wait_for_health(name, recovery.health_check, recovery.wait).await? {
            info!(service = %name, "✅ Service recovered");
            Ok(())
        } else {
            Err(ControllerError::RecoveryTimeout {
                service: name.to_string(),
                timeout: recovery.wait.timeout,
            })
        }
    }
}
