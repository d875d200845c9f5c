//! Session scoped test context
//!
//! One [`TestSession`] is created per test run and handed to every test that
//! needs the environment. It brackets the run with setup and teardown and
//! prepares the environment before each test.

use controller::{run_health_checks, EnvironmentController, EnvironmentPhase, HealthCheck, WaitOptions};
use tracing::{error, info};

use crate::error::{HarnessError, HarnessResult};

pub struct TestSession {
    controller: EnvironmentController,
    wait: WaitOptions,
}

impl TestSession {
    /// Bring the environment up and wrap it in a session
    pub async fn start(mut controller: EnvironmentController) -> HarnessResult<Self> {
        info!("🧪 Starting test session for project {}", controller.settings().project_name);
        controller.setup().await?;
        Ok(Self {
            controller,
            wait: WaitOptions::default(),
        })
    }

    /// Readiness wait used by [`TestSession::begin_test`]
    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn controller(&self) -> &EnvironmentController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut EnvironmentController {
        &mut self.controller
    }

    /// Mark the start of `test_name` and wait until the environment is usable
    ///
    /// The name is written to every plugin so produced logs and stats can be
    /// attributed to tests. Then all services must become ready, followed by
    /// the supplied health checks.
    pub async fn begin_test(&mut self, test_name: &str, required: &[&dyn HealthCheck]) -> HarnessResult<()> {
        if self.controller.phase() != EnvironmentPhase::Up {
            return Err(HarnessError::NoSession {
                operation: format!("begin_test({test_name})"),
            });
        }

        info!("▶️ {}", test_name);
        self.controller.update_plugins(test_name);

        if !self.controller.wait_for_services(None, self.wait).await? {
            error!("❌ Environment services not ready for {}", test_name);
            return Err(HarnessError::NotReady {
                what: "environment services".to_string(),
                timeout: self.wait.timeout,
            });
        }

        if !required.is_empty() && !run_health_checks(required, self.wait).await {
            error!("❌ Required health checks failed for {}", test_name);
            return Err(HarnessError::NotReady {
                what: format!("{} required health checks", required.len()),
                timeout: self.wait.timeout,
            });
        }

        Ok(())
    }

    /// Tear the environment down, consuming the session
    pub async fn finish(mut self) -> HarnessResult<()> {
        info!("🏁 Finishing test session");
        self.controller.teardown().await?;
        Ok(())
    }
}
