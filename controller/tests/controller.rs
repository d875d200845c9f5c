//! Environment controller lifecycle and query tests
//!
//! Everything runs against the scripted runner, so these tests never need a
//! container runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use controller::traits::MockSessionPlugin;
use controller::{ControllerError, EnvironmentPhase, WaitOptions};
use shared::ContainerState;

mod common;
use common::{ScriptedRunner, TestFixtures, TestHelpers};

fn fast_wait() -> WaitOptions {
    WaitOptions::new(Duration::from_millis(100), Duration::from_secs(2))
}

/// Plugin mock appending `<name>:<event>` to a shared journal
fn journaled_plugin(name: &'static str, journal: Arc<Mutex<Vec<String>>>, start_ok: bool) -> MockSessionPlugin {
    let mut plugin = MockSessionPlugin::new();
    plugin.expect_name().returning(move || name.to_string());

    let on_start = journal.clone();
    plugin.expect_start().returning(move || {
        on_start.lock().unwrap().push(format!("{name}:start"));
        if start_ok {
            Ok(())
        } else {
            Err(ControllerError::plugin(name, "refused to start"))
        }
    });

    let on_stop = journal.clone();
    plugin.expect_stop().returning(move || {
        on_stop.lock().unwrap().push(format!("{name}:stop"));
        Ok(())
    });

    let on_update = journal;
    plugin.expect_update().returning(move |message| {
        on_update.lock().unwrap().push(format!("{name}:update:{message}"));
        Ok(())
    });
    plugin
}

#[tokio::test]
async fn test_construction_loads_registry_and_pins_api_version() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;

    let names: Vec<&str> = env.services().iter().map(|s| s.as_str()).collect();
    assert_eq!(names, vec!["web", "db", "cache"]);
    assert_eq!(env.phase(), EnvironmentPhase::Uninitialized);
    assert_eq!(env.plugin_names(), vec!["log-collector"]);

    let pinned = ("DOCKER_API_VERSION".to_string(), TestFixtures::API_VERSION.to_string());
    let compose_calls: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("compose"))
        .collect();
    assert_eq!(compose_calls.len(), 2);
    assert!(compose_calls.iter().all(|c| c.env.contains(&pinned)));
}

#[tokio::test]
async fn test_construction_fails_when_listing_services_fails() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    runner.fail_on(&["config", "--services"]);

    let result = controller::EnvironmentController::with_runner(
        TestHelpers::settings(dir.path()),
        runner.shared(),
    )
    .await;
    assert_matches!(result.err(), Some(ControllerError::ExternalCommand { .. }));
}

#[tokio::test]
async fn test_stats_collector_registered_only_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let settings = TestHelpers::settings(dir.path()).with_collect_stats(true);
    let env = TestHelpers::controller(&runner, settings).await;

    assert_eq!(env.plugin_names(), vec!["log-collector", "stats-collector"]);
}

#[tokio::test]
async fn test_invalid_service_name_makes_no_external_calls() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;
    runner.clear_calls();

    let unknown = "not-a-service";
    assert!(env.kill_container(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.restart_container(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.pause_container(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.unpause_container(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.stop_container(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.start_container(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.get_container_id(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.container_status(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.container_state(unknown).await.unwrap_err().is_invalid_service());
    assert!(env.run_exec_in_container(unknown, "true").await.unwrap_err().is_invalid_service());
    assert!(env
        .wait_for_services(Some(&["web", unknown]), fast_wait())
        .await
        .unwrap_err()
        .is_invalid_service());
    assert!(env
        .wait_for_health(unknown, None, fast_wait())
        .await
        .unwrap_err()
        .is_invalid_service());
    assert!(!env.is_container_ready(unknown).await);

    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_setup_and_teardown_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let mut env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path()))
        .await
        .with_plugins(vec![
            Box::new(journaled_plugin("first", journal.clone(), true)),
            Box::new(journaled_plugin("second", journal.clone(), true)),
        ]);

    env.setup().await.unwrap();
    assert_eq!(env.phase(), EnvironmentPhase::Up);
    env.update_plugins("test_ordering");
    env.teardown().await.unwrap();
    assert_eq!(env.phase(), EnvironmentPhase::Down);

    assert_eq!(runner.compose_verbs(), vec!["config", "config", "down", "up", "down"]);
    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            "first:start",
            "second:start",
            "first:update:test_ordering",
            "second:update:test_ordering",
            "first:stop",
            "second:stop",
        ]
    );
}

#[tokio::test]
async fn test_setup_failure_tears_down_and_returns_original_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    runner.fail_on(&["up", "--build", "-d"]);

    let mut plugin = MockSessionPlugin::new();
    plugin.expect_name().returning(|| "never-started".to_string());
    plugin.expect_start().times(0);
    plugin.expect_stop().times(0);

    let mut env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path()))
        .await
        .with_plugins(vec![Box::new(plugin)]);

    let err = env.setup().await.unwrap_err();
    assert_matches!(err, ControllerError::ExternalCommand { ref command, .. } if command.ends_with("up --build -d"));
    assert_eq!(runner.compose_verbs(), vec!["config", "config", "down", "up", "down"]);
    assert_eq!(env.phase(), EnvironmentPhase::Down);
}

#[tokio::test]
async fn test_failing_plugin_start_is_skipped_and_never_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let mut env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path()))
        .await
        .with_plugins(vec![
            Box::new(journaled_plugin("broken", journal.clone(), false)),
            Box::new(journaled_plugin("healthy", journal.clone(), true)),
        ]);

    env.setup().await.unwrap();
    env.update_plugins("marker");
    env.teardown().await.unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["broken:start", "healthy:start", "healthy:update:marker", "healthy:stop"]
    );
}

#[tokio::test]
async fn test_plugin_stop_failure_does_not_skip_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();

    let mut plugin = MockSessionPlugin::new();
    plugin.expect_name().returning(|| "flaky".to_string());
    plugin.expect_start().times(1).returning(|| Ok(()));
    plugin
        .expect_stop()
        .times(1)
        .returning(|| Err(ControllerError::plugin("flaky", "stop failed")));

    let mut env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path()))
        .await
        .with_plugins(vec![Box::new(plugin)]);

    env.setup().await.unwrap();
    env.teardown().await.unwrap();
    assert_eq!(runner.count(&["down"]), 2);
}

#[tokio::test]
async fn test_reuse_containers_skips_every_down() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let settings = TestHelpers::settings(dir.path()).with_reuse_containers(true);
    let mut env = TestHelpers::controller(&runner, settings).await.with_plugins(Vec::new());

    env.setup().await.unwrap();
    env.teardown().await.unwrap();

    assert_eq!(runner.count(&["down"]), 0);
    assert_eq!(runner.count(&["up", "--build", "-d"]), 1);
}

#[tokio::test]
async fn test_setup_twice_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let mut env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path()))
        .await
        .with_plugins(Vec::new());

    env.setup().await.unwrap();
    assert_matches!(env.setup().await, Err(ControllerError::SessionPhase { .. }));

    env.teardown().await.unwrap();
    env.teardown().await.unwrap();
    assert_eq!(runner.count(&["down"]), 2);
}

#[tokio::test]
async fn test_per_container_actions_target_resolved_id() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;

    env.pause_container("web").await.unwrap();
    assert_eq!(env.container_state("web").await.unwrap(), ContainerState::Paused);
    env.unpause_container("web").await.unwrap();
    env.stop_container("cache").await.unwrap();
    assert_eq!(env.container_status("cache").await.unwrap(), "exited");
    env.start_container("cache").await.unwrap();

    let web = TestFixtures::container_id("web");
    let cache = TestFixtures::container_id("cache");
    assert_eq!(
        runner.runtime_actions(),
        vec![
            format!("pause {web}"),
            format!("unpause {web}"),
            format!("stop {cache}"),
            format!("start {cache}"),
        ]
    );
}

#[tokio::test]
async fn test_container_resolution_requires_exactly_one_match() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;

    runner.set_containers("web", &["aaa", "bbb"]);
    assert_matches!(
        env.kill_container("web").await,
        Err(ControllerError::ContainerResolution { matches: 2, .. })
    );

    runner.set_containers("web", &[]);
    assert_matches!(
        env.get_container_id("web").await,
        Err(ControllerError::ContainerResolution { matches: 0, .. })
    );
    assert_eq!(env.container_state("web").await.unwrap(), ContainerState::Absent);
    assert!(runner.runtime_actions().is_empty());
}

#[tokio::test]
async fn test_readiness_follows_declared_health_checks() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;

    assert!(env.is_container_ready("web").await);
    assert!(env.is_container_ready("db").await);
    assert_eq!(env.container_state("db").await.unwrap(), ContainerState::Healthy);

    runner.set_status("db", "exited");
    assert!(!env.is_container_ready("db").await);
    assert_eq!(env.inspect_container("db").await.unwrap().health.unwrap().status, "unhealthy");
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_services_true_when_all_ready() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;

    assert!(env.wait_for_services(None, fast_wait()).await.unwrap());
    assert!(env.wait_for_services(Some(&["db"]), fast_wait()).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_services_false_on_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;
    runner.set_status("cache", "exited");

    let started = tokio::time::Instant::now();
    assert!(!env.wait_for_services(None, fast_wait()).await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(3));

    assert!(env.wait_for_services(Some(&["web", "db"]), fast_wait()).await.unwrap());
}

#[tokio::test]
async fn test_run_exec_in_container() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    let env = TestHelpers::controller(&runner, TestHelpers::settings(dir.path())).await;

    let output = env.run_exec_in_container("web", "echo hi").await.unwrap();
    assert_eq!(output, "ran: echo hi");
}
