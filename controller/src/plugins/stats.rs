//! Container resource usage collector

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ControllerError, ControllerResult};
use crate::plugins::summary::{StatsReport, COMMON_STATS_PREFIX};
use crate::services::DockerCli;
use crate::traits::{SessionPlugin, StreamingProcess};

const PLUGIN_NAME: &str = "stats-collector";

struct StatsSession {
    file: File,
    stream: Box<dyn StreamingProcess>,
}

/// Samples `docker stats` for every project container while a session runs
///
/// Produces `stats.json` (raw samples), `summary.json` and one
/// `<container>.json` per sampled container, all inside `work_dir`.
pub struct StatsCollector {
    work_dir: PathBuf,
    docker: DockerCli,
    session: Option<StatsSession>,
}

impl StatsCollector {
    /// Collector writing into `<target_dir>/stats`
    pub fn new(target_dir: impl AsRef<Path>, docker: DockerCli) -> Self {
        Self {
            work_dir: target_dir.as_ref().join("stats"),
            docker,
            session: None,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn stats_file_path(&self) -> PathBuf {
        self.work_dir.join("stats.json")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.work_dir.join("summary.json")
    }
}

/// Parse the raw sample file and write the summary and per-container files
pub fn write_stats_report(stats_file: &Path, summary_file: &Path) -> ControllerResult<StatsReport> {
    let report = StatsReport::from_reader(BufReader::new(File::open(stats_file)?))?;
    let dir = stats_file.parent().unwrap_or_else(|| Path::new(""));

    for (container, entries) in &report.per_container {
        let target = dir.join(format!("{}.json", container.replace(['/', '\\'], "_")));
        fs::write(target, serde_json::to_vec_pretty(entries)?)?;
    }
    fs::write(summary_file, serde_json::to_vec_pretty(&report.summary_json()?)?)?;

    Ok(report)
}

#[async_trait::async_trait]
impl SessionPlugin for StatsCollector {
    fn name(&self) -> String {
        PLUGIN_NAME.to_string()
    }

    async fn start(&mut self) -> ControllerResult<()> {
        if self.session.is_some() {
            return Err(ControllerError::plugin(PLUGIN_NAME, "stats collection already running"));
        }

        let containers = self.docker.project_container_names().await?;
        if containers.is_empty() {
            return Err(ControllerError::plugin(
                PLUGIN_NAME,
                format!("no running containers in project {}", self.docker.project()),
            ));
        }

        debug!("Starting stats collection for {:?}", containers);
        fs::create_dir_all(&self.work_dir)?;
        let path = self.stats_file_path();
        File::create(&path)?;
        let file = OpenOptions::new().append(true).open(&path)?;

        let stream = self
            .docker
            .runner()
            .spawn_streaming(&self.docker.stats_command(&containers), file.try_clone()?)?;

        self.session = Some(StatsSession { file, stream });
        Ok(())
    }

    async fn stop(&mut self) -> ControllerResult<()> {
        let Some(StatsSession { file, mut stream }) = self.session.take() else {
            debug!("Stats collector is idle, nothing to stop");
            return Ok(());
        };

        debug!("Stopping stats collection");
        let terminated = stream.terminate().await;
        drop(file);

        let stats_file = self.stats_file_path();
        let summary_file = self.summary_path();
        let report = tokio::task::spawn_blocking(move || write_stats_report(&stats_file, &summary_file))
            .await
            .map_err(|e| ControllerError::plugin(PLUGIN_NAME, format!("summary task failed: {e}")))??;

        info!(
            "📊 Stats summary written for {} containers to {}",
            report.summary.len(),
            self.summary_path().display()
        );
        terminated
    }

    fn update(&mut self, message: &str) -> ControllerResult<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ControllerError::plugin(PLUGIN_NAME, "cannot write a marker while idle"))?;

        session
            .file
            .write_all(format!("{COMMON_STATS_PREFIX} {message}\n").as_bytes())?;
        session.file.flush()?;
        Ok(())
    }
}
