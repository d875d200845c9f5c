//! Session log collector
//!
//! Streams the combined, timestamped compose log into one session file and
//! splits it into one file per service when the session ends.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ControllerError, ControllerResult};
use crate::services::Compose;
use crate::traits::{SessionPlugin, StreamingProcess};

/// Separates the service name from the message in compose log lines
pub const SEPARATOR: char = '|';

/// Lines starting with this prefix are markers broadcast to every service log
pub const COMMON_LOG_PREFIX: &str = ">>>";

const PLUGIN_NAME: &str = "log-collector";

struct LogSession {
    file: File,
    stream: Box<dyn StreamingProcess>,
}

pub struct LogCollector {
    log_path: PathBuf,
    compose: Compose,
    session: Option<LogSession>,
}

impl LogCollector {
    pub fn new(log_path: impl Into<PathBuf>, compose: Compose) -> Self {
        Self {
            log_path: log_path.into(),
            compose,
            session: None,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn is_collecting(&self) -> bool {
        self.session.is_some()
    }
}

/// Render a marker the way it is interleaved into the combined log
pub fn format_marker(message: &str) -> String {
    format!(
        "\n{} {} {}\n\n",
        COMMON_LOG_PREFIX,
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"),
        message
    )
}

#[async_trait::async_trait]
impl SessionPlugin for LogCollector {
    fn name(&self) -> String {
        PLUGIN_NAME.to_string()
    }

    async fn start(&mut self) -> ControllerResult<()> {
        if self.session.is_some() {
            return Err(ControllerError::plugin(PLUGIN_NAME, "log collection already running"));
        }

        debug!("Starting logs collection into {}", self.log_path.display());
        if let Some(parent) = self.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Truncate, then keep an append handle so marker writes never clobber the streamer
        File::create(&self.log_path)?;
        let file = OpenOptions::new().append(true).open(&self.log_path)?;
        let stream = self
            .compose
            .runner()
            .spawn_streaming(&self.compose.logs_command(), file.try_clone()?)?;

        self.session = Some(LogSession { file, stream });
        Ok(())
    }

    async fn stop(&mut self) -> ControllerResult<()> {
        let Some(LogSession { file, mut stream }) = self.session.take() else {
            debug!("Log collector is idle, nothing to stop");
            return Ok(());
        };

        debug!("Stopping logs collection");
        let terminated = stream.terminate().await;
        drop(file);

        let path = self.log_path.clone();
        let split = tokio::task::spawn_blocking(move || split_combined_log(&path))
            .await
            .map_err(|e| ControllerError::plugin(PLUGIN_NAME, format!("split task failed: {e}")))?;

        match &split {
            Ok(services) => info!("📄 Split session log into {} service logs", services.len()),
            Err(e) => warn!("⚠️ Splitting {} failed: {}", self.log_path.display(), e),
        }

        terminated?;
        split?;
        Ok(())
    }

    fn update(&mut self, message: &str) -> ControllerResult<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ControllerError::plugin(PLUGIN_NAME, "cannot write a marker while idle"))?;

        session.file.write_all(format_marker(message).as_bytes())?;
        session.file.flush()?;
        Ok(())
    }
}

/// File-system safe form of a service name
fn sanitize(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// Split a combined log into `<dir>/<service>.log` files
///
/// Returns the service names in the order their files were created. Every
/// opened file is flushed even when reading fails midway.
pub fn split_combined_log(path: &Path) -> std::io::Result<Vec<String>> {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut order: Vec<String> = Vec::new();
    let mut writers: HashMap<String, BufWriter<File>> = HashMap::new();

    let routed = route_lines(path, dir, &mut order, &mut writers);

    let mut flushed = Ok(());
    for name in &order {
        if let Some(mut writer) = writers.remove(name) {
            if let Err(e) = writer.flush() {
                warn!("⚠️ Failed to flush {}.log: {}", name, e);
                if flushed.is_ok() {
                    flushed = Err(e);
                }
            }
        }
    }

    routed?;
    flushed?;
    Ok(order)
}

fn route_lines(
    path: &Path,
    dir: &Path,
    order: &mut Vec<String>,
    writers: &mut HashMap<String, BufWriter<File>>,
) -> std::io::Result<()> {
    let reader = BufReader::new(File::open(path)?);

    for line in reader.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');

        if line.starts_with(COMMON_LOG_PREFIX) {
            for name in order.iter() {
                if let Some(writer) = writers.get_mut(name) {
                    writeln!(writer, "\n{line}\n")?;
                }
            }
            continue;
        }

        let Some((service, message)) = line.split_once(SEPARATOR) else {
            continue;
        };
        let service = sanitize(service.trim());
        if service.is_empty() {
            continue;
        }

        if !writers.contains_key(&service) {
            let file = File::create(dir.join(format!("{service}.log")))?;
            writers.insert(service.clone(), BufWriter::new(file));
            order.push(service.clone());
        }

        if let Some(writer) = writers.get_mut(&service) {
            writeln!(writer, "{}", message.strip_prefix(' ').unwrap_or(message))?;
        }
    }

    Ok(())
}
