//! envctl: drive a compose test environment from the command line

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use controller::{EnvironmentController, WaitOptions};
use harness::EnvironmentConfig;
use shared::logging::init_tracing_with_level;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "envctl")]
#[command(about = "Control a container based test environment")]
struct Cli {
    /// INI file with an [environment] section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level for the toolkit crates
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the environment up and keep collecting logs until Ctrl+C
    Up {
        /// Leave containers running and exit once they are ready
        #[arg(long)]
        detach: bool,

        /// Readiness timeout in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
    /// Stop and remove every container of the environment
    Down,
    /// Wait until services are ready
    Wait {
        /// Services to wait for, all of them when omitted
        services: Vec<String>,

        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
    /// Kill a service container
    Kill { service: String },
    /// Restart a service container
    Restart { service: String },
    /// Pause a service container
    Pause { service: String },
    /// Unpause a service container
    Unpause { service: String },
    /// Stop a service container
    Stop { service: String },
    /// Start a service container
    Start { service: String },
    /// Show status and readiness of a service
    Status { service: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing_with_level(Some(&cli.log_level));

    let config = EnvironmentConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!("⚙️ Using project '{}' from {}", config.project_name, config.compose_path.display());

    let controller = EnvironmentController::connect(config.to_settings())
        .await
        .context("Failed to connect to the environment")?;

    match cli.command {
        Commands::Up { detach, timeout_secs } => up(controller, detach, timeout_secs).await?,
        Commands::Down => controller.cleanup().await?,
        Commands::Wait {
            services,
            timeout_secs,
            interval_ms,
        } => {
            let options = WaitOptions::new(Duration::from_millis(interval_ms), Duration::from_secs(timeout_secs));
            let names: Vec<&str> = services.iter().map(String::as_str).collect();
            let selection = if names.is_empty() { None } else { Some(names.as_slice()) };
            if !controller.wait_for_services(selection, options).await? {
                bail!("services not ready within {}s", timeout_secs);
            }
        }
        Commands::Kill { service } => controller.kill_container(&service).await?,
        Commands::Restart { service } => controller.restart_container(&service).await?,
        Commands::Pause { service } => controller.pause_container(&service).await?,
        Commands::Unpause { service } => controller.unpause_container(&service).await?,
        Commands::Stop { service } => controller.stop_container(&service).await?,
        Commands::Start { service } => controller.start_container(&service).await?,
        Commands::Status { service } => {
            let status = controller.container_status(&service).await?;
            let ready = controller.is_container_ready(&service).await;
            println!("{service}: {status} (ready: {ready})");
        }
    }

    Ok(())
}

async fn up(controller: EnvironmentController, detach: bool, timeout_secs: u64) -> Result<()> {
    // Detached runs outlive this process, so nothing may stream into files.
    let mut controller = if detach {
        controller.with_plugins(Vec::new())
    } else {
        controller
    };

    controller.setup().await?;

    let options = WaitOptions::default().with_timeout(Duration::from_secs(timeout_secs));
    let ready = controller.wait_for_services(None, options).await?;
    if !ready {
        warn!("⏰ Environment not ready within {}s", timeout_secs);
    }

    if detach {
        if !ready {
            bail!("environment not ready");
        }
        info!("🔄 Environment left running; use `envctl down` to remove it");
        return Ok(());
    }

    info!("Press Ctrl+C to stop the environment");
    tokio::signal::ctrl_c().await?;

    controller.teardown().await?;
    info!("🏁 Environment stopped");
    Ok(())
}
