use std::path::PathBuf;

use clap::Parser;
use feedback_monitor::{
    Command, Config, MemorySettingsStore, Monitor, SettingsConfig, SettingsStore,
    SqliteSettingsStore,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "feedback-monitor")]
#[command(about = "Sensor monitor relaying feedback to the watch face")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "feedback-monitor.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,feedback_monitor=info,feedback_port=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        app_id = %config.port.app_id,
        local_port = %config.port.local_port,
        runtime_dir = ?config.port.runtime_dir,
        "Starting feedback-monitor"
    );

    match config.settings {
        SettingsConfig::Memory => {
            info!("Using in-memory settings");
            run_monitor(&config, MemorySettingsStore::default()).await?;
        }
        SettingsConfig::Sqlite { ref path } => {
            info!(path = ?path, "Using SQLite settings");
            let settings = SqliteSettingsStore::new(path).await?;
            run_monitor(&config, settings).await?;
        }
    }

    Ok(())
}

async fn run_monitor<S: SettingsStore>(config: &Config, settings: S) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();
    let (monitor, inbound) = Monitor::from_config(config, settings).await?;
    let (command_tx, command_rx) = mpsc::channel(16);

    // Blocking stdin reads cannot be cancelled; keep them off the runtime.
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read command input");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    if command_tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Invalid command"),
            }
        }
    });

    let mut handle = tokio::spawn(monitor.run(command_rx, inbound, cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            cancel.cancel();
            handle.await?;
        }
        result = &mut handle => result?,
    }

    info!("feedback-monitor stopped");
    Ok(())
}
