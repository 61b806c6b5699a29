use std::path::PathBuf;

use clap::Parser;
use feedback_face::{Config, Face};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "feedback-face")]
#[command(about = "Watch face presenting sensor feedback")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "feedback-face.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,feedback_face=info,feedback_port=info".to_owned());
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
        haptics = config.haptics.enabled,
        "Starting feedback-face"
    );

    let cancel = CancellationToken::new();
    let face = Face::open(&config).await?;
    let mut handle = tokio::spawn(face.run(cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            cancel.cancel();
            handle.await?;
        }
        result = &mut handle => result?,
    }

    info!("feedback-face stopped");
    Ok(())
}
