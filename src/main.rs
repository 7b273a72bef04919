//! `dropfour` binary: load settings, start the server, wait for a signal.

mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dropfour_server::{DropFourServer, wait_for_signal};
use dropfour_settings::Settings;
use tracing::info;

/// Two-player connect-four session server.
#[derive(Debug, Parser)]
#[command(name = "dropfour", version, about)]
struct Cli {
    /// Settings file (JSON). Defaults to `./dropfour.json`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,
    /// Port to bind.
    #[arg(long)]
    port: Option<u16>,
    /// Directory with `index.html` and client assets.
    #[arg(long)]
    static_dir: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `dropfour_server=trace`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Layer flags over the loaded settings.
    fn apply(self, settings: &mut Settings) {
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = self.static_dir {
            settings.server.static_dir = dir;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    let path = cli
        .config
        .take()
        .unwrap_or_else(dropfour_settings::settings_path);
    let mut settings = dropfour_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);

    logging::init_subscriber(&settings.logging);
    info!(config = %path.display(), "starting dropfour");

    let drain_timeout = Duration::from_secs(settings.server.shutdown_timeout_secs);
    let bind_addr = settings.server.bind_addr();
    let server = DropFourServer::new(settings.server);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%addr, static_dir = %server.settings().static_dir.display(), "dropfour ready");

    wait_for_signal().await;
    info!("shutting down");
    server.shutdown().drain(vec![handle], drain_timeout).await;
    Ok(())
}
