//! tcp-beep - Main Entry Point
//!
//! Runs one node of the latency mesh until SIGINT or SIGTERM.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tcp_beep::{config, Endpoint, Monitor, MonitorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "tcp-beep", version, about = "TCP latency monitor for a mesh of nodes")]
struct Cli {
    /// Local host name or IP to bind the echo responder to
    host: String,

    /// Local TCP port
    port: u16,

    /// Config file (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Peer address, repeatable. Replaces the configured peer list.
    #[arg(short, long = "peer", value_name = "HOST:PORT")]
    peers: Vec<Endpoint>,

    #[arg(long)]
    messages_per_second: Option<f64>,

    #[arg(long)]
    messages_per_report: Option<u32>,

    /// Directory for stat files
    #[arg(long)]
    stats_dir: Option<PathBuf>,

    /// Disable the stat file sink
    #[arg(long)]
    no_file_stats: bool,

    /// Statsd daemon address
    #[arg(long, value_name = "HOST:PORT")]
    statsd: Option<String>,

    /// Also write daily-rotated logs into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::load(path)?,
            None => match config::default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading config from {:?}", path);
                    MonitorConfig::load(path)?
                }
                None => MonitorConfig::default(),
            },
        };

        if !self.peers.is_empty() {
            config.peers = self.peers.clone();
        }
        if let Some(mps) = self.messages_per_second {
            config.probe.messages_per_second = mps;
        }
        if let Some(mpr) = self.messages_per_report {
            config.probe.messages_per_report = mpr;
        }
        if let Some(dir) = &self.stats_dir {
            config.reporting.stats_log_dir = dir.clone();
        }
        if self.no_file_stats {
            config.reporting.write_stats_to_file = false;
        }
        if let Some(statsd) = &self.statsd {
            config.reporting.statsd_host = Some(statsd.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Install the global subscriber. The returned guard flushes the file
/// writer and must live until exit.
fn init_logging(log_dir: Option<&PathBuf>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tcp_beep=debug"))
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "tcp-beep.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_dir.as_ref());

    let local = Endpoint::new(cli.host.clone(), cli.port);
    tracing::info!("Starting tcp-beep on {}", local);

    let config = cli.load_config().context("Invalid configuration")?;
    let mut monitor = Monitor::new(config, local).context("Failed to set up monitor")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, shutdown.clone())
            .context("Failed to register signal handler")?;
    }

    monitor.run_until(&shutdown, Duration::from_millis(200))?;

    tracing::info!("Shutting down...");
    Ok(())
}
