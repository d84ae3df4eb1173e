//! Transcoder host binary.
//!
//! # Usage
//!
//! ```bash
//! # Foreground with an explicit configuration file
//! crossmode -f -c /etc/crossmode.yml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use crossmode_host::{Config, Host, HostError};
use crossmode_host::config::LogConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// DMR / P25 voice transcoder
#[derive(Parser, Debug)]
#[command(name = "crossmode")]
#[command(about = "Bridges DMR and P25 Phase 1 voice traffic between two masters")]
#[command(version, disable_version_flag = true)]
struct Args {
    /// Foreground mode
    #[arg(short = 'f', long)]
    foreground: bool,

    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = "crossmode.yml")]
    config: PathBuf,

    /// Show version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => return fatal(&e.to_string()),
    };

    if let Err(e) = init_logging(&config.log) {
        return fatal(&e.to_string());
    }

    tracing::info!(">> DMR / P25 Transcoder");

    if config.daemon && !args.foreground {
        tracing::warn!("daemon mode is not supported; continuing in the foreground");
    }

    let mut host = Host::new(config);
    match host.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        },
    }
}

/// Map the numeric log levels (1 debug .. 6 fatal) onto tracing directives.
fn level_directive(level: u32) -> &'static str {
    match level {
        1 => "debug",
        0 | 2 | 3 => "info",
        4 => "warn",
        _ => "error",
    }
}

fn init_logging(config: &LogConfig) -> Result<(), HostError> {
    let display_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(config.display_level)));
    let display_layer = fmt::layer().with_filter(display_filter);

    if !config.file_path.is_empty() && config.file_level > 0 {
        let path = Path::new(&config.file_path).join(format!("{}.log", config.file_root));
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HostError::Config(format!("unable to open the log file {}: {e}", path.display())))?;
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .with_filter(EnvFilter::new(level_directive(config.file_level)));
        tracing_subscriber::registry().with(display_layer).with(file_layer).init();
    } else {
        tracing_subscriber::registry().with(display_layer).init();
    }
    Ok(())
}

/// Startup failures happen before logging exists; report them the way the
/// shell expects.
fn fatal(message: &str) -> ExitCode {
    #[allow(clippy::print_stderr)]
    {
        eprintln!("crossmode: {message}");
    }
    ExitCode::FAILURE
}
