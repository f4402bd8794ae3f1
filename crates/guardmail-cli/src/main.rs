//! Guardmail CLI — entry point.
//!
//! # Commands
//!
//! - `guardmail run` — poll the mailbox and forward login codes
//! - `guardmail sync` — mark the current mailbox as already handled
//! - `guardmail parse FILE` — run the decoder/extractor on a saved body
//! - `guardmail status` — show configuration and ledger status
//! - `guardmail onboard` — write a default config file

mod helpers;
mod onboard;
mod parse_cmd;
mod run;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 📬 Guardmail — forwards Steam Guard login codes from Gmail to Discord
#[derive(Parser)]
#[command(name = "guardmail", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the mailbox and forward new login codes
    Run {
        /// Seconds between cycles (overrides poller.intervalSeconds)
        #[arg(short, long)]
        interval: Option<String>,

        /// Run a single cycle and exit
        #[arg(long, default_value_t = false)]
        once: bool,

        /// Record every current message as handled and exit
        #[arg(long, default_value_t = false)]
        first_run: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Config file (default: ~/.guardmail/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Record every current message as handled without notifying
    Sync {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Config file (default: ~/.guardmail/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Decode and parse a saved message body
    Parse {
        /// File holding the body
        file: PathBuf,

        /// The file holds the URL-safe base64 body as returned by the API
        #[arg(long, default_value_t = false)]
        base64: bool,

        /// Marker phrase (default: poller.markerPhrase from config)
        #[arg(short, long)]
        marker: Option<String>,
    },

    /// Show configuration and ledger status
    Status {
        /// Config file (default: ~/.guardmail/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Create a default configuration file
    Onboard {
        /// Config file (default: ~/.guardmail/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            interval,
            once,
            first_run,
            logs,
            config,
        } => {
            init_logging(logs);
            let options = run::RunOptions {
                config_path: config,
                interval,
                once,
                first_run,
            };
            run::run(options).await
        }
        Commands::Sync { logs, config } => {
            init_logging(logs);
            run::sync(config.as_deref()).await
        }
        Commands::Parse {
            file,
            base64,
            marker,
        } => parse_cmd::run(&file, base64, marker.as_deref()),
        Commands::Status { config } => status::run(config.as_deref()),
        Commands::Onboard { config } => onboard::run(config.as_deref()),
    }
}

/// Default filter directives; `RUST_LOG` replaces them when set.
fn log_directives(verbose: bool) -> &'static str {
    if verbose {
        "guardmail=debug,info"
    } else {
        "info"
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
