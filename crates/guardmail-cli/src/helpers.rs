//! Shared CLI helpers — config and ledger paths, status marks, banner.

use std::path::{Path, PathBuf};

use colored::Colorize;

use guardmail_core::config::{load_config, Config};
use guardmail_core::utils::expand_home;

/// Load config from `--config` or the default location.
pub fn load(config_path: Option<&Path>) -> Config {
    load_config(config_path)
}

/// Ledger location from config, `~` expanded.
pub fn ledger_path(config: &Config) -> PathBuf {
    expand_home(&config.poller.ledger_path)
}

/// `✓` in green or `✗` in red.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Print the banner shown before long-running commands.
pub fn print_banner(subtitle: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}  {}", "📬 Guardmail".cyan().bold(), version.dimmed(), subtitle.dimmed());
    println!();
}

/// Turn an anyhow chain into one line for display.
pub fn one_line(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
