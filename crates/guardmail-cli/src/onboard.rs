//! `guardmail onboard` — write a default configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use guardmail_core::config::{get_config_path, load_config, save_config};

use crate::helpers;

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "📬 Guardmail — Setup".cyan().bold());
    println!();

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    // 1. Create config if it doesn't exist
    let config = if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
        load_config(Some(&config_path))
    } else {
        let config = load_config(Some(&config_path)); // defaults + env
        save_config(&config, Some(&config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
        config
    };

    // 2. Ensure the ledger directory exists
    let ledger = helpers::ledger_path(&config);
    if let Some(parent) = ledger.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    println!("  {} ledger at {}", "✓".green(), ledger.display());

    // 3. What is still missing
    println!();
    match config.validate() {
        Ok(()) => println!(
            "{}",
            "  Setup complete! Run `guardmail sync` once, then `guardmail run`.".green()
        ),
        Err(e) => {
            println!("  {} {}", "!".yellow().bold(), e);
            println!(
                "  {}",
                "Fill in gmail.* and discord.webhookUrl, then run `guardmail sync`.".dimmed()
            );
        }
    }
    println!();

    Ok(())
}
