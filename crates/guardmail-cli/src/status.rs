//! `guardmail status` — show configuration, adapter readiness, and ledger
//! state.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use guardmail_core::config::get_config_path;
use guardmail_core::ledger::LedgerStore;
use guardmail_providers::GmailCredentials;

use crate::helpers;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = helpers::load(config_path);
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "📬 Guardmail Status".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<14} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    // Ledger
    let store = LedgerStore::new(helpers::ledger_path(&config));
    let ledger_status = match store.load() {
        Ok(ledger) if store.path().exists() => {
            format!("{} ({} entries)", "✓".green(), ledger.len())
        }
        Ok(_) => format!("{}", "(not created yet)".dimmed()),
        Err(e) => format!("{} {}", helpers::mark(false), e),
    };
    println!(
        "  {:<14} {} {}",
        "Ledger:".bold(),
        store.path().display(),
        ledger_status
    );

    // Poller
    println!(
        "  {:<14} every {}s | query: {}",
        "Polling:".bold(),
        config.poller.interval_seconds,
        config.gmail.query.dimmed()
    );
    println!("  {:<14} {}", "Marker:".bold(), config.poller.marker().dimmed());

    // Adapters
    println!();
    println!("  {}", "Adapters:".bold());
    let gmail_status = match GmailCredentials::from_config(&config.gmail) {
        Ok(creds) => format!("{} (client {})", "✓".green(), creds.client_id.dimmed()),
        Err(e) => format!("{} {}", "· not configured".dimmed(), e.to_string().dimmed()),
    };
    println!("    {:<12} {}", "Gmail", gmail_status);

    let discord_status = if config.discord.webhook_url.is_empty() {
        format!("{}", "· not configured".dimmed())
    } else {
        format!("{} (webhook set)", "✓".green())
    };
    println!("    {:<12} {}", "Discord", discord_status);

    println!();
    match config.validate() {
        Ok(()) => println!("  {} ready to run", helpers::mark(true)),
        Err(e) => println!("  {} {}", helpers::mark(false), e),
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_with_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        run(Some(&dir.path().join("config.json"))).unwrap();
    }

    #[test]
    fn status_with_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("read_ids.txt");
        std::fs::write(&ledger, "a\nb\n").unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(
            &config,
            format!(r#"{{ "poller": {{ "ledgerPath": "{}" }} }}"#, ledger.display()),
        )
        .unwrap();
        run(Some(&config)).unwrap();
    }
}
