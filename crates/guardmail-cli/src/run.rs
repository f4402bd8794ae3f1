//! `guardmail run` / `guardmail sync` — build the adapters and drive the
//! poller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use guardmail_core::config::Config;
use guardmail_core::ledger::LedgerStore;
use guardmail_poller::{first_run_sync, CycleOutcome, CycleReport, PollService, PollSettings};
use guardmail_providers::{DiscordWebhook, GmailSource, MessageSource, Notifier};

use crate::helpers;

/// Flags accepted by `guardmail run`.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub interval: Option<String>,
    pub once: bool,
    pub first_run: bool,
}

/// Load config and apply command-line overrides.
fn resolve_config(options: &RunOptions) -> Config {
    let mut config = helpers::load(options.config_path.as_deref());
    if let Some(raw) = options.interval.as_deref() {
        config.poller.set_interval_lenient(raw);
    }
    if options.first_run {
        config.poller.first_run = true;
    }
    config
}

fn build_source(config: &Config) -> Result<Arc<dyn MessageSource>> {
    let source = GmailSource::from_config(&config.gmail, &config.network)
        .context("failed to set up Gmail access")?;
    Ok(Arc::new(source))
}

fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    let notifier = DiscordWebhook::from_config(&config.discord, &config.network)
        .context("failed to set up Discord webhook")?;
    Ok(Arc::new(notifier))
}

/// Run the poll loop until Ctrl+C (or one cycle with `--once`).
pub async fn run(options: RunOptions) -> Result<()> {
    let config = resolve_config(&options);
    if config.poller.first_run {
        return sync_with(&config).await;
    }

    config.validate().context("invalid configuration")?;

    let store = LedgerStore::new(helpers::ledger_path(&config));
    let service = Arc::new(PollService::new(
        build_source(&config)?,
        build_notifier(&config)?,
        store,
        PollSettings::from_config(&config),
    ));

    if options.once {
        let report = service.run_cycle().await;
        print_report(&report);
        return match report.outcome {
            CycleOutcome::FetchFailed
            | CycleOutcome::LedgerUnreadable
            | CycleOutcome::CommitFailed => {
                anyhow::bail!("cycle ended with {:?}", report.outcome)
            }
            _ => Ok(()),
        };
    }

    helpers::print_banner(&format!(
        "polling every {}s, Ctrl+C to stop",
        config.poller.interval_seconds
    ));

    let runner = service.clone();
    let handle = tokio::spawn(async move { runner.start().await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    println!();
    println!("  Shutting down...");
    info!("received Ctrl+C, shutting down");
    service.stop();

    handle.await.context("poll task panicked")?
}

/// `guardmail sync`.
pub async fn sync(config_path: Option<&Path>) -> Result<()> {
    let config = helpers::load(config_path);
    sync_with(&config).await
}

async fn sync_with(config: &Config) -> Result<()> {
    config
        .validate_source()
        .context("invalid configuration")?;

    let source = build_source(config)?;
    let store = LedgerStore::new(helpers::ledger_path(config));
    let report = first_run_sync(
        source.as_ref(),
        &store,
        &config.gmail.query,
        config.poller.recover_unreadable_ledger,
    )
    .await?;

    println!(
        "  {} synced {} messages ({} new), ledger now holds {} at {}",
        helpers::mark(true),
        report.listed,
        report.added,
        report.total,
        store.path().display()
    );
    Ok(())
}

/// One-line summary of a cycle, for `--once`.
fn print_report(report: &CycleReport) {
    let ok = !matches!(
        report.outcome,
        CycleOutcome::FetchFailed | CycleOutcome::LedgerUnreadable | CycleOutcome::CommitFailed
    );
    println!(
        "  {} {:?}: listed {}, new {}, delivered {}, handled {}, retry {}",
        helpers::mark(ok),
        report.outcome,
        report.listed,
        report.unseen,
        report.delivered.to_string().green(),
        report.handled,
        report.retry_pending()
    );
}
