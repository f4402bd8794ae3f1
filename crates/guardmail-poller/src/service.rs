//! Poll service — the fetch → diff → process → commit loop.
//!
//! Each cycle:
//! 1. list candidate IDs from the source
//! 2. load the ledger and diff
//! 3. for each unseen ID: fetch, decode, extract, notify
//! 4. commit every ID that was handled
//!
//! An ID is handled when it turned out not to be a login notification, could
//! not be decoded, could not be parsed, or was delivered. Fetch and delivery
//! failures stay out of the ledger so the next cycle retries them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use guardmail_core::config::Config;
use guardmail_core::error::{ExtractionAnomaly, LedgerError};
use guardmail_core::extract::{classify, Extraction};
use guardmail_core::ledger::{Ledger, LedgerStore};
use guardmail_core::{decode, ExtractionResult};
use guardmail_providers::{MessageSource, Notifier};

use crate::types::{CycleOutcome, CycleReport};

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Everything the loop needs from the config, resolved once.
#[derive(Clone, Debug)]
pub struct PollSettings {
    /// Source filter (Gmail search query).
    pub query: String,
    /// Uppercased marker phrase.
    pub marker: String,
    pub message_template: String,
    pub interval: Duration,
    pub skip_initial_delay: bool,
    pub anomaly_alert_threshold: u32,
    pub recover_unreadable_ledger: bool,
}

impl PollSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query: config.gmail.query.clone(),
            marker: config.poller.marker(),
            message_template: config.discord.message_template.clone(),
            interval: Duration::from_secs(config.poller.interval_seconds),
            skip_initial_delay: config.poller.skip_initial_delay,
            anomaly_alert_threshold: config.poller.anomaly_alert_threshold,
            recover_unreadable_ledger: config.poller.recover_unreadable_ledger,
        }
    }
}

/// Load the ledger, optionally treating an unreadable file as empty.
pub(crate) fn load_ledger(store: &LedgerStore, recover: bool) -> Result<Ledger, LedgerError> {
    match store.load() {
        Ok(ledger) => Ok(ledger),
        Err(e) if recover => {
            warn!(error = %e, "ledger unreadable, continuing with an empty one");
            Ok(Ledger::new())
        }
        Err(e) => Err(e),
    }
}

// ─────────────────────────────────────────────
// Per-item outcome
// ─────────────────────────────────────────────

enum ItemOutcome {
    Delivered,
    NotTarget,
    DecodeFailed,
    Anomaly,
    FetchFailed,
    DeliveryFailed,
}

impl ItemOutcome {
    fn is_handled(&self) -> bool {
        !matches!(self, ItemOutcome::FetchFailed | ItemOutcome::DeliveryFailed)
    }
}

// ─────────────────────────────────────────────
// PollService
// ─────────────────────────────────────────────

/// Periodic mailbox poller.
pub struct PollService {
    source: Arc<dyn MessageSource>,
    notifier: Arc<dyn Notifier>,
    store: LedgerStore,
    settings: PollSettings,
    /// Consecutive anomalies, across cycles.
    anomaly_streak: AtomicU32,
    shutdown: Arc<Notify>,
}

impl PollService {
    pub fn new(
        source: Arc<dyn MessageSource>,
        notifier: Arc<dyn Notifier>,
        store: LedgerStore,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            settings,
            anomaly_streak: AtomicU32::new(0),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run cycles until `stop()` is called.
    ///
    /// Waits one interval before the first cycle unless
    /// `skip_initial_delay` is set. The interval is measured from the end of
    /// one cycle to the start of the next.
    pub async fn start(&self) -> anyhow::Result<()> {
        info!(
            interval_s = self.settings.interval.as_secs(),
            source = self.source.name(),
            notifier = self.notifier.name(),
            ledger = %self.store.path().display(),
            "poll service started"
        );

        if !self.settings.skip_initial_delay && self.wait_or_shutdown().await {
            return Ok(());
        }

        loop {
            self.run_cycle().await;
            if self.wait_or_shutdown().await {
                return Ok(());
            }
        }
    }

    /// Stop the loop at the next wait point. Safe to call before `start()`.
    pub fn stop(&self) {
        info!("stopping poll service");
        self.shutdown.notify_one();
    }

    /// Sleep one interval. Returns `true` if shutdown was requested.
    async fn wait_or_shutdown(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.settings.interval) => false,
            _ = self.shutdown.notified() => {
                info!("poll service shutting down");
                true
            }
        }
    }

    /// Execute one full cycle. Never fails; everything is in the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::start();

        let ids = match self.source.list_identifiers(&self.settings.query).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to list messages");
                return report.finish(CycleOutcome::FetchFailed);
            }
        };
        report.listed = ids.len();
        if ids.is_empty() {
            debug!("no messages listed");
            return report.finish(CycleOutcome::NothingListed);
        }

        let known = match load_ledger(&self.store, self.settings.recover_unreadable_ledger) {
            Ok(ledger) => ledger,
            Err(e) => {
                error!(error = %e, "skipping cycle");
                return report.finish(CycleOutcome::LedgerUnreadable);
            }
        };

        let unseen = known.diff(&ids);
        report.unseen = unseen.len();
        if unseen.is_empty() {
            debug!(listed = ids.len(), "no new messages");
            return report.finish(CycleOutcome::NothingNew);
        }
        info!(listed = ids.len(), unseen = unseen.len(), "processing new messages");

        let mut handled = Vec::with_capacity(unseen.len());
        for id in unseen {
            let outcome = self.process_item(&id).await;
            match outcome {
                ItemOutcome::Delivered => report.delivered += 1,
                ItemOutcome::NotTarget => report.not_target += 1,
                ItemOutcome::DecodeFailed => report.decode_failures += 1,
                ItemOutcome::Anomaly => report.anomalies += 1,
                ItemOutcome::FetchFailed => report.fetch_failures += 1,
                ItemOutcome::DeliveryFailed => report.delivery_failures += 1,
            }
            if outcome.is_handled() {
                handled.push(id);
            }
        }

        if handled.is_empty() {
            info!(retry = report.retry_pending(), "cycle finished, nothing to commit");
            return report.finish(CycleOutcome::Completed);
        }

        match self.store.commit(&known, &handled) {
            Ok(_) => {
                report.handled = handled.len();
                info!(
                    handled = report.handled,
                    delivered = report.delivered,
                    retry = report.retry_pending(),
                    "cycle finished"
                );
                report.finish(CycleOutcome::Completed)
            }
            Err(e) => {
                error!(error = %e, "ledger commit failed, items will be revisited");
                report.finish(CycleOutcome::CommitFailed)
            }
        }
    }

    async fn process_item(&self, id: &str) -> ItemOutcome {
        let item = match self.source.get_item(id).await {
            Ok(item) => item,
            Err(e) => {
                warn!(id = %id, error = %e, "failed to fetch message");
                return ItemOutcome::FetchFailed;
            }
        };

        let text = match decode(item.body.as_deref()) {
            Ok(text) => text,
            Err(e) => {
                warn!(id = %id, error = %e, "undecodable body, marking handled");
                return ItemOutcome::DecodeFailed;
            }
        };

        match classify(&text, &self.settings.marker) {
            Extraction::NotTarget(reason) => {
                debug!(id = %id, reason = ?reason, "not a login notification");
                ItemOutcome::NotTarget
            }
            Extraction::Anomaly(anomaly) => {
                warn!(id = %id, anomaly = %anomaly, "login notification could not be parsed");
                self.record_anomaly(id, anomaly).await;
                ItemOutcome::Anomaly
            }
            Extraction::Found(result) => {
                self.anomaly_streak.store(0, Ordering::Relaxed);
                self.deliver(id, &result).await
            }
        }
    }

    async fn deliver(&self, id: &str, result: &ExtractionResult) -> ItemOutcome {
        let text = result.render(&self.settings.message_template);
        match self.notifier.notify(&text).await {
            Ok(()) => {
                info!(
                    id = %id,
                    account = %result.account_name,
                    rule = %result.rule,
                    "login code delivered"
                );
                ItemOutcome::Delivered
            }
            Err(e) => {
                warn!(id = %id, account = %result.account_name, error = %e, "delivery failed, will retry");
                ItemOutcome::DeliveryFailed
            }
        }
    }

    /// Count an anomaly and alert once the streak reaches the threshold.
    async fn record_anomaly(&self, id: &str, anomaly: ExtractionAnomaly) {
        let threshold = self.settings.anomaly_alert_threshold;
        if threshold == 0 {
            return;
        }

        let streak = self.anomaly_streak.fetch_add(1, Ordering::Relaxed) + 1;
        if streak < threshold {
            return;
        }

        self.anomaly_streak.store(0, Ordering::Relaxed);
        let alert = format!(
            "Guardmail: {streak} login notifications in a row could not be parsed \
             (latest {id}: {anomaly}). The email layout may have changed."
        );
        match self.notifier.notify(&alert).await {
            Ok(()) => warn!(streak, "anomaly alert sent"),
            Err(e) => error!(error = %e, "failed to send anomaly alert"),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
