//! Cycle bookkeeping types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How a cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Every unseen item was visited and the ledger is up to date.
    Completed,
    /// The source returned no IDs at all.
    NothingListed,
    /// Every listed ID is already in the ledger.
    NothingNew,
    /// Listing the source failed.
    FetchFailed,
    /// The ledger could not be read; nothing was processed.
    LedgerUnreadable,
    /// Items were processed but the ledger could not be written.
    CommitFailed,
}

/// Per-cycle counters.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// IDs returned by the source.
    pub listed: usize,
    /// IDs not yet in the ledger.
    pub unseen: usize,
    /// IDs added to the ledger this cycle.
    pub handled: usize,
    pub delivered: usize,
    /// Bodies without the marker or with too few lines.
    pub not_target: usize,
    pub decode_failures: usize,
    pub anomalies: usize,
    pub delivery_failures: usize,
    pub fetch_failures: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            listed: 0,
            unseen: 0,
            handled: 0,
            delivered: 0,
            not_target: 0,
            decode_failures: 0,
            anomalies: 0,
            delivery_failures: 0,
            fetch_failures: 0,
            outcome: CycleOutcome::Completed,
        }
    }

    pub(crate) fn finish(mut self, outcome: CycleOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Items left for the next cycle.
    pub fn retry_pending(&self) -> usize {
        self.delivery_failures + self.fetch_failures
    }
}

/// Result of a first-run sync.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub listed: usize,
    /// IDs that were not in the ledger before.
    pub added: usize,
    /// Ledger size after the sync.
    pub total: usize,
}
