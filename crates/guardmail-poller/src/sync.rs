//! First-run sync — mark everything currently in the mailbox as handled.
//!
//! Used once when installing on a mailbox that already holds old login
//! notifications, so the first real cycle does not replay them.

use anyhow::{bail, Context};
use tracing::info;

use guardmail_core::ledger::LedgerStore;
use guardmail_providers::MessageSource;

use crate::service::load_ledger;
use crate::types::SyncReport;

/// List every ID matching `query` and commit them all, without processing.
///
/// The result is the union with whatever the ledger already holds. A failed
/// or empty listing is an error: there is nothing to sync against.
pub async fn first_run_sync(
    source: &dyn MessageSource,
    store: &LedgerStore,
    query: &str,
    recover_unreadable_ledger: bool,
) -> anyhow::Result<SyncReport> {
    let ids = source
        .list_identifiers(query)
        .await
        .with_context(|| format!("failed to list messages from {}", source.name()))?;
    if ids.is_empty() {
        bail!("no messages matched {query:?}; nothing to sync");
    }

    let known = load_ledger(store, recover_unreadable_ledger)?;
    let merged = store.commit(&known, &ids)?;

    let report = SyncReport {
        listed: ids.len(),
        added: merged.len() - known.len(),
        total: merged.len(),
    };
    info!(
        listed = report.listed,
        added = report.added,
        total = report.total,
        ledger = %store.path().display(),
        "first-run sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{not_target_body, FakeSource};
    use guardmail_core::types::RawItem;
    use tempfile::tempdir;

    fn source(ids: &[&str]) -> FakeSource {
        FakeSource::with_items(ids.iter().map(|id| RawItem::new(*id, not_target_body())).collect())
    }

    #[tokio::test]
    async fn test_sync_records_every_id() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("read_ids.txt"));
        let source = source(&["a", "b", "c"]);

        let report = first_run_sync(&source, &store, "+Steam", false).await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                listed: 3,
                added: 3,
                total: 3
            }
        );
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "a\nb\nc\n");
        // Nothing is fetched or processed
        assert!(source.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_sync_keeps_existing_entries() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("read_ids.txt"));
        std::fs::write(store.path(), "old\nb\n").unwrap();

        let report = first_run_sync(&source(&["a", "b"]), &store, "+Steam", false)
            .await
            .unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.total, 3);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "old\nb\na\n");
    }

    #[tokio::test]
    async fn test_sync_empty_listing_is_error() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("read_ids.txt"));
        assert!(first_run_sync(&source(&[]), &store, "+Steam", false).await.is_err());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_sync_listing_failure_is_error() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("read_ids.txt"));
        let source = source(&["a"]);
        source.fail_listing(true);
        let err = first_run_sync(&source, &store, "+Steam", false).await.unwrap_err();
        assert!(err.to_string().contains("failed to list messages"));
    }
}
