//! Adapter traits — the seams between the poll loop and the outside world.
//!
//! The poll loop only ever sees `Arc<dyn MessageSource>` and
//! `Arc<dyn Notifier>`, so tests swap in in-memory fakes.

use async_trait::async_trait;
use guardmail_core::error::{NotifyError, SourceError};
use guardmail_core::types::RawItem;

/// A mailbox that can be listed and read.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Every message ID matching `filter`, in provider order.
    ///
    /// Pagination is handled internally; callers see one flat list.
    /// `filter` is passed through to the provider unchanged.
    async fn list_identifiers(&self, filter: &str) -> Result<Vec<String>, SourceError>;

    /// Fetch one message. The body stays in the provider's transport encoding.
    async fn get_item(&self, id: &str) -> Result<RawItem, SourceError>;

    /// Display name for logging.
    fn name(&self) -> &str;
}

/// Somewhere to send a human-readable notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`. No retry; the caller decides what a failure means.
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;

    /// Display name for logging.
    fn name(&self) -> &str;
}
