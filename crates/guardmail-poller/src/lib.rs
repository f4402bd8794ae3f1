//! Guardmail poll loop.
//!
//! - [`service::PollService`] — periodic fetch → diff → process → commit
//! - [`sync::first_run_sync`] — seed the ledger with the current mailbox
//! - [`types`] — per-cycle reports

pub mod service;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use service::{PollService, PollSettings};
pub use sync::first_run_sync;
pub use types::{CycleOutcome, CycleReport, SyncReport};
