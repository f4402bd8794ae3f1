//! Guardmail core — everything the poll loop needs that does not touch the
//! network.
//!
//! - [`decode`] — transport body → [`types::CanonicalText`]
//! - [`extract`] — canonical text → account name + login code
//! - [`ledger`] — durable set of already-handled message IDs
//! - [`config`] — JSON configuration with env overrides

pub mod config;
pub mod decode;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod types;
pub mod utils;

pub use decode::decode;
pub use error::{ConfigError, DecodeError, ExtractionAnomaly, LedgerError, NotifyError, SourceError};
pub use extract::{classify, extract, Extraction, SkipReason};
pub use ledger::{Ledger, LedgerStore};
pub use types::{CanonicalText, CodeRule, ExtractionResult, RawItem};
