//! Error taxonomy.
//!
//! None of these are fatal to the poll loop; the loop logs and moves on.
//! `ConfigError` is the only one meant to stop the process, and that decision
//! belongs to the CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a transport-encoded body into text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("message body is missing or empty")]
    Missing,
    #[error("message body is malformed: {0}")]
    Malformed(String),
}

/// A message carried the marker phrase but could not be parsed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionAnomaly {
    #[error("no account line (\"DEAR ...\") found")]
    NoAccountLine,
    #[error("no login code found by any rule")]
    NoCodeFound,
}

/// Dedup ledger persistence failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger {path} is unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write ledger {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Mailbox listing or retrieval failure.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("credentials unavailable: {0}")]
    Credentials(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("api returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Notification delivery failure.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(String),
    #[error("endpoint rejected notification with status {status}")]
    Rejected { status: u16 },
}

/// Invalid or incomplete configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required setting `{0}` is missing")]
    Missing(&'static str),
    #[error("invalid poll interval {0:?}: expected a positive number of seconds")]
    InvalidInterval(String),
    #[error("marker phrase must not be empty")]
    EmptyMarker,
}
