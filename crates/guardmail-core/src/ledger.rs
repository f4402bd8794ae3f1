//! Dedup ledger — the durable set of message IDs already handled.
//!
//! File format: UTF-8 text, one ID per line, in insertion order.
//!
//! The ledger is read in full at the start of a cycle and rewritten in full
//! at the end. Writes go to a temp file in the same directory which is then
//! renamed over the target, so a crash mid-write leaves the previous file
//! untouched.

use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::LedgerError;

// ─────────────────────────────────────────────
// Ledger (in-memory value)
// ─────────────────────────────────────────────

/// In-memory snapshot of the handled-ID set.
///
/// Insertion order is kept for the on-disk representation only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    order: Vec<String>,
    known: HashSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from IDs; duplicates and blank entries are dropped.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ledger = Self::new();
        for id in ids {
            ledger.insert(id);
        }
        ledger
    }

    /// Add an ID. Returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() || self.known.contains(id) {
            return false;
        }
        self.known.insert(id.to_string());
        self.order.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// IDs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// IDs from `all` not yet in the ledger, in `all`'s order.
    ///
    /// IDs are compared trimmed, the same way [`Ledger::insert`] stores them.
    /// Blank IDs are never reported and an ID repeated within `all` is
    /// reported once.
    pub fn diff(&self, all: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        all.iter()
            .filter(|id| {
                let key = id.trim();
                !key.is_empty() && !self.known.contains(key) && seen.insert(key)
            })
            .cloned()
            .collect()
    }

    /// `self ∪ newly_handled`, leaving `self` untouched.
    pub fn union(&self, newly_handled: &[String]) -> Ledger {
        let mut merged = self.clone();
        for id in newly_handled {
            merged.insert(id.as_str());
        }
        merged
    }

    fn to_file_contents(&self) -> String {
        let mut out = String::new();
        for id in &self.order {
            out.push_str(id);
            out.push('\n');
        }
        out
    }
}

// ─────────────────────────────────────────────
// LedgerStore (persistence)
// ─────────────────────────────────────────────

/// Owns the ledger file location and its load/commit semantics.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted set.
    ///
    /// A missing file is an empty ledger. Any other read failure, including
    /// invalid UTF-8, is [`LedgerError::Unreadable`].
    pub fn load(&self) -> Result<Ledger, LedgerError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no ledger file, starting empty");
                return Ok(Ledger::new());
            }
            Err(source) => {
                return Err(LedgerError::Unreadable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let ledger = Ledger::from_ids(content.lines());
        debug!(path = %self.path.display(), entries = ledger.len(), "loaded ledger");
        Ok(ledger)
    }

    /// Persist `known ∪ newly_handled` as a full rewrite and return the
    /// merged ledger.
    ///
    /// On error the file on disk is whatever it was before the call.
    pub fn commit(&self, known: &Ledger, newly_handled: &[String]) -> Result<Ledger, LedgerError> {
        let merged = known.union(newly_handled);
        self.write_atomic(&merged.to_file_contents())
            .map_err(|source| LedgerError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            path = %self.path.display(),
            entries = merged.len(),
            added = merged.len() - known.len(),
            "committed ledger"
        );
        Ok(merged)
    }

    fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
