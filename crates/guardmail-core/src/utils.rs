//! Utility helpers — path resolution.

use std::path::PathBuf;

/// Get the Guardmail data directory (e.g. `~/.guardmail/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".guardmail")
}

/// Default ledger location (e.g. `~/.guardmail/read_ids.txt`).
pub fn get_default_ledger_path() -> PathBuf {
    get_data_path().join("read_ids.txt")
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
