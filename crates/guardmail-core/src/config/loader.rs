//! Config loader — reads `~/.guardmail/config.json`, merges env vars, and
//! applies legacy migrations.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.guardmail/config.json`
//! 3. Environment variables `GUARDMAIL_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given path (or the default one) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    migrate_config(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply legacy config migrations.
///
/// Moves `poller.loopSeconds` → `poller.intervalSeconds`.
fn migrate_config(raw: &mut serde_json::Value) {
    if let Some(poller) = raw.get_mut("poller").and_then(|p| p.as_object_mut()) {
        if let Some(legacy) = poller.remove("loopSeconds") {
            if !poller.contains_key("intervalSeconds") {
                poller.insert("intervalSeconds".to_string(), legacy);
                debug!("Migrated poller.loopSeconds → poller.intervalSeconds");
            }
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `GUARDMAIL_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `GUARDMAIL_GMAIL__CLIENT_SECRET_FILE`, `__CLIENT_ID`, `__CLIENT_SECRET`,
///   `__REFRESH_TOKEN`, `__QUERY`
/// - `GUARDMAIL_DISCORD__WEBHOOK_URL`
/// - `GUARDMAIL_POLLER__INTERVAL_SECONDS` (invalid values warn and use 30)
/// - `GUARDMAIL_POLLER__MARKER_PHRASE`
/// - `GUARDMAIL_POLLER__LEDGER_PATH`
/// - `GUARDMAIL_NETWORK__REQUEST_TIMEOUT_SECONDS`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(mut config: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    // Gmail
    if let Some(val) = var("GUARDMAIL_GMAIL__CLIENT_SECRET_FILE") {
        config.gmail.client_secret_file = val;
    }
    if let Some(val) = var("GUARDMAIL_GMAIL__CLIENT_ID") {
        config.gmail.client_id = val;
    }
    if let Some(val) = var("GUARDMAIL_GMAIL__CLIENT_SECRET") {
        config.gmail.client_secret = val;
    }
    if let Some(val) = var("GUARDMAIL_GMAIL__REFRESH_TOKEN") {
        config.gmail.refresh_token = val;
    }
    if let Some(val) = var("GUARDMAIL_GMAIL__QUERY") {
        config.gmail.query = val;
    }

    // Discord
    if let Some(val) = var("GUARDMAIL_DISCORD__WEBHOOK_URL") {
        config.discord.webhook_url = val;
    }

    // Poller
    if let Some(val) = var("GUARDMAIL_POLLER__INTERVAL_SECONDS") {
        config.poller.set_interval_lenient(&val);
    }
    if let Some(val) = var("GUARDMAIL_POLLER__MARKER_PHRASE") {
        config.poller.marker_phrase = val;
    }
    if let Some(val) = var("GUARDMAIL_POLLER__LEDGER_PATH") {
        config.poller.ledger_path = val;
    }

    // Network
    if let Some(val) = var("GUARDMAIL_NETWORK__REQUEST_TIMEOUT_SECONDS") {
        match val.parse::<u64>() {
            Ok(n) => config.network.request_timeout_seconds = n,
            Err(_) => warn!("Ignoring invalid GUARDMAIL_NETWORK__REQUEST_TIMEOUT_SECONDS={val}"),
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
