//! Configuration schema.
//!
//! Hierarchy: `Config` → `GmailConfig`, `DiscordConfig`, `PollerConfig`,
//! `NetworkConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Poll interval used when none (or an invalid one) is configured.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;

/// Phrase that identifies a login notification body.
pub const DEFAULT_MARKER_PHRASE: &str = "It looks like you are trying to log in from a new device";

/// Gmail search query for candidate messages.
pub const DEFAULT_QUERY: &str = "+Steam";

pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "New SteamGuard code. Account: **{account}**, code **{code}**";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.guardmail/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub gmail: GmailConfig,
    pub discord: DiscordConfig,
    pub poller: PollerConfig,
    pub network: NetworkConfig,
}

impl Config {
    /// Check what the mailbox side needs (used by both `run` and `sync`).
    pub fn validate_source(&self) -> Result<(), ConfigError> {
        let gmail = &self.gmail;
        let has_inline_client = !gmail.client_id.is_empty() && !gmail.client_secret.is_empty();
        if !has_inline_client && gmail.client_secret_file.is_empty() {
            return Err(ConfigError::Missing("gmail.clientSecretFile"));
        }
        if gmail.refresh_token.is_empty() {
            return Err(ConfigError::Missing("gmail.refreshToken"));
        }
        Ok(())
    }

    /// Full validation for the polling mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_source()?;
        if self.discord.webhook_url.is_empty() {
            return Err(ConfigError::Missing("discord.webhookUrl"));
        }
        if self.poller.marker_phrase.trim().is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Gmail
// ─────────────────────────────────────────────

/// Gmail API access.
///
/// Client id/secret can be given inline or through the client secret JSON
/// downloaded from the Google console (`installed` or `web` section).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GmailConfig {
    /// Path to the Google OAuth client secret JSON.
    pub client_secret_file: String,
    pub client_id: String,
    pub client_secret: String,
    /// Long-lived OAuth refresh token with a Gmail read scope.
    pub refresh_token: String,
    /// Gmail search query, passed through as-is.
    pub query: String,
    /// Include spam and trash, in case a notification lands there.
    pub include_spam_trash: bool,
    pub api_base: String,
    pub token_uri: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_secret_file: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            query: DEFAULT_QUERY.to_string(),
            include_spam_trash: true,
            api_base: "https://gmail.googleapis.com".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Discord
// ─────────────────────────────────────────────

/// Discord webhook notifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscordConfig {
    pub webhook_url: String,
    /// `{account}` and `{code}` are substituted.
    pub message_template: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Poller
// ─────────────────────────────────────────────

/// Poll loop behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollerConfig {
    pub marker_phrase: String,
    /// Seconds between the end of one cycle and the start of the next.
    #[serde(deserialize_with = "lenient_interval")]
    pub interval_seconds: u64,
    /// Ledger file (one message ID per line). `~` is expanded.
    pub ledger_path: String,
    /// Record every current message ID as handled, then exit.
    pub first_run: bool,
    /// Run the first cycle immediately instead of after one interval.
    pub skip_initial_delay: bool,
    /// Alert through the notifier after this many consecutive unparseable
    /// notifications. 0 disables.
    pub anomaly_alert_threshold: u32,
    /// Treat an unreadable ledger as empty. When off, the cycle is skipped
    /// and retried next interval instead.
    pub recover_unreadable_ledger: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            marker_phrase: DEFAULT_MARKER_PHRASE.to_string(),
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            ledger_path: "~/.guardmail/read_ids.txt".to_string(),
            first_run: false,
            skip_initial_delay: false,
            anomaly_alert_threshold: 0,
            recover_unreadable_ledger: true,
        }
    }
}

impl PollerConfig {
    /// Marker phrase in the case the extractor compares against.
    pub fn marker(&self) -> String {
        self.marker_phrase.trim().to_uppercase()
    }

    /// Apply a raw interval value, warning and keeping the default on error.
    pub fn set_interval_lenient(&mut self, raw: &str) {
        match parse_interval(raw) {
            Ok(secs) => self.interval_seconds = secs,
            Err(e) => {
                warn!(
                    error = %e,
                    default = DEFAULT_INTERVAL_SECONDS,
                    "ignoring invalid poll interval, using default"
                );
                self.interval_seconds = DEFAULT_INTERVAL_SECONDS;
            }
        }
    }
}

/// Parse a positive whole number of seconds.
pub fn parse_interval(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidInterval(raw.to_string())),
    }
}

/// Accept a number or numeric string; anything else falls back to the
/// default with a warning instead of failing the whole config.
fn lenient_interval<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let raw = match &value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut poller = PollerConfig::default();
    poller.set_interval_lenient(&raw);
    Ok(poller.interval_seconds)
}

// ─────────────────────────────────────────────
// Network
// ─────────────────────────────────────────────

/// Settings shared by every outbound HTTP call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// Per-request timeout; 0 means no timeout.
    pub request_timeout_seconds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 60,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        (self.request_timeout_seconds > 0)
            .then(|| std::time::Duration::from_secs(self.request_timeout_seconds))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
