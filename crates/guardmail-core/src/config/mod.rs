//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use guardmail_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Polling every {}s", cfg.poller.interval_seconds);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_config_path, load_config, save_config};
pub use schema::{
    parse_interval, Config, DiscordConfig, GmailConfig, NetworkConfig, PollerConfig,
    DEFAULT_INTERVAL_SECONDS,
};
