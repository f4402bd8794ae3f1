//! External adapters for Guardmail.
//!
//! # Architecture
//!
//! - [`traits::MessageSource`] — list message IDs and fetch one message
//! - [`traits::Notifier`] — deliver one text notification
//! - [`gmail::GmailSource`] — Gmail REST API with OAuth refresh-token auth
//! - [`discord::DiscordWebhook`] — Discord incoming webhook

pub mod discord;
pub mod gmail;
pub mod traits;

pub use discord::DiscordWebhook;
pub use gmail::{GmailCredentials, GmailSource};
pub use traits::{MessageSource, Notifier};
