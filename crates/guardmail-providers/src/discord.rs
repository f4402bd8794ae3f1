//! Discord incoming-webhook notifier.
//!
//! POSTs `{"content": "<text>"}` to the webhook URL. Discord answers
//! `204 No Content` on success (or `200` with `?wait=true`).

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use guardmail_core::config::{DiscordConfig, NetworkConfig};
use guardmail_core::error::NotifyError;

use crate::traits::Notifier;

/// [`Notifier`] that posts to a Discord webhook.
pub struct DiscordWebhook {
    client: reqwest::Client,
    webhook_url: String,
}

impl std::fmt::Debug for DiscordWebhook {
    // The URL embeds the webhook token, so only the host is shown.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let host = reqwest::Url::parse(&self.webhook_url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default();
        f.debug_struct("DiscordWebhook").field("host", &host).finish()
    }
}

impl DiscordWebhook {
    pub fn from_config(config: &DiscordConfig, network: &NetworkConfig) -> Result<Self, NotifyError> {
        Self::new(&config.webhook_url, network.timeout())
    }

    pub fn new(webhook_url: &str, timeout: Option<Duration>) -> Result<Self, NotifyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| NotifyError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Discord webhook request failed");
                NotifyError::Http(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Discord rejected notification");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(status = %status, "Discord notification delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "discord"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOOK_PATH: &str = "/api/webhooks/123/secret-token";

    fn webhook_for(server: &MockServer) -> DiscordWebhook {
        DiscordWebhook::new(
            &format!("{}{}", server.uri(), HOOK_PATH),
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_notify_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .and(body_json(serde_json::json!({
                "content": "New SteamGuard code. Account: **PLAYER1**, code **AB12C**"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let hook = webhook_for(&server);
        hook.notify("New SteamGuard code. Account: **PLAYER1**, code **AB12C**")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_notify_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(HOOK_PATH))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({ "message": "You are being rate limited." })),
            )
            .mount(&server)
            .await;

        let hook = webhook_for(&server);
        assert!(matches!(
            hook.notify("hi").await,
            Err(NotifyError::Rejected { status: 429 })
        ));
    }

    #[tokio::test]
    async fn test_notify_unreachable() {
        // Port 9 (discard) on localhost is not listening
        let hook = DiscordWebhook::new("http://127.0.0.1:9/hook", Some(Duration::from_secs(2)))
            .unwrap();
        assert!(matches!(hook.notify("hi").await, Err(NotifyError::Http(_))));
    }

    #[test]
    fn test_debug_hides_token() {
        let hook = DiscordWebhook::new("https://discord.com/api/webhooks/1/secret-token", None)
            .unwrap();
        let debug = format!("{hook:?}");
        assert!(debug.contains("discord.com"));
        assert!(!debug.contains("secret-token"));
    }
}
