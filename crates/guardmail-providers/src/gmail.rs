//! Gmail REST message source.
//!
//! Authenticates with a long-lived OAuth refresh token and talks to the
//! Gmail v1 API directly over `reqwest`:
//!
//! - `GET /gmail/v1/users/me/messages` (paginated) for IDs
//! - `GET /gmail/v1/users/me/messages/{id}?format=full` for bodies
//!
//! The access token is cached and refreshed shortly before it expires, or
//! immediately after the API answers 401.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use guardmail_core::config::{GmailConfig, NetworkConfig};
use guardmail_core::error::SourceError;
use guardmail_core::types::RawItem;
use guardmail_core::utils::expand_home;

use crate::traits::MessageSource;

/// Refresh this long before the provider-reported expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────

/// OAuth client plus refresh token.
#[derive(Clone, PartialEq, Eq)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Google console download: `{"installed": {...}}` or `{"web": {...}}`.
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretSection>,
    web: Option<ClientSecretSection>,
}

#[derive(Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Resolve credentials from config.
    ///
    /// Inline `clientId`/`clientSecret` win over `clientSecretFile`.
    pub fn from_config(config: &GmailConfig) -> Result<Self, SourceError> {
        if config.refresh_token.is_empty() {
            return Err(SourceError::Credentials("gmail.refreshToken is not set".into()));
        }

        let (client_id, client_secret) =
            if !config.client_id.is_empty() && !config.client_secret.is_empty() {
                (config.client_id.clone(), config.client_secret.clone())
            } else if !config.client_secret_file.is_empty() {
                read_client_secret_file(&expand_home(&config.client_secret_file))?
            } else {
                return Err(SourceError::Credentials(
                    "neither gmail.clientId/clientSecret nor gmail.clientSecretFile is set".into(),
                ));
            };

        Ok(Self {
            client_id,
            client_secret,
            refresh_token: config.refresh_token.clone(),
        })
    }
}

fn read_client_secret_file(path: &Path) -> Result<(String, String), SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SourceError::Credentials(format!("cannot read {}: {e}", path.display()))
    })?;
    let file: ClientSecretFile = serde_json::from_str(&content).map_err(|e| {
        SourceError::Credentials(format!("cannot parse {}: {e}", path.display()))
    })?;
    let section = file.installed.or(file.web).ok_or_else(|| {
        SourceError::Credentials(format!(
            "{} has neither an \"installed\" nor a \"web\" section",
            path.display()
        ))
    })?;
    Ok((section.client_id, section.client_secret))
}

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct GmailMessage {
    payload: Option<MessagePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Deserialize)]
struct PartBody {
    data: Option<String>,
}

/// First `text/plain` body found depth-first, starting with `part` itself.
fn find_plain_text(part: &MessagePart) -> Option<&str> {
    if part.mime_type.eq_ignore_ascii_case("text/plain") {
        let data = part.body.as_ref().and_then(|b| b.data.as_deref());
        if let Some(data) = data.filter(|d| !d.is_empty()) {
            return Some(data);
        }
    }
    part.parts.iter().find_map(find_plain_text)
}

// ─────────────────────────────────────────────
// GmailSource
// ─────────────────────────────────────────────

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// [`MessageSource`] backed by the Gmail REST API.
pub struct GmailSource {
    client: reqwest::Client,
    api_base: String,
    token_uri: String,
    include_spam_trash: bool,
    credentials: GmailCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for GmailSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailSource")
            .field("api_base", &self.api_base)
            .field("token_uri", &self.token_uri)
            .field("include_spam_trash", &self.include_spam_trash)
            .finish()
    }
}

impl GmailSource {
    /// Build a source from config, reading the client secret file if needed.
    pub fn from_config(config: &GmailConfig, network: &NetworkConfig) -> Result<Self, SourceError> {
        let credentials = GmailCredentials::from_config(config)?;
        Self::new(config, credentials, network.timeout())
    }

    pub fn new(
        config: &GmailConfig,
        credentials: GmailCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, SourceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_uri: config.token_uri.clone(),
            include_spam_trash: config.include_spam_trash,
            credentials,
            token: Mutex::new(None),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.api_base)
    }

    /// Current access token, refreshing it if missing or about to expire.
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!(token_uri = %self.token_uri, "Refreshing Gmail access token");
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Auth(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// Authenticated GET returning the parsed JSON body.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                // Force a refresh on the next call
                *self.token.lock().await = None;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Http(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl MessageSource for GmailSource {
    async fn list_identifiers(&self, filter: &str) -> Result<Vec<String>, SourceError> {
        let url = self.messages_url();
        let include_spam_trash = if self.include_spam_trash { "true" } else { "false" };
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut query = vec![("q", filter), ("includeSpamTrash", include_spam_trash)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListResponse = self.get_json(&url, &query).await?;
            pages += 1;
            ids.extend(page.messages.into_iter().map(|m| m.id));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(count = ids.len(), pages, "Listed Gmail messages");
        Ok(ids)
    }

    async fn get_item(&self, id: &str) -> Result<RawItem, SourceError> {
        let url = format!("{}/{}", self.messages_url(), id);
        let message: GmailMessage = self.get_json(&url, &[("format", "full")]).await?;

        let body = message
            .payload
            .as_ref()
            .and_then(find_plain_text)
            .map(str::to_string);
        if body.is_none() {
            warn!(id = %id, "Message has no text/plain part");
        }

        Ok(RawItem {
            id: id.to_string(),
            body,
        })
    }

    fn name(&self) -> &str {
        "gmail"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> GmailCredentials {
        GmailCredentials {
            client_id: "client-1".into(),
            client_secret: "shh".into(),
            refresh_token: "refresh-1".into(),
        }
    }

    fn config_for(server: &MockServer) -> GmailConfig {
        GmailConfig {
            api_base: server.uri(),
            token_uri: format!("{}/token", server.uri()),
            ..GmailConfig::default()
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn source_for(server: &MockServer) -> GmailSource {
        GmailSource::new(&config_for(server), credentials(), Some(Duration::from_secs(5))).unwrap()
    }

    // ── Credentials ──

    #[test]
    fn test_credentials_inline() {
        let config = GmailConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            refresh_token: "tok".into(),
            ..GmailConfig::default()
        };
        let creds = GmailCredentials::from_config(&config).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.refresh_token, "tok");
    }

    #[test]
    fn test_credentials_from_installed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"installed": {{"client_id": "file-id", "client_secret": "file-secret", "token_uri": "https://oauth2.googleapis.com/token"}}}}"#
        )
        .unwrap();

        let config = GmailConfig {
            client_secret_file: file.path().to_string_lossy().into_owned(),
            refresh_token: "tok".into(),
            ..GmailConfig::default()
        };
        let creds = GmailCredentials::from_config(&config).unwrap();
        assert_eq!(creds.client_id, "file-id");
        assert_eq!(creds.client_secret, "file-secret");
    }

    #[test]
    fn test_credentials_from_web_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"web": {{"client_id": "w", "client_secret": "s"}}}}"#).unwrap();
        let config = GmailConfig {
            client_secret_file: file.path().to_string_lossy().into_owned(),
            refresh_token: "tok".into(),
            ..GmailConfig::default()
        };
        assert_eq!(GmailCredentials::from_config(&config).unwrap().client_id, "w");
    }

    #[test]
    fn test_credentials_missing_refresh_token() {
        let config = GmailConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            ..GmailConfig::default()
        };
        assert!(matches!(
            GmailCredentials::from_config(&config),
            Err(SourceError::Credentials(_))
        ));
    }

    #[test]
    fn test_credentials_unreadable_file() {
        let config = GmailConfig {
            client_secret_file: "/nonexistent/client_secret.json".into(),
            refresh_token: "tok".into(),
            ..GmailConfig::default()
        };
        assert!(matches!(
            GmailCredentials::from_config(&config),
            Err(SourceError::Credentials(_))
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("refresh-1"));
    }

    // ── Body selection ──

    fn part(json: serde_json::Value) -> MessagePart {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_plain_payload() {
        let payload = part(serde_json::json!({
            "mimeType": "text/plain",
            "body": { "data": "SGVsbG8" }
        }));
        assert_eq!(find_plain_text(&payload), Some("SGVsbG8"));
    }

    #[test]
    fn test_nested_multipart_prefers_first_plain_part() {
        let payload = part(serde_json::json!({
            "mimeType": "multipart/mixed",
            "body": { "size": 0 },
            "parts": [
                {
                    "mimeType": "multipart/alternative",
                    "parts": [
                        { "mimeType": "text/plain", "body": { "data": "first" } },
                        { "mimeType": "text/html", "body": { "data": "html" } }
                    ]
                },
                { "mimeType": "text/plain", "body": { "data": "second" } }
            ]
        }));
        assert_eq!(find_plain_text(&payload), Some("first"));
    }

    #[test]
    fn test_html_only_has_no_body() {
        let payload = part(serde_json::json!({
            "mimeType": "multipart/alternative",
            "parts": [{ "mimeType": "text/html", "body": { "data": "html" } }]
        }));
        assert_eq!(find_plain_text(&payload), None);
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "m3", "threadId": "t3" }]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("q", "+Steam"))
            .and(query_param("includeSpamTrash", "true"))
            .and(header("Authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "m1", "threadId": "t1" }, { "id": "m2", "threadId": "t2" }],
                "nextPageToken": "page-2",
                "resultSizeEstimate": 3
            })))
            .mount(&server)
            .await;

        let source = source_for(&server);
        let ids = source.list_identifiers("+Steam").await.unwrap();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_list_empty_mailbox() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "resultSizeEstimate": 0 })),
            )
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert!(source.list_identifiers("+Steam").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_token_is_cached_between_calls() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let source = source_for(&server);
        source.list_identifiers("+Steam").await.unwrap();
        source.list_identifiers("+Steam").await.unwrap();
    }

    #[tokio::test]
    async fn test_token_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "invalid_grant" })),
            )
            .mount(&server)
            .await;

        let source = source_for(&server);
        let err = source.list_identifiers("+Steam").await.unwrap_err();
        match err {
            SourceError::Auth(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let source = source_for(&server);
        match source.list_identifiers("+Steam").await.unwrap_err() {
            SourceError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "backend unavailable");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_drops_cached_token() {
        let server = MockServer::start().await;
        mount_token(&server, 2).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert!(source.list_identifiers("+Steam").await.is_err());
        assert!(source.list_identifiers("+Steam").await.is_err());
    }

    #[tokio::test]
    async fn test_get_item_returns_plain_body() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m1"))
            .and(query_param("format", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m1",
                "payload": {
                    "mimeType": "multipart/alternative",
                    "parts": [
                        { "mimeType": "text/plain", "body": { "size": 5, "data": "SGVsbG8" } },
                        { "mimeType": "text/html", "body": { "size": 12, "data": "PGI-SGk8L2I-" } }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let source = source_for(&server);
        let item = source.get_item("m1").await.unwrap();
        assert_eq!(item, RawItem::new("m1", "SGVsbG8"));
    }

    #[tokio::test]
    async fn test_get_item_without_plain_part() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/m9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m9",
                "payload": { "mimeType": "text/html", "body": { "data": "PGI-" } }
            })))
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert_eq!(source.get_item("m9").await.unwrap(), RawItem::without_body("m9"));
    }

    #[tokio::test]
    async fn test_get_item_not_found() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert!(matches!(
            source.get_item("gone").await,
            Err(SourceError::Api { status: 404, .. })
        ));
    }
}
