//! In-memory source and notifier for the poller tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use guardmail_core::error::{NotifyError, SourceError};
use guardmail_core::types::RawItem;
use guardmail_providers::{MessageSource, Notifier};

/// URL-safe, unpadded, CRLF-joined, the way Gmail hands out bodies.
pub fn encode(lines: &[&str]) -> String {
    URL_SAFE_NO_PAD.encode(lines.join("\r\n"))
}

pub fn target_body(account: &str, code: &str) -> String {
    let dear = format!("Dear {account},");
    encode(&[
        dear.as_str(),
        "Request made from",
        "Some City, Some Country",
        "Login Code",
        code,
        "If this wasn't you",
        "Ignore this email",
        "Someone tried to sign in from a new device",
        "...",
        "...",
    ])
}

pub fn not_target_body() -> String {
    encode(&["Your Steam purchase receipt", "Thanks for shopping"])
}

#[derive(Default)]
pub struct FakeSource {
    items: Vec<RawItem>,
    failing_items: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    list_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_items(items: Vec<RawItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn fail_item(&self, id: &str) {
        self.failing_items.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// IDs passed to `get_item`, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSource for FakeSource {
    async fn list_identifiers(&self, _filter: &str) -> Result<Vec<String>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(SourceError::Http("connection reset".into()));
        }
        Ok(self.items.iter().map(|i| i.id.clone()).collect())
    }

    async fn get_item(&self, id: &str) -> Result<RawItem, SourceError> {
        self.fetched.lock().unwrap().push(id.to_string());
        if self.failing_items.lock().unwrap().contains(id) {
            return Err(SourceError::Api {
                status: 500,
                body: "backend error".into(),
            });
        }
        self.items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| SourceError::Api {
                status: 404,
                body: "not found".into(),
            })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully delivered texts.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected { status: 500 });
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
