//! Core value types shared by the decoder, extractor, and poll loop.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Raw items
// ─────────────────────────────────────────────

/// One message as handed over by a message source.
///
/// The body is still in the provider's transport encoding. `None` means the
/// provider had no usable text part for this message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawItem {
    /// Provider-assigned, stable identifier.
    pub id: String,
    /// Encoded body, if any.
    pub body: Option<String>,
}

impl RawItem {
    /// Create a raw item with an encoded body.
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: Some(body.into()),
        }
    }

    /// Create a raw item that carries no body.
    pub fn without_body(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: None,
        }
    }
}

// ─────────────────────────────────────────────
// Canonical text
// ─────────────────────────────────────────────

/// Normalised message body: uppercase, split on CRLF into non-empty trimmed
/// lines. A bare LF is not a line break.
///
/// The full uppercased text is kept alongside the lines because the marker
/// check runs on the unsplit body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalText {
    full: String,
    lines: Vec<String>,
}

impl CanonicalText {
    /// Build canonical text from already-decoded plain text.
    pub fn from_plain(text: &str) -> Self {
        let full = text.to_uppercase();
        let lines = full
            .split("\r\n")
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Self { full, lines }
    }

    /// The whole uppercased body, before line splitting.
    pub fn full_text(&self) -> &str {
        &self.full
    }

    /// Non-empty lines in original order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of non-empty lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the full text contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.full.contains(needle)
    }
}

// ─────────────────────────────────────────────
// Extraction result
// ─────────────────────────────────────────────

/// Which heuristic produced the code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRule {
    /// Five-character 7th line.
    Positional,
    /// Line after `LOGIN CODE`.
    LoginCodeLabel,
    /// Line before `IF THIS WASN'T YOU`.
    IfThisWasntYou,
}

impl fmt::Display for CodeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodeRule::Positional => "positional",
            CodeRule::LoginCodeLabel => "login-code-label",
            CodeRule::IfThisWasntYou => "if-this-wasnt-you",
        };
        f.write_str(name)
    }
}

/// Account name and login code recovered from a notification email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub account_name: String,
    pub code: String,
    pub rule: CodeRule,
}

impl ExtractionResult {
    /// Render a notification message from a template.
    ///
    /// `{account}` and `{code}` are replaced; everything else is kept verbatim.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{account}", &self.account_name)
            .replace("{code}", &self.code)
    }
}
