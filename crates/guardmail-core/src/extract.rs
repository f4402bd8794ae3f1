//! Login-code extractor.
//!
//! Works on [`CanonicalText`] only, so everything here is a pure function of
//! the decoded body and the marker phrase.
//!
//! The notification layout drifts by region (the "request made from" block
//! changes length), so the code is located by a fixed cascade:
//!
//! 1. the 7th line, if it is exactly five characters
//! 2. the line after `LOGIN CODE`
//! 3. the line before `IF THIS WASN'T YOU`
//!
//! A later rule is only consulted when every earlier one came up empty.

use crate::error::ExtractionAnomaly;
use crate::types::{CanonicalText, CodeRule, ExtractionResult};

/// Bodies with fewer lines than this are not the layout we know.
pub const MIN_LINES: usize = 10;

const ACCOUNT_ANCHOR: &str = "DEAR";
const POSITIONAL_LINE: usize = 6;
const POSITIONAL_CODE_LEN: usize = 5;
const LOGIN_CODE_ANCHOR: &str = "LOGIN CODE";
const NOT_YOU_ANCHOR: &str = "IF THIS WASN'T YOU";

/// Why a message was not treated as a target notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    MarkerAbsent,
    TooShort { lines: usize },
}

/// Outcome of running the extractor over one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// Not a login notification; nothing to deliver.
    NotTarget(SkipReason),
    /// Looks like a login notification but could not be parsed.
    Anomaly(ExtractionAnomaly),
    Found(ExtractionResult),
}

impl Extraction {
    pub fn into_result(self) -> Option<ExtractionResult> {
        match self {
            Extraction::Found(result) => Some(result),
            _ => None,
        }
    }
}

/// Extract account and code, collapsing every failure to `None`.
pub fn extract(text: &CanonicalText, marker: &str) -> Option<ExtractionResult> {
    classify(text, marker).into_result()
}

/// Run the full gate sequence and report exactly where it stopped.
///
/// `marker` must already be uppercase.
pub fn classify(text: &CanonicalText, marker: &str) -> Extraction {
    if !text.contains(marker) {
        return Extraction::NotTarget(SkipReason::MarkerAbsent);
    }

    let lines = text.lines();
    if lines.len() < MIN_LINES {
        return Extraction::NotTarget(SkipReason::TooShort { lines: lines.len() });
    }

    let Some(account_name) = account_name(lines) else {
        return Extraction::Anomaly(ExtractionAnomaly::NoAccountLine);
    };

    let code = positional_code(lines)
        .map(|code| (code, CodeRule::Positional))
        .or_else(|| line_after(lines, LOGIN_CODE_ANCHOR).map(|c| (c, CodeRule::LoginCodeLabel)))
        .or_else(|| line_before(lines, NOT_YOU_ANCHOR).map(|c| (c, CodeRule::IfThisWasntYou)));

    match code {
        Some((code, rule)) => Extraction::Found(ExtractionResult {
            account_name,
            code: code.to_string(),
            rule,
        }),
        None => Extraction::Anomaly(ExtractionAnomaly::NoCodeFound),
    }
}

/// `DEAR NAME,` → `NAME`. Only one trailing comma is removed.
fn account_name(lines: &[String]) -> Option<String> {
    let line = lines.iter().find(|l| l.contains(ACCOUNT_ANCHOR))?;
    let stripped = line.replace(ACCOUNT_ANCHOR, "");
    let trimmed = stripped.trim();
    let name = trimmed.strip_suffix(',').unwrap_or(trimmed);
    (!name.is_empty()).then(|| name.to_string())
}

fn positional_code(lines: &[String]) -> Option<&str> {
    let line = lines.get(POSITIONAL_LINE)?.trim();
    (line.chars().count() == POSITIONAL_CODE_LEN).then_some(line)
}

fn line_after<'a>(lines: &'a [String], anchor: &str) -> Option<&'a str> {
    let idx = lines.iter().position(|l| l.contains(anchor))?;
    non_empty(lines.get(idx + 1)?)
}

fn line_before<'a>(lines: &'a [String], anchor: &str) -> Option<&'a str> {
    let idx = lines.iter().position(|l| l.contains(anchor))?;
    non_empty(lines.get(idx.checked_sub(1)?)?)
}

fn non_empty(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
