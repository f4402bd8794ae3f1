//! `guardmail parse` — run the decoder and extractor on a saved body.
//!
//! Handy when the notification layout drifts: save the body (raw text, or
//! the API's base64 `body.data` with `--base64`) and see which rule fires.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use guardmail_core::decode;
use guardmail_core::extract::{classify, Extraction, SkipReason};
use guardmail_core::types::CanonicalText;

use crate::helpers;

/// Decode a body the way the poller would.
fn canonicalize(content: &str, base64: bool) -> Result<CanonicalText> {
    if base64 {
        decode(Some(content.trim())).context("failed to decode body")
    } else {
        Ok(CanonicalText::from_plain(content))
    }
}

/// Run the parse command.
pub fn run(file: &Path, base64: bool, marker: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let marker = match marker {
        Some(m) => m.trim().to_uppercase(),
        None => helpers::load(None).poller.marker(),
    };

    let text = canonicalize(&content, base64)?;

    println!();
    for (i, line) in text.lines().iter().enumerate() {
        println!("  {:>3}  {}", i.to_string().dimmed(), line);
    }
    println!();

    println!("  {:<10} {}", "Marker:".bold(), marker);
    println!("  {:<10} {}", "Result:".bold(), describe(&classify(&text, &marker)));
    println!();
    Ok(())
}

fn describe(extraction: &Extraction) -> String {
    match extraction {
        Extraction::Found(result) => format!(
            "{} account {}, code {} (rule: {})",
            helpers::mark(true),
            result.account_name.bold(),
            result.code.green().bold(),
            result.rule
        ),
        Extraction::NotTarget(SkipReason::MarkerAbsent) => {
            format!("{}", "· not a login notification (marker absent)".dimmed())
        }
        Extraction::NotTarget(SkipReason::TooShort { lines }) => format!(
            "{}",
            format!("· not a login notification (only {lines} lines)").dimmed()
        ),
        Extraction::Anomaly(anomaly) => format!("{} {}", helpers::mark(false), anomaly),
    }
}
