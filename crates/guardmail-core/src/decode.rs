//! Body decoder — URL-safe, possibly unpadded base64 → [`CanonicalText`].
//!
//! Mail APIs hand out message bodies in the URL-safe base64 alphabet and
//! often drop the `=` padding. Both are normalised back to the standard
//! alphabet before decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::DecodeError;
use crate::types::CanonicalText;

/// Decode a transport-encoded body into canonical text.
///
/// Pure: no logging, no I/O. `None` and `""` are both [`DecodeError::Missing`].
pub fn decode(encoded: Option<&str>) -> Result<CanonicalText, DecodeError> {
    let encoded = match encoded {
        Some(s) if !s.is_empty() => s,
        _ => return Err(DecodeError::Missing),
    };

    let bytes = STANDARD
        .decode(to_standard_alphabet(encoded))
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let text = String::from_utf8(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    Ok(CanonicalText::from_plain(&text))
}

/// Swap the URL-safe alphabet for the standard one and restore padding.
///
/// Padding is computed from the input length as received. A remainder of 1
/// gets nothing: no valid padding exists for it and the decode must fail.
fn to_standard_alphabet(encoded: &str) -> String {
    let mut out: String = encoded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match out.len() % 4 {
        2 => out.push_str("=="),
        3 => out.push('='),
        _ => {}
    }
    out
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
