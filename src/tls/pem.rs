//! Credential normalization.
//!
//! Certificate and key material usually arrives through environment
//! variables, where line breaks get lost, escaped as `\n`, or mixed with
//! stray whitespace. [`normalize`] rebuilds a strict PEM block from such
//! input so that it can be handed to the TLS layer.
//!
//! # Algorithm
//! ```text
//! raw string
//!     → strip `-----BEGIN ...-----` markers (same line only)
//!     → strip `-----END ...-----` markers
//!     → strip escaped `\n` sequences
//!     → strip whitespace
//!     → wrap at 64 columns under fresh BEGIN/END delimiters
//! ```
//!
//! The payload is not checked for valid base64 or DER. A malformed input
//! produces a well-formed block that the context builder later rejects.

use thiserror::Error;

/// Maximum body line width of a PEM block.
pub const PEM_LINE_WIDTH: usize = 64;

/// Label used for client certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Label used for PKCS#1 RSA private keys.
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

const BEGIN_MARKER: &str = "-----BEGIN";
const END_MARKER: &str = "-----END";
const DASHES: &str = "-----";

/// Error raised when credential material cannot be normalized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PemError {
    #[error("invalid {label} input: {reason}")]
    InvalidInput { label: String, reason: &'static str },
}

/// Characters that end the line a delimiter must close on.
const LINE_BREAKS: [char; 4] = ['\n', '\r', '\u{2028}', '\u{2029}'];

/// Not whitespace to `char::is_whitespace`, but never part of a payload.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Rebuild `content` as a PEM block labelled `label`.
///
/// Fails when `content` is empty or contains nothing but delimiters and
/// whitespace.
pub fn normalize(content: &str, label: &str) -> Result<String, PemError> {
    if content.is_empty() {
        return Err(PemError::InvalidInput {
            label: label.to_string(),
            reason: "content is empty",
        });
    }

    let stripped = strip_markers(content, BEGIN_MARKER);
    let stripped = strip_markers(&stripped, END_MARKER);
    let payload: String = stripped
        .replace("\\n", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != BYTE_ORDER_MARK)
        .collect();

    if payload.is_empty() {
        return Err(PemError::InvalidInput {
            label: label.to_string(),
            reason: "no payload after stripping delimiters and whitespace",
        });
    }

    let chars: Vec<char> = payload.chars().collect();
    let body = chars
        .chunks(PEM_LINE_WIDTH)
        .map(|line| line.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "-----BEGIN {label}-----\n{body}\n-----END {label}-----"
    ))
}

/// Remove every `marker ... -----` span whose closing dashes sit on the
/// same line as the marker. The shortest such span is removed.
fn strip_markers(input: &str, marker: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(marker) {
        out.push_str(&rest[..start]);
        let after = &rest[start + marker.len()..];
        let line_end = after.find(LINE_BREAKS).unwrap_or(after.len());

        match after[..line_end].find(DASHES) {
            Some(close) => {
                rest = &after[close + DASHES.len()..];
            }
            None => {
                // Unterminated on this line; keep the text and move past it.
                out.push_str(&rest[start..start + marker.len()]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
