/*!
 * Content fingerprints.
 *
 * A fingerprint is the lowercase hex SHA-256 of a canonical body after the
 * configured normalization. Two bodies share a fingerprint exactly when they
 * normalize to the same text, which is what lets a translation be reused.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;

use crate::app_config::FingerprintConfig;

/// Runs of whitespace other than line breaks
static HORIZONTAL_WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// Stable hash identifying a canonical body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First characters of the digest, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes fingerprints under one normalization policy
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter {
    normalization: FingerprintConfig,
}

impl Fingerprinter {
    pub fn new(normalization: FingerprintConfig) -> Self {
        Self { normalization }
    }

    pub fn normalization(&self) -> FingerprintConfig {
        self.normalization
    }

    /// Apply the normalization steps, borrowing when nothing changes
    ///
    /// Line breaks are kept: in Markdown they separate list items, headings
    /// and paragraphs, so moving them is a change of content.
    pub fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut normalized = Cow::Borrowed(text);

        if self.normalization.collapse_whitespace {
            let collapsed = collapse_whitespace(text);
            if collapsed != text {
                normalized = Cow::Owned(collapsed);
            }
        }

        if self.normalization.ignore_case && normalized.chars().any(char::is_uppercase) {
            normalized = Cow::Owned(normalized.to_lowercase());
        }

        normalized
    }

    /// Fingerprint a body
    pub fn fingerprint(&self, text: &str) -> Fingerprint {
        let normalized = self.normalize(text);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }
}

/// Normalize `\r\n`, drop trailing whitespace on every line, collapse inner
/// whitespace runs to one space and strip blank lines at both ends.
/// Leading indentation is kept as written.
fn collapse_whitespace(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end();
        let content = line.trim_start();
        let indent = &line[..line.len() - content.len()];
        lines.push(format!(
            "{}{}",
            indent,
            HORIZONTAL_WHITESPACE_REGEX.replace_all(content, " ")
        ));
    }
    lines.join("\n").trim_matches('\n').to_string()
}
