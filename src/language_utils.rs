//! Language utilities for the closed set of content languages
//!
//! Codes are validated against ISO 639 and normalized to their ISO 639-1
//! (2-letter) form when one exists, so that "deu", "ger" and "DE" all
//! address the same document collection.

use anyhow::{Result, anyhow};
use isolang::Language;
use serde::Serialize;

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("per", "fas"),
    ("rum", "ron"),
    ("arm", "hye"),
    ("geo", "kat"),
];

/// Flags shown by language pickers
const LANGUAGE_FLAGS: &[(&str, &str)] = &[
    ("de", "🇩🇪"),
    ("en", "🇬🇧"),
    ("tr", "🇹🇷"),
    ("ru", "🇷🇺"),
    ("ar", "🇸🇦"),
    ("fr", "🇫🇷"),
    ("es", "🇪🇸"),
    ("it", "🇮🇹"),
    ("uk", "🇺🇦"),
    ("pl", "🇵🇱"),
];

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| *t)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-3 if no ISO 639-1 code exists
pub fn normalize_language_code(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Description of one supported language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageInfo {
    /// Normalized language code
    pub code: String,
    /// English name
    pub name: String,
    /// Name of the language in the language itself
    pub native_name: String,
    /// Flag emoji, when one is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    /// Whether content is authored directly in this language
    pub canonical: bool,
}

/// The closed set of languages content may exist in
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSet {
    canonical: String,
    supported: Vec<String>,
}

impl LanguageSet {
    /// Build a language set, normalizing every code
    ///
    /// The canonical language is always part of the set, even when it is
    /// missing from `supported`. Duplicate codes are dropped.
    pub fn new(canonical: &str, supported: &[String]) -> Result<Self> {
        let canonical = normalize_language_code(canonical)?;
        let mut codes = vec![canonical.clone()];
        for code in supported {
            let normalized = normalize_language_code(code)?;
            if !codes.contains(&normalized) {
                codes.push(normalized);
            }
        }

        Ok(Self {
            canonical,
            supported: codes,
        })
    }

    /// The canonical language code
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// All supported codes, canonical first
    pub fn codes(&self) -> &[String] {
        &self.supported
    }

    /// Supported languages other than the canonical one
    pub fn translation_targets(&self) -> impl Iterator<Item = &str> {
        self.supported
            .iter()
            .filter(move |code| **code != self.canonical)
            .map(String::as_str)
    }

    /// Resolve a caller-supplied code to its normalized supported form
    pub fn resolve(&self, code: &str) -> Option<&str> {
        let normalized = normalize_language_code(code).ok()?;
        self.supported
            .iter()
            .find(|supported| **supported == normalized)
            .map(String::as_str)
    }

    /// Whether a code names the canonical language
    pub fn is_canonical(&self, code: &str) -> bool {
        language_codes_match(code, &self.canonical)
    }

    /// Registry entries for every supported language
    pub fn describe(&self) -> Vec<LanguageInfo> {
        self.supported
            .iter()
            .filter_map(|code| {
                let lang = lookup(code)?;
                Some(LanguageInfo {
                    code: code.clone(),
                    name: lang.to_name().to_string(),
                    native_name: lang
                        .to_autonym()
                        .unwrap_or_else(|| lang.to_name())
                        .to_string(),
                    flag: LANGUAGE_FLAGS
                        .iter()
                        .find(|(flag_code, _)| *flag_code == code.as_str())
                        .map(|(_, flag)| flag.to_string()),
                    canonical: *code == self.canonical,
                })
            })
            .collect()
    }
}
