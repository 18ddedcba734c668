/*!
 * Content document model.
 *
 * A `ContentDocument` is one piece of content in one language. The same
 * section id names the same content in every language.
 */

use chrono::{DateTime, Utc};
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the document title
pub const TITLE_KEY: &str = "title";

/// Metadata key repeating the section id
pub const SECTION_KEY: &str = "section";

/// Metadata key naming the language a translation was produced from
pub const TRANSLATED_FROM_KEY: &str = "translated_from";

/// Metadata key holding the time a translation was produced
pub const TRANSLATED_AT_KEY: &str = "translated_at";

/// A single metadata value
///
/// The set of kinds is closed so that merging and persisting metadata is
/// unambiguous: a timestamp never degrades into a string on a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetadataValue {
    /// Free text
    Text(String),
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// Boolean flag
    Flag(bool),
}

impl MetadataValue {
    /// The text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The timestamp, if this is a timestamp value
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Ordered key-value metadata attached to a document
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Shallow-merge `updates` into `base`; keys in `updates` win
pub fn merge_metadata(base: &mut Metadata, updates: Metadata) {
    base.extend(updates);
}

/// One content document, addressed by (section, language)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    /// Section identifier, stable across languages
    pub section: String,
    /// Language code of this variant
    pub language: String,
    /// Raw markup body
    pub body: String,
    /// Title, provenance and caller-supplied fields
    pub metadata: Metadata,
    /// When the document was first stored
    pub created_at: DateTime<Utc>,
    /// When the document was last stored
    pub updated_at: DateTime<Utc>,
}

impl ContentDocument {
    /// Create a document stamped with the current time
    pub fn new(
        section: impl Into<String>,
        language: impl Into<String>,
        body: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            section: section.into(),
            language: language.into(),
            body: body.into(),
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// The title stored in metadata
    pub fn title(&self) -> Option<&str> {
        self.metadata.get(TITLE_KEY).and_then(MetadataValue::as_text)
    }

    /// The language this document was translated from, if it is a translation
    pub fn translated_from(&self) -> Option<&str> {
        self.metadata
            .get(TRANSLATED_FROM_KEY)
            .and_then(MetadataValue::as_text)
    }

    /// Whether the document was produced by machine translation
    pub fn is_translation(&self) -> bool {
        self.translated_from().is_some()
    }

    /// Render the Markdown body to HTML
    pub fn html(&self) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(&self.body, options);
        let mut rendered = String::with_capacity(self.body.len() * 3 / 2);
        html::push_html(&mut rendered, parser);
        rendered
    }

    /// The document together with its rendered body
    pub fn rendered(self) -> RenderedDocument {
        let html = self.html();
        RenderedDocument {
            document: self,
            html,
        }
    }
}

/// A document as served to readers: stored fields plus the HTML body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    #[serde(flatten)]
    pub document: ContentDocument,
    pub html: String,
}

/// Listing entry for one section in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    /// Section identifier
    pub section: String,
    /// Metadata of the stored document
    pub metadata: Metadata,
}
