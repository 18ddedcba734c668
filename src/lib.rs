/*!
 * # kosge-cms - multilingual content store with translation memory
 *
 * A Rust library that keeps one document per section and language, and
 * produces the non-canonical languages by machine translation without ever
 * paying twice for the same text.
 *
 * ## Features
 *
 * - Per-language content documents in SQLite, addressed by (section, language)
 * - Typed, ordered metadata that merges shallowly on update
 * - Markdown bodies rendered to HTML for readers
 * - Content-addressed translation memory keyed by a SHA-256 fingerprint
 * - Configurable fingerprint normalization (whitespace, case)
 * - Translation through various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API
 *   - LM Studio (OpenAI-compatible)
 * - Concurrent misses for the same text coalesced into one provider call
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite connection handling and schema
 * - `document`: Content documents and the document store
 * - `translation`: Memoized translation:
 *   - `translation::fingerprint`: Body normalization and hashing
 *   - `translation::memory`: The translation memory
 *   - `translation::pipeline`: Canonical document to stored translation
 * - `content_manager`: The facade callers use
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for the translation backends:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::openai`: OpenAI-compatible API client
 *   - `providers::mock`: Counting mock used in tests
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod content_manager;
pub mod database;
pub mod document;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use content_manager::{ContentManager, ContentStats, LanguageConfig, TranslationOutcome};
pub use document::{
    ContentDocument, DocumentStore, Metadata, MetadataValue, RenderedDocument, SectionSummary,
};
pub use errors::{ContentError, ContentResult, ProviderError};
pub use language_utils::{get_language_name, language_codes_match, normalize_language_code};
pub use providers::Provider;
pub use translation::{TranslationMemory, TranslationPipeline};
