/*!
 * Content manager.
 *
 * The entry point callers use. It validates input, resolves optional
 * language arguments to the canonical language, and delegates to the
 * document store and the translation pipeline.
 */

use anyhow::{Context, Result};
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app_config::Config;
use crate::database::DatabaseConnection;
use crate::document::model::{SECTION_KEY, TITLE_KEY, TRANSLATED_AT_KEY, TRANSLATED_FROM_KEY};
use crate::document::{
    merge_metadata, ContentDocument, DocumentStore, Metadata, RenderedDocument, SectionSummary,
};
use crate::errors::{ContentError, ContentResult};
use crate::language_utils::{LanguageInfo, LanguageSet};
use crate::providers::Provider;
use crate::translation::{MemoryStats, TranslationMemory, TranslationPipeline};

/// Longest accepted section id, in characters
pub const MAX_SECTION_LENGTH: usize = 128;

/// Result of translating a section into one language
#[derive(Debug)]
pub struct TranslationOutcome {
    /// Target language code
    pub language: String,
    /// Stored translation or the reason it failed
    pub result: ContentResult<ContentDocument>,
}

/// Client-side language switcher configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageConfig {
    pub default_language: String,
    pub available_languages: BTreeMap<String, LanguageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageEntry {
    /// Name in the language itself
    pub name: String,
    /// Page serving this language
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

/// Document counts and memory statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentStats {
    /// Stored documents per language, canonical first
    pub documents: Vec<(String, usize)>,
    pub memory: MemoryStats,
}

/// Facade over the document store and the translation pipeline
pub struct ContentManager {
    store: DocumentStore,
    pipeline: TranslationPipeline,
    languages: LanguageSet,
}

impl ContentManager {
    /// Open the database named in the configuration
    ///
    /// An empty `database_path` selects the user's data directory.
    pub fn new(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let db = if config.content.database_path.is_empty() {
            DatabaseConnection::new_default()?
        } else {
            DatabaseConnection::new(PathBuf::from(&config.content.database_path))?
        };
        Self::with_database(db, config, provider)
    }

    /// Build a manager over an already open database
    pub fn with_database(db: DatabaseConnection, config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let languages = config
            .content
            .language_set()
            .context("Invalid content language configuration")?;
        let store = DocumentStore::new(db.clone());
        let memory = TranslationMemory::new(db, config.fingerprint);
        let pipeline = TranslationPipeline::new(store.clone(), memory, provider, languages.clone())
            .with_coalescing(config.translation.common.coalesce_concurrent_misses);

        info!(
            "Content manager ready: canonical '{}', languages {:?}",
            languages.canonical(),
            languages.codes()
        );
        Ok(Self {
            store,
            pipeline,
            languages,
        })
    }

    /// Build a manager over a fresh in-memory database
    pub fn in_memory(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        Self::with_database(DatabaseConnection::new_in_memory()?, config, provider)
    }

    pub fn language_set(&self) -> &LanguageSet {
        &self.languages
    }

    /// Create or replace the canonical document of a section
    ///
    /// `section` and `title` are written into the metadata over any values
    /// the caller supplied for them.
    pub async fn create_content(
        &self,
        section: &str,
        title: &str,
        body: &str,
        metadata: Metadata,
    ) -> ContentResult<ContentDocument> {
        validate_section(section)?;
        if title.trim().is_empty() {
            return Err(ContentError::validation("Title must not be empty"));
        }
        if body.trim().is_empty() {
            return Err(ContentError::validation("Body must not be empty"));
        }

        let mut metadata = metadata;
        metadata.insert(SECTION_KEY.to_string(), section.into());
        metadata.insert(TITLE_KEY.to_string(), title.into());

        let document = ContentDocument::new(section, self.languages.canonical(), body, metadata);
        let stored = self.store.put(document).await?;
        info!("Created '{}' ({})", stored.section, stored.language);
        Ok(stored)
    }

    /// Replace a document's body and merge metadata into it
    ///
    /// Without `language` the canonical document is updated and `false` is
    /// returned when it does not exist. An explicit non-canonical language
    /// creates the variant when it is missing.
    pub async fn update_content(
        &self,
        section: &str,
        body: &str,
        metadata: Metadata,
        language: Option<&str>,
    ) -> ContentResult<bool> {
        validate_section(section)?;
        if body.trim().is_empty() {
            return Err(ContentError::validation("Body must not be empty"));
        }
        let language = self.resolve_language(language)?;

        let new_body = body.to_string();
        let updates = metadata.clone();
        let updated = self
            .store
            .update_with(section, &language, move |document| {
                document.body = new_body;
                merge_metadata(&mut document.metadata, updates);
            })
            .await?;
        if updated.is_some() {
            info!("Updated '{}' ({})", section, language);
            return Ok(true);
        }

        if self.languages.is_canonical(&language) {
            return Ok(false);
        }

        let mut seeded = self.variant_metadata(section).await?;
        merge_metadata(&mut seeded, metadata);
        self.store
            .put(ContentDocument::new(section, language.as_str(), body, seeded))
            .await?;
        info!("Created variant '{}' ({})", section, language);
        Ok(true)
    }

    /// Metadata a hand-written variant starts from
    async fn variant_metadata(&self, section: &str) -> ContentResult<Metadata> {
        let mut metadata = match self.store.get(section, self.languages.canonical()).await? {
            Some(canonical) => canonical.metadata,
            None => Metadata::new(),
        };
        metadata.remove(TRANSLATED_FROM_KEY);
        metadata.remove(TRANSLATED_AT_KEY);
        metadata.insert(SECTION_KEY.to_string(), section.into());
        Ok(metadata)
    }

    /// Fetch a document; the canonical language when `language` is `None`
    pub async fn get_content(&self, section: &str, language: Option<&str>) -> ContentResult<Option<ContentDocument>> {
        validate_section(section)?;
        let language = self.resolve_language(language)?;
        self.store.get(section, &language).await
    }

    /// Fetch a document together with its body rendered to HTML
    pub async fn render_content(
        &self,
        section: &str,
        language: Option<&str>,
    ) -> ContentResult<Option<RenderedDocument>> {
        Ok(self
            .get_content(section, language)
            .await?
            .map(ContentDocument::rendered))
    }

    /// List the sections stored in a language, ordered by section id
    pub async fn list_sections(&self, language: Option<&str>) -> ContentResult<Vec<SectionSummary>> {
        let language = self.resolve_language(language)?;
        self.store.list(&language).await
    }

    /// Delete one language variant; other languages and memory are untouched
    pub async fn delete_content(&self, section: &str, language: Option<&str>) -> ContentResult<bool> {
        validate_section(section)?;
        let language = self.resolve_language(language)?;
        let removed = self.store.delete(section, &language).await?;
        if removed {
            info!("Deleted '{}' ({})", section, language);
        }
        Ok(removed)
    }

    /// Translate the canonical document into `target_language` and store it
    pub async fn translate_content(&self, section: &str, target_language: &str) -> ContentResult<ContentDocument> {
        validate_section(section)?;
        self.pipeline.translate(section, target_language).await
    }

    /// Translate a section into every non-canonical language
    ///
    /// Fails up front when the canonical document is missing; afterwards each
    /// language succeeds or fails on its own.
    pub async fn translate_all(&self, section: &str) -> ContentResult<Vec<TranslationOutcome>> {
        validate_section(section)?;
        let canonical = self.languages.canonical();
        if self.store.get(section, canonical).await?.is_none() {
            return Err(ContentError::not_found(section, canonical));
        }

        let translations = self.languages.translation_targets().map(|target| async move {
            TranslationOutcome {
                language: target.to_string(),
                result: self.pipeline.translate(section, target).await,
            }
        });
        let outcomes = join_all(translations).await;

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                warn!("Could not translate '{}' into {}: {}", section, outcome.language, e);
            }
        }
        Ok(outcomes)
    }

    /// Name of the translation provider in use
    pub fn provider_name(&self) -> &str {
        self.pipeline.provider().name()
    }

    /// Check that the translation provider is reachable and configured
    pub async fn check_provider(&self) -> ContentResult<()> {
        let provider = self.pipeline.provider();
        provider.test_connection().await?;
        info!("Translation provider '{}' is reachable", provider.name());
        Ok(())
    }

    /// The supported languages, canonical first
    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.languages.describe()
    }

    /// Language switcher configuration for the public site
    pub fn language_config(&self) -> LanguageConfig {
        let available_languages = self
            .languages
            .describe()
            .into_iter()
            .map(|info| {
                let file = if info.canonical {
                    "index.html".to_string()
                } else {
                    format!("lang/{}.html", info.code)
                };
                let entry = LanguageEntry {
                    name: info.native_name.to_lowercase(),
                    file,
                    flag: info.flag,
                };
                (info.code, entry)
            })
            .collect();

        LanguageConfig {
            default_language: self.languages.canonical().to_string(),
            available_languages,
        }
    }

    /// Document counts per language and translation memory statistics
    pub async fn stats(&self) -> ContentResult<ContentStats> {
        let mut documents = Vec::with_capacity(self.languages.codes().len());
        for code in self.languages.codes() {
            documents.push((code.clone(), self.store.count(code).await?));
        }
        Ok(ContentStats {
            documents,
            memory: self.pipeline.memory().stats().await?,
        })
    }

    fn resolve_language(&self, language: Option<&str>) -> ContentResult<String> {
        match language {
            None => Ok(self.languages.canonical().to_string()),
            Some(code) => self
                .languages
                .resolve(code)
                .map(str::to_string)
                .ok_or_else(|| ContentError::validation(format!("Unsupported language: '{}'", code))),
        }
    }
}

/// Check a section id before it reaches storage
pub fn validate_section(section: &str) -> ContentResult<()> {
    if section.trim().is_empty() {
        return Err(ContentError::validation("Section id must not be empty"));
    }
    if section.chars().any(char::is_control) {
        return Err(ContentError::validation(format!(
            "Section id {:?} contains control characters",
            section
        )));
    }
    if section.chars().count() > MAX_SECTION_LENGTH {
        return Err(ContentError::validation(format!(
            "Section id is longer than {} characters",
            MAX_SECTION_LENGTH
        )));
    }
    Ok(())
}
