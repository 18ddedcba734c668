/*!
 * Translation pipeline.
 *
 * Turns the canonical document of a section into a stored translation:
 * fingerprint the canonical body, reuse a remembered translation when one
 * exists, otherwise ask the provider once and remember the answer.
 *
 * Memory insert and document upsert are separate commits. If the process
 * stops between them the next call finds the translation in memory and
 * only repeats the upsert.
 */

use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::document::model::{TRANSLATED_AT_KEY, TRANSLATED_FROM_KEY};
use crate::document::{ContentDocument, DocumentStore};
use crate::errors::{ContentError, ContentResult, ProviderError};
use crate::language_utils::LanguageSet;
use crate::providers::Provider;

use super::memory::{MemoryKey, TranslationMemory};

/// Drives canonical documents through memory and provider into the store
pub struct TranslationPipeline {
    store: DocumentStore,
    memory: TranslationMemory,
    provider: Arc<dyn Provider>,
    languages: LanguageSet,
    inflight: Option<InflightTranslations>,
}

impl TranslationPipeline {
    pub fn new(
        store: DocumentStore,
        memory: TranslationMemory,
        provider: Arc<dyn Provider>,
        languages: LanguageSet,
    ) -> Self {
        Self {
            store,
            memory,
            provider,
            languages,
            inflight: Some(InflightTranslations::default()),
        }
    }

    /// Make concurrent misses for the same key wait for one provider call
    ///
    /// With coalescing off each concurrent miss calls the provider; the
    /// first translation written to memory is still the one every caller
    /// stores.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.inflight = enabled.then(InflightTranslations::default);
        self
    }

    pub fn memory(&self) -> &TranslationMemory {
        &self.memory
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Translate a section's canonical document into `target_language`
    pub async fn translate(&self, section: &str, target_language: &str) -> ContentResult<ContentDocument> {
        let canonical_language = self.languages.canonical();
        let target = self.resolve_target(target_language)?;

        let canonical = self
            .store
            .get(section, canonical_language)
            .await?
            .ok_or_else(|| ContentError::not_found(section, canonical_language))?;

        let key = MemoryKey::new(self.memory.fingerprint(&canonical.body), target.clone());
        let translated = match self.memory.lookup(&key).await? {
            Some(text) => {
                debug!("Reusing remembered translation of '{}' into {}", section, target);
                text
            }
            None => self.fetch_and_remember(&canonical, &key).await?,
        };

        let stored = self
            .store
            .put(translated_document(&canonical, &target, translated))
            .await?;
        info!("Translated '{}' {} -> {}", section, canonical_language, target);
        Ok(stored)
    }

    fn resolve_target(&self, target_language: &str) -> ContentResult<String> {
        let target = self.languages.resolve(target_language).ok_or_else(|| {
            ContentError::validation(format!("Unsupported language: '{}'", target_language))
        })?;
        if self.languages.is_canonical(target) {
            return Err(ContentError::validation(format!(
                "Cannot translate into the canonical language '{}'",
                target
            )));
        }
        Ok(target.to_string())
    }

    async fn fetch_and_remember(&self, canonical: &ContentDocument, key: &MemoryKey) -> ContentResult<String> {
        let _slot = match &self.inflight {
            Some(inflight) => {
                let slot = inflight.acquire(key).await;
                // Another caller may have finished while this one waited
                if let Some(text) = self.memory.peek(key).await? {
                    return Ok(text);
                }
                Some(slot)
            }
            None => None,
        };

        debug!(
            "Requesting {} translation of '{}' from {}",
            key.target_language,
            canonical.section,
            self.provider.name()
        );
        let translated = self
            .provider
            .translate(&canonical.body, &canonical.language, &key.target_language)
            .await
            .and_then(|text| {
                if text.trim().is_empty() && !canonical.body.trim().is_empty() {
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(text)
                }
            })
            .map_err(|e| {
                warn!(
                    "Translation of '{}' into {} failed: {}",
                    canonical.section, key.target_language, e
                );
                ContentError::TranslationFailed(e)
            })?;

        self.memory.insert(key, &translated).await
    }
}

/// The stored form of a translation of `canonical`
fn translated_document(canonical: &ContentDocument, target: &str, body: String) -> ContentDocument {
    let mut metadata = canonical.metadata.clone();
    metadata.insert(
        TRANSLATED_FROM_KEY.to_string(),
        canonical.language.as_str().into(),
    );
    metadata.insert(TRANSLATED_AT_KEY.to_string(), Utc::now().into());
    ContentDocument::new(canonical.section.clone(), target, body, metadata)
}

/// One async lock per memory key that currently has a provider call pending
#[derive(Default)]
struct InflightTranslations {
    slots: Mutex<HashMap<MemoryKey, Arc<AsyncMutex<()>>>>,
}

impl InflightTranslations {
    async fn acquire(&self, key: &MemoryKey) -> InflightSlot<'_> {
        let lock = Arc::clone(self.slots.lock().entry(key.clone()).or_default());
        let guard = lock.lock_owned().await;
        InflightSlot {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }
}

struct InflightSlot<'a> {
    owner: &'a InflightTranslations,
    key: MemoryKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.owner.slots.lock();
        // Only the map still holds the lock: nobody is waiting on it
        if slots
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
