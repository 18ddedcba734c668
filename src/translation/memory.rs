/*!
 * Translation memory.
 *
 * Maps (fingerprint, target language) to a translated body. Entries are
 * written once and never changed: the first successful insert for a key is
 * the one every later reader sees. An in-process map sits in front of the
 * SQLite table; because entries are immutable it can never go stale.
 */

use chrono::{SecondsFormat, Utc};
use log::debug;
use parking_lot::RwLock;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::app_config::FingerprintConfig;
use crate::database::DatabaseConnection;
use crate::errors::ContentResult;

use super::fingerprint::{Fingerprint, Fingerprinter};

/// Key of one memory entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    /// Fingerprint of the canonical body
    pub fingerprint: Fingerprint,
    /// Language the body was translated into
    pub target_language: String,
}

impl MemoryKey {
    pub fn new(fingerprint: Fingerprint, target_language: impl Into<String>) -> Self {
        Self {
            fingerprint,
            target_language: target_language.into(),
        }
    }
}

/// Memory statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    /// Persisted entries
    pub entries: usize,
    /// Persisted entries per target language
    pub entries_by_language: BTreeMap<String, usize>,
    /// Lookups answered from memory since this process started
    pub hits: usize,
    /// Lookups that found nothing since this process started
    pub misses: usize,
    /// hits / (hits + misses), 0 when nothing was looked up
    pub hit_rate: f64,
}

/// Content-addressed store of finished translations
#[derive(Clone)]
pub struct TranslationMemory {
    db: DatabaseConnection,
    fingerprinter: Fingerprinter,
    /// Entries already read from or written to the database
    entries: Arc<RwLock<HashMap<MemoryKey, String>>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl TranslationMemory {
    /// Create a memory over an open database
    pub fn new(db: DatabaseConnection, normalization: FingerprintConfig) -> Self {
        Self {
            db,
            fingerprinter: Fingerprinter::new(normalization),
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fingerprint a canonical body under this memory's normalization
    pub fn fingerprint(&self, body: &str) -> Fingerprint {
        self.fingerprinter.fingerprint(body)
    }

    /// Find the stored translation for a key, counting a hit or a miss
    pub async fn lookup(&self, key: &MemoryKey) -> ContentResult<Option<String>> {
        let found = self.peek(key).await?;
        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Memory hit for {} -> {}",
                    key.fingerprint.short(),
                    key.target_language
                );
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Memory miss for {} -> {}",
                    key.fingerprint.short(),
                    key.target_language
                );
            }
        }
        Ok(found)
    }

    /// Find the stored translation for a key without touching the statistics
    pub async fn peek(&self, key: &MemoryKey) -> ContentResult<Option<String>> {
        if let Some(text) = self.entries.read().get(key).cloned() {
            return Ok(Some(text));
        }

        let fingerprint = key.fingerprint.as_str().to_string();
        let target_language = key.target_language.clone();
        let stored = self
            .db
            .execute_async(move |conn| {
                let text = conn
                    .query_row(
                        "SELECT translated_text FROM translation_memory
                         WHERE fingerprint = ?1 AND target_language = ?2",
                        params![fingerprint, target_language],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(text)
            })
            .await?;

        if let Some(text) = &stored {
            self.entries.write().insert(key.clone(), text.clone());
        }
        Ok(stored)
    }

    /// Store a translation unless the key already has one
    ///
    /// Returns the text retained for the key, which is `text` only when this
    /// call was the first to insert.
    pub async fn insert(&self, key: &MemoryKey, text: &str) -> ContentResult<String> {
        let fingerprint = key.fingerprint.as_str().to_string();
        let target_language = key.target_language.clone();
        let candidate = text.to_string();

        let (retained, inserted) = self
            .db
            .transaction_async(move |tx| {
                let inserted = tx.execute(
                    "INSERT INTO translation_memory (fingerprint, target_language, translated_text, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(fingerprint, target_language) DO NOTHING",
                    params![
                        fingerprint,
                        target_language,
                        candidate,
                        Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    ],
                )?;
                let retained: String = tx.query_row(
                    "SELECT translated_text FROM translation_memory
                     WHERE fingerprint = ?1 AND target_language = ?2",
                    params![fingerprint, target_language],
                    |row| row.get(0),
                )?;
                Ok((retained, inserted > 0))
            })
            .await?;

        if inserted {
            debug!(
                "Remembered translation {} -> {} ({} bytes)",
                key.fingerprint.short(),
                key.target_language,
                retained.len()
            );
        } else {
            debug!(
                "Kept earlier translation for {} -> {}",
                key.fingerprint.short(),
                key.target_language
            );
        }

        self.entries.write().insert(key.clone(), retained.clone());
        Ok(retained)
    }

    /// Number of persisted entries
    pub async fn len(&self) -> ContentResult<usize> {
        let count = self
            .db
            .execute_async(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM translation_memory", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await?;
        Ok(count)
    }

    pub async fn is_empty(&self) -> ContentResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Persisted entry counts plus this process's hit statistics
    pub async fn stats(&self) -> ContentResult<MemoryStats> {
        let entries_by_language = self
            .db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT target_language, COUNT(*) FROM translation_memory
                     GROUP BY target_language ORDER BY target_language",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                    })?
                    .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
                Ok(rows)
            })
            .await?;

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        Ok(MemoryStats {
            entries: entries_by_language.values().sum(),
            entries_by_language,
            hits,
            misses,
            hit_rate,
        })
    }
}
