/*!
 * Document persistence.
 *
 * The store keeps exactly one document per (section, language). Every
 * mutation runs inside a single SQLite transaction while holding the
 * connection lock, so a read-modify-write such as a metadata merge cannot
 * interleave with another writer and a failed commit leaves nothing behind.
 */

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::DatabaseConnection;
use crate::errors::ContentResult;

use super::model::{ContentDocument, Metadata, SectionSummary};

/// SQLite-backed document store
#[derive(Clone)]
pub struct DocumentStore {
    db: DatabaseConnection,
}

impl DocumentStore {
    /// Create a store over an open database
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch the document for a (section, language) pair
    pub async fn get(&self, section: &str, language: &str) -> ContentResult<Option<ContentDocument>> {
        let section = section.to_string();
        let language = language.to_string();

        let document = self
            .db
            .execute_async(move |conn| read_document(conn, &section, &language))
            .await?;
        Ok(document)
    }

    /// Insert or replace a document
    ///
    /// `created_at` is kept from the stored document when one exists and set
    /// to now otherwise; `updated_at` is refreshed and never moves backwards.
    pub async fn put(&self, document: ContentDocument) -> ContentResult<ContentDocument> {
        let stored = self
            .db
            .transaction_async(move |tx| {
                let mut document = document;
                let now = Utc::now();
                match read_document(tx, &document.section, &document.language)? {
                    Some(existing) => {
                        document.created_at = existing.created_at;
                        document.updated_at = now.max(existing.updated_at);
                    }
                    None => {
                        document.created_at = now;
                        document.updated_at = now;
                    }
                }
                write_document(tx, &document)?;
                Ok(document)
            })
            .await?;

        debug!(
            "Stored document '{}' ({}), {} bytes",
            stored.section,
            stored.language,
            stored.body.len()
        );
        Ok(stored)
    }

    /// Atomically modify an existing document
    ///
    /// Returns `None` without calling `mutate` when the document does not
    /// exist. The section and language cannot be changed by `mutate`.
    pub async fn update_with<F>(
        &self,
        section: &str,
        language: &str,
        mutate: F,
    ) -> ContentResult<Option<ContentDocument>>
    where
        F: FnOnce(&mut ContentDocument) + Send + 'static,
    {
        let section = section.to_string();
        let language = language.to_string();

        let updated = self
            .db
            .transaction_async(move |tx| {
                let Some(mut document) = read_document(tx, &section, &language)? else {
                    return Ok(None);
                };

                let previous_updated_at = document.updated_at;
                let created_at = document.created_at;
                mutate(&mut document);
                document.section = section;
                document.language = language;
                document.created_at = created_at;
                document.updated_at = Utc::now().max(previous_updated_at);

                write_document(tx, &document)?;
                Ok(Some(document))
            })
            .await?;

        if let Some(document) = &updated {
            debug!("Updated document '{}' ({})", document.section, document.language);
        }
        Ok(updated)
    }

    /// Remove one document; returns whether it existed
    pub async fn delete(&self, section: &str, language: &str) -> ContentResult<bool> {
        let section = section.to_string();
        let language = language.to_string();

        let removed = self
            .db
            .transaction_async(move |tx| {
                let deleted = tx.execute(
                    "DELETE FROM documents WHERE section = ?1 AND language = ?2",
                    params![section, language],
                )?;
                Ok(deleted > 0)
            })
            .await?;
        Ok(removed)
    }

    /// List every section stored in a language, ordered by section id
    pub async fn list(&self, language: &str) -> ContentResult<Vec<SectionSummary>> {
        let language = language.to_string();

        let summaries = self
            .db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT section, metadata FROM documents WHERE language = ?1 ORDER BY section",
                )?;
                let rows = stmt
                    .query_map([&language], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                rows.into_iter()
                    .map(|(section, metadata)| -> Result<SectionSummary> {
                        let metadata = parse_metadata(&section, &metadata)?;
                        Ok(SectionSummary { section, metadata })
                    })
                    .collect()
            })
            .await?;
        Ok(summaries)
    }

    /// Number of documents stored in a language
    pub async fn count(&self, language: &str) -> ContentResult<usize> {
        let language = language.to_string();

        let count = self
            .db
            .execute_async(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE language = ?1",
                    [&language],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await?;
        Ok(count)
    }
}

fn read_document(conn: &Connection, section: &str, language: &str) -> Result<Option<ContentDocument>> {
    let row = conn
        .query_row(
            "SELECT body, metadata, created_at, updated_at
             FROM documents WHERE section = ?1 AND language = ?2",
            params![section, language],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .with_context(|| format!("Failed to read document '{}' ({})", section, language))?;

    let Some((body, metadata, created_at, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(ContentDocument {
        section: section.to_string(),
        language: language.to_string(),
        body,
        metadata: parse_metadata(section, &metadata)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    }))
}

fn write_document(conn: &Connection, document: &ContentDocument) -> Result<()> {
    let metadata = serde_json::to_string(&document.metadata)
        .context("Failed to serialize document metadata")?;

    conn.execute(
        r#"
        INSERT INTO documents (section, language, body, metadata, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(section, language) DO UPDATE SET
            body = excluded.body,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at
        "#,
        params![
            document.section,
            document.language,
            document.body,
            metadata,
            format_timestamp(&document.created_at),
            format_timestamp(&document.updated_at),
        ],
    )
    .with_context(|| {
        format!(
            "Failed to write document '{}' ({})",
            document.section, document.language
        )
    })?;
    Ok(())
}

fn parse_metadata(section: &str, raw: &str) -> Result<Metadata> {
    serde_json::from_str(raw)
        .with_context(|| format!("Corrupt metadata stored for section '{}'", section))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid timestamp '{}': {}", raw, e))
}
