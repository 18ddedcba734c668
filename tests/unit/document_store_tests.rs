/*!
 * Tests for the SQLite document store
 */

use anyhow::Result;
use chrono::{TimeZone, Utc};
use kosge_cms::database::DatabaseConnection;
use kosge_cms::{ContentDocument, DocumentStore, MetadataValue};

use crate::common;

fn create_test_store() -> Result<DocumentStore> {
    Ok(DocumentStore::new(DatabaseConnection::new_in_memory()?))
}

#[tokio::test]
async fn test_put_thenGet_shouldReturnEqualDocument() -> Result<()> {
    let store = create_test_store()?;
    let mut metadata = common::text_metadata(&[("title", "Aktuelles")]);
    metadata.insert("draft".to_string(), MetadataValue::Flag(true));
    metadata.insert(
        "published_at".to_string(),
        MetadataValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
    );

    let stored = store
        .put(ContentDocument::new("news", "de", common::NEWS_BODY, metadata))
        .await?;
    let fetched = store.get("news", "de").await?.expect("document should exist");

    assert_eq!(fetched, stored);
    assert_eq!(fetched.metadata["draft"], MetadataValue::Flag(true));
    assert!(fetched.metadata["published_at"].as_timestamp().is_some());
    Ok(())
}

#[tokio::test]
async fn test_get_withOtherLanguage_shouldReturnNone() -> Result<()> {
    let store = create_test_store()?;
    store
        .put(ContentDocument::new("news", "de", "Text", Default::default()))
        .await?;

    assert!(store.get("news", "en").await?.is_none());
    assert!(store.get("about", "de").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_put_twice_shouldKeepCreatedAtAndAdvanceUpdatedAt() -> Result<()> {
    let store = create_test_store()?;
    let first = store
        .put(ContentDocument::new("news", "de", "Eins", Default::default()))
        .await?;
    let second = store
        .put(ContentDocument::new("news", "de", "Zwei", Default::default()))
        .await?;

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(store.get("news", "de").await?.unwrap().body, "Zwei");
    assert_eq!(store.count("de").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_updateWith_withMissingDocument_shouldNotCallMutator() -> Result<()> {
    let store = create_test_store()?;
    let result = store
        .update_with("news", "de", |_| panic!("mutator must not run"))
        .await?;

    assert!(result.is_none());
    assert_eq!(store.count("de").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_updateWith_shouldNotMoveDocumentToOtherKey() -> Result<()> {
    let store = create_test_store()?;
    store
        .put(ContentDocument::new("news", "de", "Text", Default::default()))
        .await?;

    let updated = store
        .update_with("news", "de", |document| {
            document.section = "elsewhere".to_string();
            document.language = "en".to_string();
            document.body = "Neu".to_string();
        })
        .await?
        .unwrap();

    assert_eq!(updated.section, "news");
    assert_eq!(updated.language, "de");
    assert!(store.get("elsewhere", "en").await?.is_none());
    assert_eq!(store.get("news", "de").await?.unwrap().body, "Neu");
    Ok(())
}

#[tokio::test]
async fn test_delete_shouldRemoveOnlyOneLanguage() -> Result<()> {
    let store = create_test_store()?;
    store
        .put(ContentDocument::new("news", "de", "Text", Default::default()))
        .await?;
    store
        .put(ContentDocument::new("news", "en", "Text", Default::default()))
        .await?;

    assert!(store.delete("news", "en").await?);
    assert!(!store.delete("news", "en").await?);
    assert!(store.get("news", "de").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_list_shouldOrderBySectionWithinLanguage() -> Result<()> {
    let store = create_test_store()?;
    for section in ["vorstand", "about", "news"] {
        store
            .put(ContentDocument::new(
                section,
                "de",
                "Text",
                common::text_metadata(&[("title", section)]),
            ))
            .await?;
    }
    store
        .put(ContentDocument::new("extra", "en", "Text", Default::default()))
        .await?;

    let sections: Vec<String> = store
        .list("de")
        .await?
        .into_iter()
        .map(|summary| summary.section)
        .collect();

    assert_eq!(sections, vec!["about", "news", "vorstand"]);
    assert_eq!(store.list("en").await?.len(), 1);
    assert!(store.list("tr").await?.is_empty());
    Ok(())
}
