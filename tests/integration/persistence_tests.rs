/*!
 * Persistence tests.
 *
 * Content and translation memory live in a database file and must survive
 * the manager being dropped and reopened.
 */

use std::sync::Arc;

use anyhow::Result;
use kosge_cms::ContentManager;
use kosge_cms::providers::mock::MockProvider;

use crate::common::{self, NEWS_BODY};

#[tokio::test]
async fn test_reopen_shouldKeepDocumentsAndMemory() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let config = common::on_disk_config(dir.path());
    let provider = MockProvider::working();

    {
        let manager = ContentManager::new(&config, Arc::new(provider.clone()))?;
        manager
            .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
            .await?;
        manager.translate_content("news", "en").await?;
    }
    assert!(dir.path().join("content.db").exists());

    let reopened = ContentManager::new(&config, Arc::new(provider.clone()))?;
    let canonical = reopened.get_content("news", None).await?.unwrap();
    assert_eq!(canonical.body, NEWS_BODY);
    assert_eq!(canonical.title(), Some("Aktuelles"));

    // Losing the stored translation costs nothing while the memory survives
    reopened.delete_content("news", Some("en")).await?;
    reopened.translate_content("news", "en").await?;
    assert_eq!(provider.call_count(), 1);

    let stats = reopened.stats().await?;
    assert_eq!(stats.memory.entries, 1);
    assert_eq!(stats.memory.hits, 1);
    Ok(())
}

#[tokio::test]
async fn test_reopen_withChangedNormalization_shouldStopMatchingOldEntries() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let mut config = common::on_disk_config(dir.path());
    let provider = MockProvider::working();
    let body = "Der Verein trifft sich am Montag.";

    {
        let manager = ContentManager::new(&config, Arc::new(provider.clone()))?;
        manager
            .create_content("news", "Aktuelles", body, Default::default())
            .await?;
        manager.translate_content("news", "en").await?;
    }

    config.fingerprint.ignore_case = true;
    let reopened = ContentManager::new(&config, Arc::new(provider.clone()))?;
    reopened.translate_content("news", "en").await?;

    assert_eq!(provider.call_count(), 2);
    assert_eq!(reopened.stats().await?.memory.entries, 2);
    Ok(())
}

#[tokio::test]
async fn test_stats_shouldCountDocumentsPerLanguage() -> Result<()> {
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let config = common::on_disk_config(dir.path());
    let manager = ContentManager::new(&config, Arc::new(MockProvider::working()))?;

    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await?;
    manager
        .create_content("about", "Über uns", "Wir sind ein Verein.", Default::default())
        .await?;
    manager.translate_content("news", "tr").await?;

    let stats = manager.stats().await?;
    assert_eq!(
        stats.documents,
        vec![
            ("de".to_string(), 2),
            ("en".to_string(), 0),
            ("tr".to_string(), 1),
            ("ar".to_string(), 0),
        ]
    );
    assert_eq!(stats.memory.entries_by_language.get("tr"), Some(&1));
    Ok(())
}
