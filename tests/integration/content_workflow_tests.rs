/*!
 * Integration tests for content workflows.
 *
 * Everything goes through the content manager with a counting mock
 * provider, so each test can assert exactly how often translation was paid for.
 */

use kosge_cms::app_config::FingerprintConfig;
use kosge_cms::providers::mock::MockProvider;
use kosge_cms::{ContentError, MetadataValue};

use crate::common::{self, NEWS_BODY};

#[tokio::test]
async fn test_createThenGet_shouldRoundTripBodyAndMetadata() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    let metadata = common::text_metadata(&[("author", "Vorstand")]);

    let created = manager
        .create_content("news", "Aktuelles", NEWS_BODY, metadata)
        .await
        .unwrap();
    let fetched = manager.get_content("news", None).await.unwrap().unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.language, "de");
    assert_eq!(fetched.body, NEWS_BODY);
    assert_eq!(fetched.title(), Some("Aktuelles"));
    assert_eq!(fetched.metadata["author"].as_text(), Some("Vorstand"));
    assert!(!fetched.is_translation());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translateTwice_withUnchangedCanonical_shouldCallProviderOnce() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    let first = manager.translate_content("news", "en").await.unwrap();
    let second = manager.translate_content("news", "en").await.unwrap();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(first.body, second.body);
    assert_eq!(first.body, format!("[en] {}", NEWS_BODY));
    assert_eq!(second.translated_from(), Some("de"));
    assert_eq!(second.title(), Some("Aktuelles"));

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.memory.entries, 1);
    assert_eq!(stats.memory.hits, 1);
    assert_eq!(stats.memory.misses, 1);
}

#[tokio::test]
async fn test_translate_afterCanonicalUpdate_shouldTranslateNewBody() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", "Alter Text", Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    assert!(manager
        .update_content("news", "Neuer Text", Default::default(), None)
        .await
        .unwrap());
    let translated = manager.translate_content("news", "en").await.unwrap();

    assert_eq!(provider.call_count(), 2);
    assert_eq!(translated.body, "[en] Neuer Text");
}

#[tokio::test]
async fn test_translate_withWhitespaceOnlyChange_shouldReuseMemory() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", "Der Verein  trifft sich.", Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    manager
        .update_content("news", "Der Verein trifft sich.\n", Default::default(), None)
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_translate_afterListJoinedIntoOneLine_shouldTranslateAgain() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", "- Beratung\n- Sprachkurse", Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    manager
        .update_content("news", "- Beratung - Sprachkurse", Default::default(), None)
        .await
        .unwrap();
    let translated = manager.translate_content("news", "en").await.unwrap();

    assert_eq!(provider.call_count(), 2);
    assert_eq!(translated.body, "[en] - Beratung - Sprachkurse");
}

#[tokio::test]
async fn test_renderContent_shouldIncludeHtmlOfStoredBody() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    let canonical = manager.render_content("news", None).await.unwrap().unwrap();
    assert_eq!(canonical.document.body, NEWS_BODY);
    assert!(canonical.html.contains("<h1>Aktuelles</h1>"));
    assert!(canonical.html.contains("<strong>Montag</strong>"));
    assert!(canonical.html.contains("<li>Sprachkurse</li>"));

    let english = manager.render_content("news", Some("en")).await.unwrap().unwrap();
    assert!(english.html.starts_with("<p>[en] # Aktuelles</p>"));

    assert!(manager.render_content("about", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_translate_withRawFingerprints_shouldTreatWhitespaceAsChange() {
    let provider = MockProvider::working();
    let mut config = common::test_config();
    config.fingerprint = FingerprintConfig::raw();
    let manager = common::manager_with_config(&provider, &config);
    manager
        .create_content("news", "Aktuelles", "Der Verein trifft sich.", Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    manager
        .update_content("news", "Der Verein trifft sich. ", Default::default(), None)
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();

    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_updateContent_shouldMergeMetadataShallowly() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    let created = manager
        .create_content(
            "news",
            "Aktuelles",
            NEWS_BODY,
            common::text_metadata(&[("a", "0"), ("b", "2")]),
        )
        .await
        .unwrap();

    let updated = manager
        .update_content("news", "Neu", common::text_metadata(&[("a", "1")]), None)
        .await
        .unwrap();
    let document = manager.get_content("news", None).await.unwrap().unwrap();

    assert!(updated);
    assert_eq!(document.body, "Neu");
    assert_eq!(document.metadata["a"].as_text(), Some("1"));
    assert_eq!(document.metadata["b"].as_text(), Some("2"));
    assert_eq!(document.title(), Some("Aktuelles"));
    assert_eq!(document.created_at, created.created_at);
    assert!(document.updated_at >= created.updated_at);
}

#[tokio::test]
async fn test_updateContent_withMissingCanonical_shouldReturnFalse() {
    let manager = common::manager_with(&MockProvider::working());

    let updated = manager
        .update_content("news", "Text", Default::default(), None)
        .await
        .unwrap();

    assert!(!updated);
    assert!(manager.get_content("news", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_updateContent_withLanguage_shouldCreateHandWrittenVariant() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    assert!(manager
        .update_content("news", "Handmade news", Default::default(), Some("en"))
        .await
        .unwrap());

    let variant = manager.get_content("news", Some("en")).await.unwrap().unwrap();
    assert_eq!(variant.body, "Handmade news");
    assert_eq!(variant.title(), Some("Aktuelles"));
    assert!(!variant.is_translation());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_deleteContent_shouldLeaveOtherLanguagesAndMemory() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "en").await.unwrap();
    manager.translate_content("news", "tr").await.unwrap();

    assert!(manager.delete_content("news", Some("en")).await.unwrap());
    assert!(!manager.delete_content("news", Some("en")).await.unwrap());

    assert!(manager.get_content("news", Some("en")).await.unwrap().is_none());
    assert!(manager.get_content("news", None).await.unwrap().is_some());
    assert!(manager.get_content("news", Some("tr")).await.unwrap().is_some());

    // The memory entry survives, so translating again is free
    let restored = manager.translate_content("news", "en").await.unwrap();
    assert_eq!(provider.call_count(), 2);
    assert_eq!(restored.body, format!("[en] {}", NEWS_BODY));
}

#[tokio::test]
async fn test_translate_afterTranslationDeleted_shouldSelfHealFromMemory() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();
    manager.translate_content("news", "ar").await.unwrap();
    manager.delete_content("news", Some("ar")).await.unwrap();

    manager.translate_content("news", "ar").await.unwrap();

    assert_eq!(provider.call_count(), 1);
    assert!(manager.get_content("news", Some("ar")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_translate_withFailingProvider_shouldWriteNothing() {
    let provider = MockProvider::failing();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    let error = manager.translate_content("news", "en").await.unwrap_err();

    assert!(matches!(error, ContentError::TranslationFailed(_)));
    assert!(manager.get_content("news", Some("en")).await.unwrap().is_none());
    assert_eq!(manager.stats().await.unwrap().memory.entries, 0);
}

#[tokio::test]
async fn test_translate_withEmptyProviderResponse_shouldFail() {
    let provider = MockProvider::empty();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    let error = manager.translate_content("news", "en").await.unwrap_err();

    assert!(matches!(error, ContentError::TranslationFailed(_)));
    assert!(manager.get_content("news", Some("en")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_translate_withMissingCanonical_shouldReturnNotFound() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);

    let error = manager.translate_content("news", "en").await.unwrap_err();

    assert!(matches!(error, ContentError::NotFound { .. }));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_operations_withInvalidInput_shouldFailValidation() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    let errors = vec![
        manager.create_content("", "Titel", "Text", Default::default()).await.unwrap_err(),
        manager.create_content("news", " ", "Text", Default::default()).await.unwrap_err(),
        manager.create_content("news", "Titel", "", Default::default()).await.unwrap_err(),
        manager.get_content("news", Some("fr")).await.unwrap_err(),
        manager.translate_content("news", "fr").await.unwrap_err(),
        manager.translate_content("news", "de").await.unwrap_err(),
        manager.list_sections(Some("xx")).await.unwrap_err(),
    ];

    for error in errors {
        assert!(matches!(error, ContentError::Validation(_)), "unexpected: {:?}", error);
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translateAll_shouldTranslateEveryTarget() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    let outcomes = manager.translate_all("news").await.unwrap();

    let mut languages: Vec<&str> = outcomes.iter().map(|o| o.language.as_str()).collect();
    languages.sort_unstable();
    assert_eq!(languages, vec!["ar", "en", "tr"]);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(provider.call_count(), 3);

    for summary in ["en", "tr", "ar"] {
        assert_eq!(manager.list_sections(Some(summary)).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_translateAll_withIntermittentProvider_shouldReportEachLanguage() {
    let provider = MockProvider::intermittent(2);
    let manager = common::manager_with(&provider);
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();

    let outcomes = manager.translate_all("news").await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(provider.call_count(), 3);
    // Only the second call fails
    let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    assert_eq!(failed.len(), 1);
    for outcome in &outcomes {
        let stored = manager
            .get_content("news", Some(&outcome.language))
            .await
            .unwrap();
        assert_eq!(stored.is_some(), outcome.result.is_ok());
    }
}

#[tokio::test]
async fn test_translateAll_withMissingCanonical_shouldFailUpFront() {
    let provider = MockProvider::working();
    let manager = common::manager_with(&provider);

    let error = manager.translate_all("news").await.unwrap_err();

    assert!(matches!(error, ContentError::NotFound { .. }));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_listSections_shouldIncludeTitles() {
    let manager = common::manager_with(&MockProvider::working());
    manager
        .create_content("news", "Aktuelles", NEWS_BODY, Default::default())
        .await
        .unwrap();
    manager
        .create_content("about", "Über uns", "Wir sind ein Verein.", Default::default())
        .await
        .unwrap();

    let sections = manager.list_sections(None).await.unwrap();

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].section, "about");
    assert_eq!(
        sections[0].metadata.get("title"),
        Some(&MetadataValue::from("Über uns"))
    );
}

#[tokio::test]
async fn test_languageConfig_shouldDescribeEverySupportedLanguage() {
    let manager = common::manager_with(&MockProvider::working());

    let config = manager.language_config();

    assert_eq!(config.default_language, "de");
    assert_eq!(config.available_languages.len(), 4);
    assert_eq!(config.available_languages["de"].file, "index.html");
    assert_eq!(config.available_languages["tr"].file, "lang/tr.html");

    let turkish = manager
        .languages()
        .into_iter()
        .find(|language| language.code == "tr")
        .unwrap();
    assert_eq!(config.available_languages["tr"].name, turkish.native_name.to_lowercase());
    assert_eq!(config.available_languages["tr"].flag, turkish.flag);
}
