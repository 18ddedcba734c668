/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use kosge_cms::app_config::{Config, FingerprintConfig, TranslationProvider};

use crate::common;

/// Test that a missing config file is created with the defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.content.canonical_language, "de");
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);

    // A second load reads the file that was just written
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.content.supported_languages, config.content.supported_languages);
    Ok(())
}

/// Test that omitted sections fall back to their defaults
#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "content": { "canonical_language": "en", "supported_languages": ["en", "fr"] } }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.content.canonical_language, "en");
    assert_eq!(config.content.database_path, "");
    assert_eq!(config.fingerprint, FingerprintConfig::default());
    assert!(config.translation.common.coalesce_concurrent_misses);
    config.validate()?;
    Ok(())
}

/// Test that malformed JSON is reported instead of silently replaced
#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json")?;

    let error = Config::load_or_create(&path).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_validate_withOnlyCanonicalLanguage_shouldFail() {
    let mut config = common::test_config();
    config.content.supported_languages = vec!["de".to_string()];
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withUnknownLanguage_shouldFail() {
    let mut config = common::test_config();
    config.content.supported_languages.push("klingon".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withOpenAiAndNoKey_shouldFail() {
    let mut config = common::test_config();
    config.translation.provider = TranslationProvider::OpenAI;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withTemperatureOutOfRange_shouldFail() {
    let mut config = common::test_config();
    config.translation.common.temperature = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_fingerprintConfig_defaults_shouldCollapseWhitespaceOnly() {
    let defaults = FingerprintConfig::default();
    assert!(defaults.collapse_whitespace);
    assert!(!defaults.ignore_case);

    let raw = FingerprintConfig::raw();
    assert!(!raw.collapse_whitespace);
    assert!(!raw.ignore_case);
}
