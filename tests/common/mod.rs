/*!
 * Common test utilities for the kosge-cms test suite
 */

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use kosge_cms::app_config::Config;
use kosge_cms::providers::mock::MockProvider;
use kosge_cms::{ContentManager, Metadata, MetadataValue};
use tempfile::TempDir;

/// Route library logs through the test harness
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Configuration with German as canonical and three targets
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.content.canonical_language = "de".to_string();
    config.content.supported_languages = ["de", "en", "tr", "ar"]
        .iter()
        .map(|code| code.to_string())
        .collect();
    config
}

/// Same as `test_config`, but backed by a database file inside `dir`
pub fn on_disk_config(dir: &Path) -> Config {
    let mut config = test_config();
    config.content.database_path = dir.join("content.db").to_string_lossy().into_owned();
    config
}

/// Creates a temporary directory for test databases
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// In-memory manager talking to `provider`
///
/// The provider is cloned; clones share their call counters, so the
/// returned handle observes every call the manager makes.
pub fn manager_with(provider: &MockProvider) -> ContentManager {
    manager_with_config(provider, &test_config())
}

pub fn manager_with_config(provider: &MockProvider, config: &Config) -> ContentManager {
    init_test_logging();
    ContentManager::in_memory(config, Arc::new(provider.clone())).unwrap()
}

/// Build metadata from text pairs
pub fn text_metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), MetadataValue::from(*value)))
        .collect()
}

/// A Markdown body resembling a real section
pub const NEWS_BODY: &str = "# Aktuelles\n\nDer Verein trifft sich am **Montag** im Gemeindehaus.\n\n- Beratung\n- Sprachkurse\n";
