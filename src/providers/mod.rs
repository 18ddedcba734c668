/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported backends:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and OpenAI-compatible servers such as LM Studio
 * - Mock: Deterministic provider used by tests
 */

use async_trait::async_trait;
use log::{debug, warn};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

pub mod mock;
pub mod ollama;
pub mod openai;

/// Common trait for all translation providers
///
/// A provider turns a body in one language into a body in another. It may
/// fail, be slow, or be rate-limited; callers must not assume otherwise.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Translate `text` from `source_language` to `target_language`
    ///
    /// Language arguments are ISO 639-1 codes.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Build the provider selected in the configuration
pub fn create_provider(config: &TranslationConfig) -> anyhow::Result<Arc<dyn Provider>> {
    let policy = RequestPolicy::from_config(config);
    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::from_config(config, policy)?),
        TranslationProvider::OpenAI | TranslationProvider::LMStudio => {
            Arc::new(openai::OpenAI::from_config(config, policy)?)
        }
    };
    debug!(
        "Using {} provider with model {}",
        config.provider.display_name(),
        config.get_model()
    );
    Ok(provider)
}

/// Retry and pacing rules shared by the HTTP providers
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each later one
    pub backoff_base_ms: u64,
    /// Upper bound for a single backoff delay
    pub max_backoff: Duration,
    limiter: Option<Arc<RateLimiter>>,
}

impl RequestPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64, rate_limit: Option<u32>) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            max_backoff: Duration::from_secs(30),
            limiter: rate_limit
                .filter(|per_minute| *per_minute > 0)
                .map(|per_minute| Arc::new(RateLimiter::per_minute(per_minute))),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(
            config.common.retry_count,
            config.common.retry_backoff_ms,
            config.get_rate_limit(),
        )
    }

    /// No retries and no pacing
    pub fn none() -> Self {
        Self::new(0, 0, None)
    }

    fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor)).min(self.max_backoff)
    }

    /// Run `operation`, retrying transient failures with exponential backoff
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.acquire().await;
            }

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{}: succeeded on attempt {}", operation_name, attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for_retry(attempt);
                    warn!(
                        "{}: {} - retry {}/{} in {:?}",
                        operation_name, e, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Spaces requests evenly to stay under a requests-per-minute budget
#[derive(Debug)]
struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn per_minute(requests: u32) -> Self {
        Self {
            interval: Duration::from_millis(60_000 / requests as u64),
            next_slot: Mutex::new(None),
        }
    }

    async fn acquire(&self) {
        let wait_until = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(wait_until).await;
    }
}

/// Map a transport failure to a provider error
pub(crate) fn request_error(service: &str, error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", service, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", service, error))
    }
}

/// Map a non-success HTTP status to a provider error
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Shorten a response body for error messages
pub(crate) fn excerpt(text: &str) -> String {
    if text.chars().count() > 500 {
        format!("{}...", text.chars().take(500).collect::<String>())
    } else {
        text.to_string()
    }
}
