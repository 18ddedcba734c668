/*!
 * Error types for the content store.
 *
 * This module contains custom error types for the provider boundary and
 * for the content operations exposed to callers, using the thiserror crate
 * for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered successfully but without any translated text
    #[error("Provider returned an empty translation")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) | Self::EmptyResponse => false,
        }
    }
}

/// Errors surfaced by content operations
#[derive(Error, Debug)]
pub enum ContentError {
    /// The requested document does not exist
    #[error("Content not found: section '{section}' in language '{language}'")]
    NotFound {
        /// Section identifier
        section: String,
        /// Language code
        language: String,
    },

    /// Caller supplied invalid input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// The translation provider failed; nothing was written
    #[error("Translation failed: {0}")]
    TranslationFailed(#[from] ProviderError),

    /// The underlying storage rejected a read or write
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),
}

impl ContentError {
    /// Build a not-found error for a (section, language) pair
    pub fn not_found(section: &str, language: &str) -> Self {
        Self::NotFound {
            section: section.to_string(),
            language: language.to_string(),
        }
    }

    /// Build a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<anyhow::Error> for ContentError {
    fn from(error: anyhow::Error) -> Self {
        Self::PersistenceFailed(format!("{:#}", error))
    }
}

impl From<rusqlite::Error> for ContentError {
    fn from(error: rusqlite::Error) -> Self {
        Self::PersistenceFailed(error.to_string())
    }
}

/// Result alias for content operations
pub type ContentResult<T> = std::result::Result<T, ContentError>;
