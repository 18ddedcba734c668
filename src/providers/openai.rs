/*!
 * OpenAI chat completions client.
 *
 * Also serves OpenAI-compatible local servers such as LM Studio, which take
 * the same request shape and usually no API key.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::app_config::{TranslationCommonConfig, TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

use super::{excerpt, request_error, status_error, Provider, RequestPolicy};

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Reasoning models reject the temperature parameter
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Client for OpenAI-compatible chat completion APIs
#[derive(Debug)]
pub struct OpenAI {
    name: String,
    completions_url: Url,
    models_url: Url,
    api_key: String,
    model: String,
    common: TranslationCommonConfig,
    client: Client,
    policy: RequestPolicy,
}

impl OpenAI {
    /// Create a client; `endpoint` is the API base such as `https://api.openai.com/v1`
    pub fn new(
        name: impl Into<String>,
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        policy: RequestPolicy,
    ) -> anyhow::Result<Self> {
        let base = endpoint.trim_end_matches('/');
        let completions_url = Url::parse(&format!("{}/chat/completions", base))
            .map_err(|e| anyhow::anyhow!("Invalid endpoint '{}': {}", endpoint, e))?;
        let models_url = Url::parse(&format!("{}/models", base))
            .map_err(|e| anyhow::anyhow!("Invalid endpoint '{}': {}", endpoint, e))?;

        Ok(Self {
            name: name.into(),
            completions_url,
            models_url,
            api_key: api_key.into(),
            model: model.into(),
            common: TranslationCommonConfig::default(),
            client: Client::builder().timeout(timeout).build()?,
            policy,
        })
    }

    /// Create a client for the active OpenAI or LM Studio configuration
    pub fn from_config(config: &TranslationConfig, policy: RequestPolicy) -> anyhow::Result<Self> {
        let name = match config.provider {
            TranslationProvider::LMStudio => "lmstudio",
            _ => "openai",
        };
        let mut client = Self::new(
            name,
            &config.get_endpoint(),
            config.get_api_key(),
            config.get_model(),
            Duration::from_secs(config.get_timeout_secs()),
            policy,
        )?;
        client.common = config.common.clone();
        Ok(client)
    }

    fn build_request(&self, text: &str, source_language: &str, target_language: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: self.common.system_prompt(source_language, target_language),
                },
                Message {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: if is_reasoning_model(&self.model) {
                None
            } else {
                Some(self.common.temperature)
            },
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }

    /// Send a chat completion request and return the first choice
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let service = self.name.as_str();

        self.policy
            .run(&format!("{} completion", service), || async move {
                let response = self
                    .authorized(self.client.post(self.completions_url.clone()))
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| request_error(service, e))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    error!("{} API error ({}): {}", service, status, excerpt(&body));
                    return Err(status_error(status, body));
                }

                let chat: ChatResponse = response.json().await.map_err(|e| {
                    ProviderError::ParseError(format!("{} completion response: {}", service, e))
                })?;

                chat.choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| {
                        ProviderError::ParseError(format!("{} response contained no choices", service))
                    })
            })
            .await
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let request = self.build_request(text, source_language, target_language);
        let translated = self.complete(&request).await?;
        debug!(
            "{} translated {} -> {} ({} chars)",
            self.name,
            source_language,
            target_language,
            translated.chars().count()
        );
        Ok(translated.trim().to_string())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self
            .authorized(self.client.get(self.models_url.clone()))
            .send()
            .await
            .map_err(|e| request_error(&self.name, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }
}
