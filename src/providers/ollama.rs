use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::app_config::{TranslationCommonConfig, TranslationConfig};
use crate::errors::ProviderError;

use super::{excerpt, request_error, status_error, Provider, RequestPolicy};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Model used for translations
    model: String,
    /// Prompt template and sampling temperature
    common: TranslationCommonConfig,
    /// Retry and pacing rules
    policy: RequestPolicy,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: None,
        }
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }

    /// Disable streaming
    pub fn no_stream(mut self) -> Self {
        self.stream = Some(false);
        self
    }
}

impl Ollama {
    /// Create a client for an Ollama server
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        timeout: Duration,
        policy: RequestPolicy,
    ) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid Ollama endpoint '{}': {}", endpoint, e))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            // Ollama speaks HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url,
            client,
            model: model.into(),
            common: TranslationCommonConfig::default(),
            policy,
        })
    }

    /// Create a client from the translation configuration
    pub fn from_config(config: &TranslationConfig, policy: RequestPolicy) -> anyhow::Result<Self> {
        let mut client = Self::new(
            &config.get_endpoint(),
            config.get_model(),
            Duration::from_secs(config.get_timeout_secs()),
            policy,
        )?;
        client.common = config.common.clone();
        Ok(client)
    }

    fn api_url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Ollama URL: {}", e)))
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = &self.api_url("api/generate")?;

        self.policy
            .run("Ollama generate", || async move {
                let response = self
                    .client
                    .post(url.clone())
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| request_error("Ollama", e))?;

                let status = response.status();
                let body = response
                    .text()
                    .await
                    .map_err(|e| request_error("Ollama", e))?;

                if !status.is_success() {
                    error!("Ollama API error ({}): {}", status, excerpt(&body));
                    return Err(status_error(status, body));
                }

                parse_generation_response(&body)
            })
            .await
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = self.api_url("api/version")?;
        let response: serde_json::Value = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error("Ollama", e))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Ollama version response: {}", e)))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a generate response, accepting a streamed JSONL body as well
fn parse_generation_response(body: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(response) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(response);
    }

    let chunks: Vec<GenerationResponse> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    if chunks.is_empty() {
        error!("Failed to parse Ollama API response: {}", excerpt(body));
        return Err(ProviderError::ParseError(format!(
            "Ollama returned invalid JSON: {}",
            excerpt(body)
        )));
    }

    debug!("Joining {} streamed Ollama chunks", chunks.len());
    let last = chunks.last();
    Ok(GenerationResponse {
        model: last.map(|c| c.model.clone()).unwrap_or_default(),
        response: chunks.iter().map(|c| c.response.as_str()).collect(),
        done: chunks.iter().any(|c| c.done),
        prompt_eval_count: last.and_then(|c| c.prompt_eval_count),
        eval_count: last.and_then(|c| c.eval_count),
    })
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(&self.model, text)
            .system(self.common.system_prompt(source_language, target_language))
            .temperature(self.common.temperature)
            .no_stream();

        let response = self.generate(&request).await?;
        debug!(
            "Ollama translated {} -> {} ({:?} prompt / {:?} generated tokens)",
            source_language, target_language, response.prompt_eval_count, response.eval_count
        );
        Ok(response.response.trim().to_string())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let version = self.version().await?;
        debug!("Connected to Ollama {}", version);
        Ok(())
    }
}
