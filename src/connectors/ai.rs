use super::errors::{ensure_success, ConnectorError};
use crate::configuration::{AiProviderType, AiSettings};
use async_trait::async_trait;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Default OpenAI-compatible endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default Anthropic endpoint.
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Default Ollama endpoint.
pub const OLLAMA_API_URL: &str = "http://localhost:11434/api/chat";

/// Default request timeout in seconds.
const DEFAULT_AI_TIMEOUT_SECS: u64 = 300;

/// Default model per provider when none is configured.
pub fn default_model(provider: AiProviderType) -> &'static str {
    match provider {
        AiProviderType::Openai => "gpt-4o-mini",
        AiProviderType::Anthropic => "claude-3-5-haiku-latest",
        AiProviderType::Ollama => "llama3",
        AiProviderType::Custom => "default",
    }
}

/// Resolve the request timeout in seconds.
///
/// Priority: `CLOUDCOST_AI_TIMEOUT` env var > configured value > 300s default.
pub fn resolve_timeout(config_timeout: u64) -> u64 {
    if let Ok(val) = std::env::var("CLOUDCOST_AI_TIMEOUT") {
        if let Ok(secs) = val.parse::<u64>() {
            if secs > 0 {
                return secs;
            }
        }
    }
    if config_timeout > 0 {
        config_timeout
    } else {
        DEFAULT_AI_TIMEOUT_SECS
    }
}

/// Normalise a user-supplied Ollama endpoint.
///
/// If the URL has no `/api/` path component (e.g. `http://host:11434`)
/// the standard chat path `/api/chat` is appended.
pub fn normalize_ollama_endpoint(endpoint: &str) -> String {
    if endpoint.contains("/api/") {
        endpoint.to_string()
    } else {
        format!("{}/api/chat", endpoint.trim_end_matches('/'))
    }
}

fn build_client(provider: &str, timeout_secs: u64) -> Result<reqwest::Client, ConnectorError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConnectorError::Internal(format!("{provider}: failed to build HTTP client: {e}")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AiProvider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Text-generation backend used to turn free text into requirement JSON.
///
/// Production: `OpenAiProvider`, `AnthropicProvider`, `OllamaProvider`.
/// Tests: canned responses.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name for error reporting.
    fn name(&self) -> &str;

    /// Send a single-turn completion and return the raw response text.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, ConnectorError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OpenAiProvider: OpenAI / OpenAI-compatible APIs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Calls the OpenAI Chat Completions API (or any compatible endpoint).
pub struct OpenAiProvider {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn from_settings(settings: &AiSettings) -> Result<Self, ConnectorError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            ConnectorError::Internal("api_key is required for the openai provider".to_string())
        })?;

        Ok(Self {
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| OPENAI_API_URL.to_string()),
            api_key,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| default_model(settings.provider).to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            http_client: build_client("openai", resolve_timeout(settings.timeout))?,
        })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, ConnectorError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let json: serde_json::Value = ensure_success(response).await?.json().await?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ConnectorError::InvalidResponse("openai: no content in response".to_string()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AnthropicProvider: Claude API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Calls the Anthropic Messages API.
pub struct AnthropicProvider {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    http_client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_settings(settings: &AiSettings) -> Result<Self, ConnectorError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            ConnectorError::Internal("api_key is required for the anthropic provider".to_string())
        })?;

        Ok(Self {
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            api_key,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| default_model(AiProviderType::Anthropic).to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            http_client: build_client("anthropic", resolve_timeout(settings.timeout))?,
        })
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, ConnectorError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": system,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;
        let json: serde_json::Value = ensure_success(response).await?.json().await?;

        json["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ConnectorError::InvalidResponse("anthropic: no content in response".to_string())
            })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OllamaProvider: local Ollama instance
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Calls an Ollama chat API. No API key required.
pub struct OllamaProvider {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    pub fn from_settings(settings: &AiSettings) -> Result<Self, ConnectorError> {
        Ok(Self {
            endpoint: settings
                .endpoint
                .as_deref()
                .map(normalize_ollama_endpoint)
                .unwrap_or_else(|| OLLAMA_API_URL.to_string()),
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| default_model(AiProviderType::Ollama).to_string()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            http_client: build_client("ollama", resolve_timeout(settings.timeout))?,
        })
    }
}

#[async_trait]
impl AiProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, ConnectorError> {
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens
            },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?;
        let json: serde_json::Value = ensure_success(response).await?.json().await?;

        json["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ConnectorError::InvalidResponse("ollama: no content in response".to_string()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider factory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn create_provider(settings: &AiSettings) -> Result<Box<dyn AiProvider>, ConnectorError> {
    match settings.provider {
        AiProviderType::Openai | AiProviderType::Custom => {
            Ok(Box::new(OpenAiProvider::from_settings(settings)?))
        }
        AiProviderType::Anthropic => Ok(Box::new(AnthropicProvider::from_settings(settings)?)),
        AiProviderType::Ollama => Ok(Box::new(OllamaProvider::from_settings(settings)?)),
    }
}
