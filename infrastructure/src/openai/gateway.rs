//! OpenAI-compatible LLM gateway

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ErrorResponse};
use async_trait::async_trait;
use std::time::Duration;
use toolrouter_application::{ChatRequest, ChatResponse, GatewayError, LlmGateway};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Connection settings for the chat completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key_env: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(120),
            temperature: Some(0.0),
        }
    }
}

/// LLM gateway for OpenAI-compatible chat completion APIs
pub struct OpenAiGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: Option<f32>,
}

impl OpenAiGateway {
    /// Create a gateway reading the API key from the configured variable.
    pub fn from_env(settings: &OpenAiSettings) -> Result<Self, GatewayError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GatewayError::MissingApiKey(settings.api_key_env.clone()))?;
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(
        settings: &OpenAiSettings,
        api_key: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        info!("OpenAiGateway initialized ({})", settings.base_url);

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            temperature: settings.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionError(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        request
            .model
            .ensure_supported()
            .map_err(|e| GatewayError::ModelNotAvailable(e.to_string()))?;

        let body = ChatCompletionRequest::from_chat(&request, self.temperature);
        debug!(
            "chat: model={} messages={} tools={}",
            body.model,
            body.messages.len(),
            body.tools.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(match status.as_u16() {
                404 => GatewayError::ModelNotAvailable(message),
                _ => GatewayError::RequestFailed(format!(
                    "HTTP {} {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown"),
                    message
                )),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        parsed.into_chat_response()
    }
}
