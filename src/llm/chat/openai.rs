use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::Deserialize;

use super::{ ChatClient, ChatError, CompletionRequest };
use crate::llm::{ LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT };
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 512;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIErrorBody,
}

#[derive(Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ChatError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| ChatError::Serialization(format!("Invalid API key format: {}", e)))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| ChatError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        Self::new(
            &config.api_key,
            Some(config.model.clone()),
            Some(config.base_url.clone()),
            Some(config.timeout),
        )
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }
}

fn transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Transport(format!("request timed out: {}", e))
    } else {
        ChatError::Transport(e.to_string())
    }
}

fn upstream_message(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<OpenAIErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
        let url = self.completions_url();
        let body = serde_json
            ::to_vec(request)
            .map_err(|e| ChatError::Serialization(format!("error encoding request: {}", e)))?;

        debug!(
            "Sending {} message(s) to {} (model={}, temperature={})",
            request.messages.len(),
            url,
            request.model,
            request.temperature
        );

        let resp = self.http.post(&url).body(body).send().await.map_err(transport_error)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = upstream_message(&bytes);
            warn!("Chat completion failed with status {}: {}", status, message);
            return Err(ChatError::Upstream { status: status.as_u16(), message });
        }

        let parsed: OpenAIResponse = serde_json
            ::from_slice(&bytes)
            .map_err(|e| ChatError::Serialization(format!("error decoding response: {}", e)))?;

        let choice = parsed.choices.into_iter().next().ok_or(ChatError::NoChoices)?;
        debug!(
            "Completion {} finished: {}",
            parsed.id.as_deref().unwrap_or("<no id>"),
            choice.finish_reason.as_deref().unwrap_or("unknown")
        );
        Ok(choice.message.content.unwrap_or_default())
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
