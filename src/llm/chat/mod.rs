pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use super::LlmConfig;
use self::openai::OpenAIChatClient;
use crate::history::HistoryError;
use crate::models::chat::ChatMessage;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
    },
    #[error("no response from upstream: completion contained no choices")]
    NoChoices,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("failed to record conversation: {0}")]
    History(#[from] HistoryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one completion request and returns the first choice's content.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
