use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::clock::{ system_clock, Clock };
use crate::history::{ HistoryError, HistoryStore, DEFAULT_HISTORY_LIMIT };
use crate::models::chat::{ ChatMessage, Conversation };

/// Process-local history store. Nothing is persisted and idle conversations
/// are never expired, so memory grows with the number of distinct users.
pub struct MemoryHistoryStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    limit: usize,
    clock: Arc<dyn Clock>,
}

impl MemoryHistoryStore {
    pub fn new(limit: usize) -> Self {
        Self::with_clock(limit, system_clock())
    }

    pub fn with_clock(limit: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            limit: limit.max(1),
            clock,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Snapshot of the whole conversation, including when it last changed.
    pub async fn conversation(&self, user_id: &str) -> Option<Conversation> {
        self.conversations.read().await.get(user_id).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get(&self, user_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .read().await
            .get(user_id)
            .map(|conv| conv.messages.clone())
            .unwrap_or_default()
    }

    async fn append(&self, user_id: &str, message: ChatMessage) -> Result<(), HistoryError> {
        let now = self.clock.now();
        let mut conversations = self.conversations.write().await;
        let conv = conversations.entry(user_id.to_string()).or_insert_with(|| Conversation {
            user_id: user_id.to_string(),
            messages: Vec::with_capacity(self.limit + 1),
            last_updated: now,
        });

        conv.messages.push(message);
        if conv.messages.len() > self.limit {
            let excess = conv.messages.len() - self.limit;
            conv.messages.drain(..excess);
        }
        conv.last_updated = now;

        debug!("History for {} now holds {} message(s)", user_id, conv.messages.len());
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<(), HistoryError> {
        if self.conversations.write().await.remove(user_id).is_some() {
            debug!("Cleared history for {}", user_id);
        }
        Ok(())
    }
}
