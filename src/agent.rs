use crate::history::HistoryStore;
use crate::llm::chat::{ ChatClient, ChatError, CompletionRequest };
use crate::llm::DEFAULT_TEMPERATURE;
use crate::models::chat::{ ChatMessage, RequestContext };

use log::{ debug, error, info };
use std::collections::hash_map::DefaultHasher;
use std::hash::{ Hash, Hasher };
use std::sync::Arc;
use tokio::sync::{ Mutex, MutexGuard };

const USER_LOCK_STRIPES: usize = 64;

/// Fixed pool of mutexes indexed by user-id hash. Two users may share a
/// stripe; one user always maps to the same stripe.
struct UserLocks {
    stripes: Vec<Mutex<()>>,
}

impl UserLocks {
    fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe_for(&self, user_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        (hasher.finish() as usize) % self.stripes.len()
    }

    async fn lock(&self, user_id: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_for(user_id)].lock().await
    }
}

pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn HistoryStore>,
    default_temperature: f32,
    user_locks: UserLocks,
}

impl ChatAgent {
    pub fn new(chat_client: Arc<dyn ChatClient>, history_store: Arc<dyn HistoryStore>) -> Self {
        Self::with_temperature(chat_client, history_store, DEFAULT_TEMPERATURE)
    }

    pub fn with_temperature(
        chat_client: Arc<dyn ChatClient>,
        history_store: Arc<dyn HistoryStore>,
        default_temperature: f32
    ) -> Self {
        info!(
            "Chat client configured: Model={}, BaseURL={}",
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );
        Self {
            chat_client,
            history_store,
            default_temperature,
            user_locks: UserLocks::new(USER_LOCK_STRIPES),
        }
    }

    pub fn history_store(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.history_store)
    }

    fn build_messages(
        history: Vec<ChatMessage>,
        user_message: &ChatMessage,
        context: &RequestContext
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = context.system_prompt() {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(history);
        messages.push(user_message.clone());
        messages
    }

    /// Runs one conversational turn for `user_id`.
    ///
    /// The history read, the upstream call and both appends happen under the
    /// user's lock, so concurrent turns for one user never interleave. Nothing
    /// is recorded unless the upstream call succeeds, and the system prompt is
    /// never recorded.
    pub async fn generate(
        &self,
        user_id: &str,
        message: &str,
        context: &RequestContext
    ) -> Result<String, ChatError> {
        let _turn = self.user_locks.lock(user_id).await;

        let history = self.history_store.get(user_id).await;
        let user_message = ChatMessage::user(message);
        let messages = Self::build_messages(history, &user_message, context);

        let request = CompletionRequest {
            model: self.chat_client.get_model(),
            messages,
            temperature: context.temperature.unwrap_or(self.default_temperature),
        };
        debug!(
            "Generating reply for {} with {} message(s) of context",
            user_id,
            request.messages.len()
        );

        let reply = self.chat_client.complete(&request).await.map_err(|e| {
            error!("LLM interaction error for {}: {}", user_id, e);
            e
        })?;

        self.history_store.append(user_id, user_message).await?;
        self.history_store.append(user_id, ChatMessage::assistant(reply.clone())).await?;

        Ok(reply)
    }
}
