mod memory;

pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::clock::Clock;
use crate::models::chat::ChatMessage;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// Per-user bounded message log. Implementations own their conversations;
/// callers only ever receive copies.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Current history for `user_id`, oldest first. Empty if the user is unknown.
    async fn get(&self, user_id: &str) -> Vec<ChatMessage>;

    /// Appends one message, creating the conversation on first use and
    /// dropping the oldest turns beyond the store's limit.
    async fn append(&self, user_id: &str, message: ChatMessage) -> Result<(), HistoryError>;

    /// Removes the user's conversation. Clearing an unknown user is not an error.
    async fn clear(&self, user_id: &str) -> Result<(), HistoryError>;
}

pub fn create_history_store(
    args: &Args,
    clock: Arc<dyn Clock>
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "memory" => {
            let store = MemoryHistoryStore::with_clock(args.history_limit, clock);
            Ok(Arc::new(store))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &Args,
    clock: Arc<dyn Clock>
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    info!(
        "Chat history will be stored in: {} (last {} turns per user)",
        args.history_type,
        args.history_limit
    );
    create_history_store(args, clock)
}
