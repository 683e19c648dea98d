pub mod agent;
pub mod cli;
pub mod clock;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use agent::ChatAgent;
use cli::Args;
use history::initialize_history_store;
use llm::chat::new_client as new_chat_client;
use llm::LlmConfig;
use log::{ info, warn };
use server::{ AppState, Server };
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    args.validate()?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr());
    info!("Chat Base URL: {}", args.chat_base_url);
    info!("Chat Model: {}", args.chat_model);
    info!("Default Temperature: {}", args.default_temperature);
    info!("Upstream Timeout: {}s", args.request_timeout_secs);
    info!("History Store Type: {}", args.history_type);
    info!("History Limit: {}", args.history_limit);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");
    warn!("Conversations are kept in memory without expiry; they are lost on restart.");

    let clock = clock::system_clock();
    let history_store = initialize_history_store(&args, Arc::clone(&clock))?;
    let llm_config = LlmConfig::from_args(&args);
    let chat_client = new_chat_client(&llm_config)?;
    let agent = Arc::new(
        ChatAgent::with_temperature(chat_client, history_store, llm_config.temperature)
    );

    let addr = args.server_addr();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, AppState::new(agent, clock), args.clone());
    server.run().await?;

    Ok(())
}
