use clap::Parser;
use std::error::Error;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Interface the HTTP server binds to.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    // --- Chat LLM Provider Args ---
    /// Bearer credential for the chat completion API.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the OpenAI-compatible API; `/chat/completions` is appended.
    #[arg(long, env = "CHAT_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub chat_base_url: String,

    /// Model name sent with every completion request.
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    /// Sampling temperature used when a request does not override it.
    #[arg(long, env = "DEFAULT_TEMPERATURE", default_value = "0.5")]
    pub default_temperature: f32,

    /// Timeout in seconds for a single upstream completion call.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    // --- History Store Args ---
    /// History chat store type (memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "memory")]
    pub history_type: String,

    /// Maximum number of turns kept per user.
    #[arg(long, env = "HISTORY_LIMIT", default_value = "10")]
    pub history_limit: usize,
}

impl Args {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Checks the settings clap cannot express on its own.
    pub fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.openai_api_key.trim().is_empty() {
            return Err("OPENAI_API_KEY must be set".into());
        }
        Url::parse(&self.chat_base_url)
            .map_err(|e| format!("Invalid CHAT_BASE_URL '{}': {}", self.chat_base_url, e))?;
        if self.history_limit == 0 {
            return Err("HISTORY_LIMIT must be at least 1".into());
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(
                format!(
                    "DEFAULT_TEMPERATURE must be between 0 and 2, got {}",
                    self.default_temperature
                ).into()
            );
        }
        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be greater than 0".into());
        }
        Ok(())
    }
}
