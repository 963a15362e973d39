use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Fallback system prompt for the thinking collaborator.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful desk assistant. Reply \
to the user's spoken question in one or two short sentences suitable for \
text-to-speech.";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub streaming_api_key: String,
    pub streaming_token_url: String,
    pub token_ttl_seconds: u32,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub chat_model: String,
    pub thinker_system_prompt: String,
    pub logs_dir: PathBuf,
    pub allowed_origin: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let streaming_api_key = std::env::var("STREAMING_API_KEY")
            .map_err(|_| ConfigError::MissingVar("STREAMING_API_KEY".to_string()))?;

        let streaming_token_url = std::env::var("STREAMING_TOKEN_URL")
            .unwrap_or_else(|_| "https://streaming.assemblyai.com/v3/token".to_string());

        // Upstream accepts 1-600 seconds.
        let token_ttl_str =
            std::env::var("TOKEN_TTL_SECONDS").unwrap_or_else(|_| "600".to_string());
        let token_ttl_seconds = token_ttl_str
            .parse::<u32>()
            .ok()
            .filter(|ttl| (1..=600).contains(ttl))
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TOKEN_TTL_SECONDS".to_string(),
                    format!("'{}' is not a number in 1..=600", token_ttl_str),
                )
            })?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let thinker_system_prompt = std::env::var("THINKER_SYSTEM_PROMPT")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

        let logs_dir = std::env::var("LOGS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"));

        let allowed_origin = std::env::var("CORS_ALLOW_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            streaming_api_key,
            streaming_token_url,
            token_ttl_seconds,
            openai_api_key,
            openai_api_base,
            chat_model,
            thinker_system_prompt,
            logs_dir,
            allowed_origin,
            log_level,
        })
    }
}
