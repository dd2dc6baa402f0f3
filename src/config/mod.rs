use std::env;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub store: StoreConfig,
}

/// Model backend configuration.
///
/// The orchestrators only pass capability hints; the port maps a hint to
/// one of the concrete model ids configured here.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model resolved for the `chat` capability hint.
    pub chat_model: String,
    /// Model resolved for the `reasoning` capability hint.
    pub reasoning_model: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// In-memory session store limits.
///
/// `ttl_secs = 0` disables TTL eviction; `capacity` bounds the number of
/// live chains/sessions per store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let model = ModelConfig {
            api_key: env::var("MODEL_API_KEY").map_err(|_| AppError::Config {
                message: "MODEL_API_KEY is required".to_string(),
            })?,
            base_url: env::var("MODEL_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            chat_model: env::var("MODEL_CHAT").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            reasoning_model: env::var("MODEL_REASONING").unwrap_or_else(|_| "gpt-4o".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let store = StoreConfig {
            ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            capacity: env::var("SESSION_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(256),
        };

        Ok(Config {
            model,
            logging,
            request,
            store,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            capacity: 256,
        }
    }
}
