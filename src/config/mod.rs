use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Default chat-completion endpoint.
pub const DEFAULT_LLM_API_URL: &str = "https://api.asi1.ai/v1/chat/completions";
/// Default chat-completion model.
pub const DEFAULT_LLM_MODEL: &str = "asi1-mini";
/// Default hosted sentiment model endpoint.
pub const DEFAULT_SENTIMENT_MODEL_URL: &str =
    "https://router.huggingface.co/hf-inference/models/cardiffnlp/twitter-roberta-base-sentiment-latest";
/// Default hosted content-category model endpoint.
pub const DEFAULT_MODERATION_MODEL_URL: &str =
    "https://router.huggingface.co/hf-inference/models/Vrandan/Comment-Moderation";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Chat-completion endpoint settings
    pub llm: LlmConfig,
    /// Text classifier settings
    pub classifier: ClassifierConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer token. `None` makes every call come back empty.
    pub api_key: Option<String>,
    /// Chat-completion endpoint URL
    pub api_url: String,
    /// Model name sent with each request
    pub model: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Sampling temperature, 0.0 to 2.0
    pub temperature: f64,
    /// Completion length cap
    pub max_tokens: u32,
    /// Send system and user prompt as one user message.
    pub combine_prompts: bool,
}

/// Which classifier implementation backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    /// Local keyword classifiers
    Lexicon,
    /// Hosted inference endpoints
    Remote,
}

impl ClassifierBackend {
    /// Get the backend name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierBackend::Lexicon => "lexicon",
            ClassifierBackend::Remote => "remote",
        }
    }
}

impl std::fmt::Display for ClassifierBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Text classifier configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Which implementation to build
    pub backend: ClassifierBackend,
    /// Bearer token for the inference endpoints
    pub hf_token: Option<String>,
    /// Sentiment model endpoint
    pub sentiment_url: String,
    /// Content-category model endpoint
    pub moderation_url: String,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable
    Pretty,
    /// One JSON object per line
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let llm = LlmConfig {
            api_key: var_with_alias("LLM_API_KEY", "ASI1_API_KEY").filter(|k| !k.trim().is_empty()),
            api_url: var_with_alias("LLM_API_URL", "ASI1_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            model: var_with_alias("LLM_MODEL", "ASI1_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout_ms: parse_or("LLM_TIMEOUT_MS", 60_000),
            temperature: parse_or("LLM_TEMPERATURE", 0.5),
            max_tokens: parse_or("LLM_MAX_TOKENS", 768),
            combine_prompts: parse_or("LLM_COMBINE_PROMPTS", true),
        };

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(AppError::Config {
                message: format!(
                    "LLM_TEMPERATURE must be between 0.0 and 2.0, got {}",
                    llm.temperature
                ),
            });
        }

        let classifier = ClassifierConfig {
            backend: match env::var("CLASSIFIER_BACKEND")
                .unwrap_or_else(|_| "lexicon".to_string())
                .to_lowercase()
                .as_str()
            {
                "remote" => ClassifierBackend::Remote,
                _ => ClassifierBackend::Lexicon,
            },
            hf_token: env::var("HF_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            sentiment_url: env::var("SENTIMENT_MODEL_URL")
                .unwrap_or_else(|_| DEFAULT_SENTIMENT_MODEL_URL.to_string()),
            moderation_url: env::var("MODERATION_MODEL_URL")
                .unwrap_or_else(|_| DEFAULT_MODERATION_MODEL_URL.to_string()),
            timeout_ms: parse_or("CLASSIFIER_TIMEOUT_MS", 30_000),
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

        Ok(Config {
            llm,
            classifier,
            logging,
        })
    }
}

fn var_with_alias(primary: &str, alias: &str) -> Option<String> {
    env::var(primary).or_else(|_| env::var(alias)).ok()
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_LLM_API_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout_ms: 60_000,
            temperature: 0.5,
            max_tokens: 768,
            combine_prompts: true,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Lexicon,
            hf_token: None,
            sentiment_url: DEFAULT_SENTIMENT_MODEL_URL.to_string(),
            moderation_url: DEFAULT_MODERATION_MODEL_URL.to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
