use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// LLM client could not be built
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Classifier could not be built
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Chat-completion gateway errors.
///
/// These never leave [`crate::llm::LlmGateway::call`]; they exist so the
/// client can log precisely why a stage is about to fall back.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured
    #[error("No API key configured for the chat-completion endpoint")]
    MissingCredentials,

    /// Non-success HTTP status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Body was not a chat-completion response
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Parse failure detail
        message: String,
    },

    /// No choice carried any text
    #[error("Completion contained no content")]
    EmptyCompletion,

    /// Request timed out
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout
        timeout_ms: u64,
    },

    /// Transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Text classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Classifier construction failed
    #[error("Classifier {name} failed to build: {message}")]
    Build {
        /// Classifier name
        name: String,
        /// Failure detail
        message: String,
    },

    /// Non-success HTTP status from the inference endpoint
    #[error("Inference API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Output was not a label/score list
    #[error("Unexpected inference output: {message}")]
    InvalidOutput {
        /// Parse failure detail
        message: String,
    },

    /// Classification timed out
    #[error("Classification timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout
        timeout_ms: u64,
    },

    /// Transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while extracting or validating a stage payload
#[derive(Debug, Error)]
pub enum CodecError {
    /// Nothing to decode
    #[error("Empty completion")]
    Empty,

    /// Extracted text is not valid JSON for the target type
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parsed but has the wrong shape
    #[error("Schema validation failed: {field} - {reason}")]
    Validation {
        /// Offending field, `$` for the root
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Stdio front-end errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Not a valid JSON-RPC request
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request
        message: String,
    },

    /// Method is not served
    #[error("Unknown method: {method}")]
    UnknownMethod {
        /// Requested method
        method: String,
    },

    /// Params do not match the method
    #[error("Invalid parameters for {method}: {message}")]
    InvalidParameters {
        /// Requested method
        method: String,
        /// Deserialization failure detail
        message: String,
    },

    /// Result could not be serialized
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for chat-completion calls
pub type LlmResult<T> = Result<T, LlmError>;

/// Result type alias for classifier calls
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Result type alias for payload decoding
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type alias for the stdio front-end
pub type ServerResult<T> = Result<T, ServerError>;
