use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};

/// Anything that can answer a stage prompt.
///
/// Implementations must never fail past this boundary: every transport,
/// status or decoding problem is reported as `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send one prompt pair and return the completion text, if any.
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Option<String>;
}

/// Client for an OpenAI-style chat-completion endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new chat-completion client
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Whether an API key is configured
    pub fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Get the endpoint URL (for testing)
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Run a single completion request. No retries are attempted.
    pub async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredentials)?;

        let request = ChatCompletionRequest::from_prompts(&self.config, system_prompt, user_prompt);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Calling chat-completion endpoint"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let completion: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                total_tokens = ?usage.total_tokens,
                "Token usage"
            );
        }

        completion
            .completion()
            .map(str::to_string)
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[async_trait]
impl LlmGateway for LlmClient {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Option<String> {
        let start = Instant::now();

        match self.complete(system_prompt, user_prompt).await {
            Ok(text) => {
                info!(
                    model = %self.config.model,
                    latency_ms = start.elapsed().as_millis(),
                    chars = text.len(),
                    "Chat completion succeeded"
                );
                Some(text)
            }
            Err(LlmError::MissingCredentials) => {
                debug!("No LLM API key configured, skipping call");
                None
            }
            Err(e) => {
                warn!(
                    model = %self.config.model,
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Chat completion failed"
                );
                None
            }
        }
    }
}
