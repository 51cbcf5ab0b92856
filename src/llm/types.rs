use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Message in a chat-completion conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who is speaking
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Stage instructions
    System,
    /// Stage input
    User,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Body of a chat-completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model name
    pub model: String,
    /// Conversation, one or two messages
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: f64,
    /// Always false; the gateway reads one complete body.
    pub stream: bool,
    /// Completion length cap
    pub max_tokens: u32,
}

impl ChatCompletionRequest {
    /// Build a request for a stage prompt pair.
    ///
    /// With `combine_prompts` the system instructions are folded into a single
    /// user message, which some endpoints require.
    pub fn from_prompts(config: &LlmConfig, system_prompt: &str, user_prompt: &str) -> Self {
        let messages = if config.combine_prompts {
            vec![Message::user(format!("{}\n\n{}", system_prompt, user_prompt))]
        } else {
            vec![Message::system(system_prompt), Message::user(user_prompt)]
        };

        Self {
            model: config.model.clone(),
            messages,
            temperature: config.temperature,
            stream: false,
            max_tokens: config.max_tokens,
        }
    }
}

/// Response from a chat-completion endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Model that answered
    #[serde(default)]
    pub model: Option<String>,
    /// Completion choices; only the first is read
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token accounting, when reported
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Assistant message
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    /// Some endpoints put the text directly on the choice.
    #[serde(default)]
    pub content: Option<String>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message inside a choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    /// Usually `assistant`
    #[serde(default)]
    pub role: Option<String>,
    /// Completion text
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: Option<u32>,
    /// Tokens in the completion
    pub completion_tokens: Option<u32>,
    /// Sum of both
    pub total_tokens: Option<u32>,
}

impl ChatCompletionResponse {
    /// Text of the first choice: `message.content`, else `content`.
    ///
    /// Blank text counts as no completion.
    pub fn completion(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .or(choice.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}
