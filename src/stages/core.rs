//! Core infrastructure shared by the LLM-backed stages.
//!
//! [`StageCore`] holds the LLM gateway and runs the call-then-decode step
//! every stage performs, logging why a stage is about to fall back.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::CodecResult;
use crate::llm::LlmGateway;

/// Shared dependencies for the LLM-backed stages.
///
/// # Example
///
/// ```ignore
/// pub struct MyStage {
///     core: StageCore,
/// }
///
/// impl MyStage {
///     pub async fn process(&self, input: &str) -> MyResult {
///         self.core
///             .request("my_stage", MY_PROMPT, input, codec::decode)
///             .await
///             .unwrap_or_else(MyResult::fallback)
///     }
/// }
/// ```
#[derive(Clone)]
pub struct StageCore {
    llm: Arc<dyn LlmGateway>,
}

impl StageCore {
    /// Create a new stage core around an LLM gateway.
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }

    /// Get a reference to the LLM gateway.
    #[inline]
    pub fn llm(&self) -> &dyn LlmGateway {
        self.llm.as_ref()
    }

    /// Call the model and decode its answer.
    ///
    /// Returns `None` when the gateway produced nothing or the payload did
    /// not decode; both cases are logged at `warn` with the stage name.
    pub async fn request<T, F>(
        &self,
        stage: &'static str,
        system_prompt: &str,
        user_prompt: &str,
        decode: F,
    ) -> Option<T>
    where
        F: FnOnce(&str) -> CodecResult<T>,
    {
        let start = Instant::now();

        let Some(completion) = self.llm.call(system_prompt, user_prompt).await else {
            warn!(
                stage,
                latency_ms = start.elapsed().as_millis(),
                "LLM returned no result, using fallback"
            );
            return None;
        };

        match decode(&completion) {
            Ok(payload) => {
                debug!(
                    stage,
                    latency_ms = start.elapsed().as_millis(),
                    "Stage payload decoded"
                );
                Some(payload)
            }
            Err(e) => {
                warn!(
                    stage,
                    error = %e,
                    preview = %completion.chars().take(120).collect::<String>(),
                    "Failed to decode stage payload, using fallback"
                );
                None
            }
        }
    }
}
