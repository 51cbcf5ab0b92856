use std::sync::Arc;
use tracing::{debug, info};

use super::{serialize_for_log, StageCore};
use crate::codec;
use crate::llm::LlmGateway;
use crate::models::{AnalysisResult, Message, ModerationResult};
use crate::prompts::{moderation_prompt, MODERATOR_PROMPT};

/// Moderate stage handler
#[derive(Clone)]
pub struct ModerateStage {
    core: StageCore,
}

impl ModerateStage {
    /// Create a new moderate stage
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            core: StageCore::new(llm),
        }
    }

    /// Decide approve / flag / block from the analysis.
    ///
    /// Any LLM or decoding failure yields [`ModerationResult::fallback`],
    /// which flags the message for review.
    pub async fn process(&self, message: &Message, analysis: &AnalysisResult) -> ModerationResult {
        let result = self
            .core
            .request(
                "moderate",
                MODERATOR_PROMPT,
                &moderation_prompt(analysis),
                codec::decode::<ModerationResult>,
            )
            .await
            .unwrap_or_else(ModerationResult::fallback);

        debug!(
            stage = "moderate",
            result = %serialize_for_log(&result, "moderation"),
            "Moderation result"
        );
        info!(
            stage = "moderate",
            message_id = %message.id(),
            decision = %result.decision,
            degraded = result.degraded,
            "Moderation complete"
        );

        result
    }
}
