use std::sync::Arc;
use tracing::info;

use super::StageCore;
use crate::codec;
use crate::llm::LlmGateway;
use crate::models::{AnalysisResult, EducationResult, Message, ModerationResult};
use crate::prompts::{education_prompt, EDUCATOR_PROMPT};

/// Educate stage handler
#[derive(Clone)]
pub struct EducateStage {
    core: StageCore,
}

impl EducateStage {
    /// Create a new educate stage
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            core: StageCore::new(llm),
        }
    }

    /// Recommend learning resources for a message under review.
    pub async fn process(
        &self,
        message: &Message,
        analysis: &AnalysisResult,
        moderation: &ModerationResult,
    ) -> EducationResult {
        let result = self
            .core
            .request(
                "educate",
                EDUCATOR_PROMPT,
                &education_prompt(message, analysis, moderation),
                codec::decode::<EducationResult>,
            )
            .await
            .unwrap_or_else(EducationResult::fallback);

        info!(
            stage = "educate",
            message_id = %message.id(),
            resources = result.resources.len(),
            degraded = result.degraded,
            "Education complete"
        );

        result
    }
}
