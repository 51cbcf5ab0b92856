use std::sync::Arc;
use tracing::info;

use super::StageCore;
use crate::codec;
use crate::llm::LlmGateway;
use crate::models::{AnalysisResult, MediationResult, Message, ModerationResult};
use crate::prompts::{mediation_prompt, MEDIATOR_PROMPT};

/// Mediate stage handler
#[derive(Clone)]
pub struct MediateStage {
    core: StageCore,
}

impl MediateStage {
    /// Create a new mediate stage
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            core: StageCore::new(llm),
        }
    }

    /// Suggest conflict-resolution strategies for a message under review.
    pub async fn process(
        &self,
        message: &Message,
        analysis: &AnalysisResult,
        moderation: &ModerationResult,
    ) -> MediationResult {
        let result = self
            .core
            .request(
                "mediate",
                MEDIATOR_PROMPT,
                &mediation_prompt(message, analysis, moderation),
                codec::decode::<MediationResult>,
            )
            .await
            .unwrap_or_else(MediationResult::fallback);

        info!(
            stage = "mediate",
            message_id = %message.id(),
            strategies = result.strategies.len(),
            degraded = result.degraded,
            "Mediation complete"
        );

        result
    }
}
