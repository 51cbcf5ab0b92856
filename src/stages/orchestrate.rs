use std::sync::Arc;
use tracing::{error, info};

use super::{serialize_for_log, StageCore};
use crate::codec;
use crate::llm::LlmGateway;
use crate::models::{
    AnalysisResult, EducationResult, FinalAction, MediationResult, Message, ModerationResult,
};
use crate::prompts::{orchestration_prompt, ORCHESTRATOR_PROMPT};

/// Orchestrate stage handler
#[derive(Clone)]
pub struct OrchestrateStage {
    core: StageCore,
}

impl OrchestrateStage {
    /// Create a new orchestrate stage
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            core: StageCore::new(llm),
        }
    }

    /// Compile every upstream result into the final action.
    ///
    /// Missing analysis or moderation yields the critical fallback without
    /// calling the model. A failed call or payload yields the orchestration
    /// fallback, which queues the message for review.
    pub async fn process(
        &self,
        message: &Message,
        analysis: Option<&AnalysisResult>,
        moderation: Option<&ModerationResult>,
        mediation: Option<&MediationResult>,
        education: Option<&EducationResult>,
    ) -> FinalAction {
        let (Some(analysis), Some(moderation)) = (analysis, moderation) else {
            error!(
                stage = "orchestrate",
                message_id = %message.id(),
                has_analysis = analysis.is_some(),
                has_moderation = moderation.is_some(),
                "Critical state missing, queueing for manual review"
            );
            return FinalAction::critical_fallback();
        };

        let prompt = orchestration_prompt(message, analysis, moderation, mediation, education);
        let action = self
            .core
            .request(
                "orchestrate",
                ORCHESTRATOR_PROMPT,
                &prompt,
                codec::decode_object_or_first::<FinalAction>,
            )
            .await
            .unwrap_or_else(|| FinalAction::orchestration_fallback(moderation.decision));

        info!(
            stage = "orchestrate",
            message_id = %message.id(),
            decision = %action.decision,
            actions = %serialize_for_log(&action.actions, "actions"),
            degraded = action.degraded,
            "Orchestration complete"
        );

        action
    }
}
