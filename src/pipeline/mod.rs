//! The moderation graph and its runner.
//!
//! ```text
//! Start → Analyze → Moderate ─┬─(clean approve)────────────→ Orchestrate → End
//!                             └─→ Mediate → Educate ─────────↗
//! ```
//!
//! [`ModerationPipeline::run`] always reaches `End` with a final action.

mod report;

pub use report::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

use crate::classifier::ClassifierGateway;
use crate::config::Config;
use crate::error::AppResult;
use crate::llm::{LlmClient, LlmGateway};
use crate::models::{
    AnalysisResult, EducationResult, FinalAction, MediationResult, Message, ModerationResult,
};
use crate::stages::{
    serialize_for_log, AnalyzeStage, EducateStage, MediateStage, ModerateStage, OrchestrateStage,
};

/// Nodes of the moderation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineNode {
    /// Entry point.
    Start,
    /// Classifier analysis.
    Analyze,
    /// Approve / flag / block decision.
    Moderate,
    /// Conflict-resolution strategies.
    Mediate,
    /// Educational resources.
    Educate,
    /// Final action plan.
    Orchestrate,
    /// Terminal node.
    End,
}

impl PipelineNode {
    /// Get the node name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineNode::Start => "start",
            PipelineNode::Analyze => "analyze",
            PipelineNode::Moderate => "moderate",
            PipelineNode::Mediate => "mediate",
            PipelineNode::Educate => "educate",
            PipelineNode::Orchestrate => "orchestrate",
            PipelineNode::End => "end",
        }
    }

    /// The node that follows this one given the state so far.
    pub fn next(self, state: &PipelineState) -> PipelineNode {
        match self {
            PipelineNode::Start => PipelineNode::Analyze,
            PipelineNode::Analyze => PipelineNode::Moderate,
            PipelineNode::Moderate => route(state.moderation.as_ref()),
            PipelineNode::Mediate => PipelineNode::Educate,
            PipelineNode::Educate => PipelineNode::Orchestrate,
            PipelineNode::Orchestrate | PipelineNode::End => PipelineNode::End,
        }
    }
}

impl std::fmt::Display for PipelineNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PipelineNode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(PipelineNode::Start),
            "analyze" => Ok(PipelineNode::Analyze),
            "moderate" => Ok(PipelineNode::Moderate),
            "mediate" => Ok(PipelineNode::Mediate),
            "educate" => Ok(PipelineNode::Educate),
            "orchestrate" => Ok(PipelineNode::Orchestrate),
            "end" => Ok(PipelineNode::End),
            _ => Err(format!("Unknown pipeline node: {}", s)),
        }
    }
}

/// Branch taken after moderation.
///
/// Only a genuine approval skips mediation and education; flags, blocks
/// and every fallback result go through review.
pub fn route(moderation: Option<&ModerationResult>) -> PipelineNode {
    match moderation {
        Some(result) if result.is_clean_approve() => PipelineNode::Orchestrate,
        _ => PipelineNode::Mediate,
    }
}

/// Everything known about one message as it moves through the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineState {
    /// The message under moderation.
    pub message: Message,
    /// Set by Analyze.
    pub analysis: Option<AnalysisResult>,
    /// Set by Moderate.
    pub moderation: Option<ModerationResult>,
    /// Set by Mediate on the review path only.
    pub mediation: Option<MediationResult>,
    /// Set by Educate on the review path only.
    pub education: Option<EducationResult>,
    /// Set by Orchestrate; always present once the run ends.
    pub final_action: Option<FinalAction>,
    /// Nodes visited, in order, from `Start` to `End`.
    pub path: Vec<PipelineNode>,
}

impl PipelineState {
    /// Fresh state for a message
    pub fn new(message: Message) -> Self {
        Self {
            message,
            analysis: None,
            moderation: None,
            mediation: None,
            education: None,
            final_action: None,
            path: Vec::new(),
        }
    }

    /// Whether the run went through mediation and education.
    pub fn took_review_path(&self) -> bool {
        self.path.contains(&PipelineNode::Mediate)
    }

    /// Whether any stage substituted its fallback value.
    pub fn degraded(&self) -> bool {
        self.moderation.as_ref().is_some_and(|m| m.degraded)
            || self.mediation.as_ref().is_some_and(|m| m.degraded)
            || self.education.as_ref().is_some_and(|e| e.degraded)
            || self.final_action.as_ref().is_some_and(|a| a.degraded)
    }
}

/// Runs messages through the five-stage graph.
///
/// Holds only shared read-only handles, so one pipeline can serve
/// concurrent runs.
#[derive(Clone)]
pub struct ModerationPipeline {
    analyze: AnalyzeStage,
    moderate: ModerateStage,
    mediate: MediateStage,
    educate: EducateStage,
    orchestrate: OrchestrateStage,
}

impl ModerationPipeline {
    /// Create a pipeline over a classifier gateway and an LLM gateway.
    pub fn new(classifiers: ClassifierGateway, llm: Arc<dyn LlmGateway>) -> Self {
        Self {
            analyze: AnalyzeStage::new(classifiers),
            moderate: ModerateStage::new(llm.clone()),
            mediate: MediateStage::new(llm.clone()),
            educate: EducateStage::new(llm.clone()),
            orchestrate: OrchestrateStage::new(llm),
        }
    }

    /// Build the configured classifier backend and LLM client.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let classifiers = ClassifierGateway::from_config(&config.classifier)?;
        let llm = LlmClient::new(&config.llm)?;
        Ok(Self::new(classifiers, Arc::new(llm)))
    }

    /// Sentiment and category analysis only.
    pub async fn analyze(&self, message: &Message) -> AnalysisResult {
        self.analyze.process(message).await
    }

    /// Run a message through the full graph.
    pub async fn run(&self, message: Message) -> PipelineState {
        let span = info_span!("moderation_pipeline", message_id = %message.id());
        self.run_graph(message).instrument(span).await
    }

    async fn run_graph(&self, message: Message) -> PipelineState {
        let start = Instant::now();
        let mut state = PipelineState::new(message);
        let mut node = PipelineNode::Start;

        loop {
            state.path.push(node);
            if node == PipelineNode::End {
                break;
            }
            self.execute(node, &mut state).await;
            node = node.next(&state);
        }

        if state.final_action.is_none() {
            state.final_action = Some(FinalAction::critical_fallback());
        }

        info!(
            path = %serialize_for_log(&state.path, "path"),
            review = state.took_review_path(),
            degraded = state.degraded(),
            latency_ms = start.elapsed().as_millis(),
            "Pipeline complete"
        );

        state
    }

    async fn execute(&self, node: PipelineNode, state: &mut PipelineState) {
        let start = Instant::now();

        match node {
            PipelineNode::Start | PipelineNode::End => return,
            PipelineNode::Analyze => {
                let analysis = self.analyze.process(&state.message).await;
                state.analysis = Some(analysis);
                state.moderation = None;
                state.mediation = None;
                state.education = None;
                state.final_action = None;
            }
            PipelineNode::Moderate => {
                let moderation = match &state.analysis {
                    Some(analysis) => self.moderate.process(&state.message, analysis).await,
                    None => ModerationResult::fallback(),
                };
                state.moderation = Some(moderation);
            }
            PipelineNode::Mediate => {
                let mediation = match (&state.analysis, &state.moderation) {
                    (Some(analysis), Some(moderation)) => {
                        self.mediate
                            .process(&state.message, analysis, moderation)
                            .await
                    }
                    _ => MediationResult::fallback(),
                };
                state.mediation = Some(mediation);
            }
            PipelineNode::Educate => {
                let education = match (&state.analysis, &state.moderation) {
                    (Some(analysis), Some(moderation)) => {
                        self.educate
                            .process(&state.message, analysis, moderation)
                            .await
                    }
                    _ => EducationResult::fallback(),
                };
                state.education = Some(education);
            }
            PipelineNode::Orchestrate => {
                let action = self
                    .orchestrate
                    .process(
                        &state.message,
                        state.analysis.as_ref(),
                        state.moderation.as_ref(),
                        state.mediation.as_ref(),
                        state.education.as_ref(),
                    )
                    .await;
                state.final_action = Some(action);
            }
        }

        debug!(
            node = %node,
            latency_ms = start.elapsed().as_millis(),
            "Node executed"
        );
    }
}
