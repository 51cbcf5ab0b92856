//! Flattened views of a finished run, as served to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::PipelineState;
use crate::models::{
    AnalysisResult, EducationalResource, Message, ResolutionStrategy,
};

/// Stand-in for an optional section that was not produced.
pub const NOT_AVAILABLE: &str = "N/A";

/// A moderation request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRequest {
    /// Message text.
    pub message: String,
    /// Display name of the sender.
    pub username: String,
    /// Player identifier; generated when absent.
    #[serde(default, alias = "player_id")]
    pub id: Option<String>,
    /// Message identifier; generated when absent.
    #[serde(default)]
    pub message_id: Option<String>,
}

impl ModerationRequest {
    /// Build the pipeline message, generating missing identifiers.
    pub fn into_message(self) -> Message {
        let message_id = non_blank(self.message_id).unwrap_or_else(|| generate_id("msg"));
        let user_id = non_blank(self.id).unwrap_or_else(|| generate_id("player"));
        Message::new(self.message, user_id, self.username, message_id)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `{prefix}_` followed by 8 hex characters of a random UUID.
pub fn generate_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &hex[..8])
}

/// Category probabilities keyed by label, rounded to 4 decimals.
pub fn rounded_categories(analysis: &AnalysisResult) -> BTreeMap<String, f64> {
    analysis
        .categories
        .iter()
        .map(|(category, p)| (category.as_str().to_string(), (p * 10_000.0).round() / 10_000.0))
        .collect()
}

/// Full moderation outcome for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationReport {
    /// Message identifier.
    pub message_id: String,
    /// Sentiment score in `[-100, 100]`.
    pub sentiment_score: i32,
    /// Category label to probability, rounded to 4 decimals.
    pub detected_categories: BTreeMap<String, f64>,
    /// The final decision text.
    pub moderation_decision: String,
    /// Moderation reason, or `N/A`.
    pub moderation_reason: String,
    /// Text for the sender, if any.
    pub notification: Option<String>,
    /// Action phrases to carry out.
    pub actions: Vec<String>,
    /// Education assessment, or `N/A` on the fast path.
    pub educational_assessment: String,
    /// Recommended resources.
    pub educational_resources: Vec<EducationalResource>,
    /// Mediation assessment, or `N/A` on the fast path.
    pub conflict_assessment: String,
    /// Suggested strategies.
    pub resolution_strategies: Vec<ResolutionStrategy>,
    /// Whether any stage fell back.
    pub degraded: bool,
}

impl From<&PipelineState> for ModerationReport {
    fn from(state: &PipelineState) -> Self {
        let analysis = state
            .analysis
            .clone()
            .unwrap_or_else(AnalysisResult::neutral);
        let final_action = state.final_action.as_ref();

        Self {
            message_id: state.message.id().to_string(),
            sentiment_score: analysis.sentiment,
            detected_categories: rounded_categories(&analysis),
            moderation_decision: final_action
                .map(|a| a.decision.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            moderation_reason: state
                .moderation
                .as_ref()
                .map(|m| m.reason.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            notification: final_action.and_then(|a| a.notification.clone()),
            actions: final_action
                .map(|a| a.actions.iter().map(|k| k.as_str().to_string()).collect())
                .unwrap_or_default(),
            educational_assessment: state
                .education
                .as_ref()
                .map(|e| e.assessment.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            educational_resources: state
                .education
                .as_ref()
                .map(|e| e.resources.clone())
                .unwrap_or_default(),
            conflict_assessment: state
                .mediation
                .as_ref()
                .map(|m| m.assessment.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            resolution_strategies: state
                .mediation
                .as_ref()
                .map(|m| m.strategies.clone())
                .unwrap_or_default(),
            degraded: state.degraded(),
        }
    }
}

/// Sentiment-only outcome for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Player identifier.
    pub id: String,
    /// Message identifier.
    pub message_id: String,
    /// Sender display name.
    pub username: String,
    /// Message text.
    pub message: String,
    /// Sentiment score in `[-100, 100]`.
    pub sentiment_score: i32,
    /// Emotion bucket label, e.g. "Very Positive".
    pub emotion: String,
}

impl ScoreReport {
    /// Assemble from a message and its analysis
    pub fn new(message: &Message, analysis: &AnalysisResult) -> Self {
        Self {
            id: message.context.user_id.clone(),
            message_id: message.id().to_string(),
            username: message.context.username.clone(),
            message: message.content.clone(),
            sentiment_score: analysis.sentiment,
            emotion: analysis.emotion().as_str().to_string(),
        }
    }
}
