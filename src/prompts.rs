//! Centralized prompt definitions for the pipeline stages
//!
//! Each LLM-backed stage has a fixed system prompt describing its role and
//! the exact JSON it must answer with, plus a builder for the user prompt
//! that carries the message and upstream results.

use serde::Serialize;
use tracing::warn;

use crate::models::{
    ActionKind, AnalysisResult, EducationResult, MediationResult, Message, ModerationResult,
};

/// Stand-in for the mediation section when that stage did not run.
pub const MEDIATION_PLACEHOLDER: &str =
    r#"{"assessment": "n/a - step skipped or failed", "strategies": []}"#;

/// Stand-in for the education section when that stage did not run.
pub const EDUCATION_PLACEHOLDER: &str =
    r#"{"assessment": "n/a - step skipped or failed", "resources": []}"#;

/// System prompt for the moderation stage.
pub const MODERATOR_PROMPT: &str = r#"You are the moderator agent for a game community chat. Decide how to handle a message from its automated analysis. Be concise.

Check for sarcasm or contradiction between the words and the scores; do not rely on the sentiment score alone when sarcasm seems likely.

Guidelines:
1. High 'OK' probability (> 0.95): prefer 'approve', unless sentiment is strongly negative (< -60) or a harmful category is significant (> 0.10).
2. Sarcasm suspected: lean 'flag'.
3. Clear violation (high harmful category or very negative sentiment): 'block'.
4. Borderline: lean 'flag'.

Your response MUST be valid JSON in this exact format:
{"decision": "approve" | "flag" | "block", "reason": "brief reason referencing the analysis", "details": ["brief observation"]}

Respond with the JSON object only. No markdown, no other text."#;

/// System prompt for the mediation stage.
pub const MEDIATOR_PROMPT: &str = r#"You are the mediator agent for a game community chat. Suggest concise conflict-resolution ideas for a message that was not cleanly approved.

Provide:
1. A brief conflict assessment.
2. One or two resolution strategies, each with a title, a brief description and a brief example of what to say or do.

Your response MUST be valid JSON in this exact format:
{"assessment": "...", "strategies": [{"title": "...", "description": "...", "example": "..."}]}

Respond with the JSON object only. No markdown, no other text."#;

/// System prompt for the education stage.
pub const EDUCATOR_PROMPT: &str = r#"You are the educator agent for a game community chat. Identify the learning opportunity in a message that was not cleanly approved and recommend resources.

Provide:
1. A brief educational assessment.
2. Two or three resources, each with a title, a very brief description and a url (a placeholder such as '/resources/resource-name' is fine).

Your response MUST be valid JSON in this exact format:
{"assessment": "...", "resources": [{"title": "...", "description": "...", "url": "..."}]}

Respond with the JSON object only. No markdown, no other text."#;

/// System prompt for the orchestration stage.
pub const ORCHESTRATOR_PROMPT: &str = r#"You are the orchestrator agent for a game community chat. Compile the analysis, moderation, mediation and education results into one succinct action plan.

Provide:
1. A succinct description of the final decision.
2. The list of actions to take, chosen only from the allowed actions.
3. A concise notification for the sender, or null when none is needed.

Your response MUST be valid JSON in this exact format:
{"decision": "...", "actions": ["...", "..."], "notification": "..." or null}

Respond with the JSON object only. No markdown, no other text."#;

/// Category probabilities as a JSON object with 4-decimal string values,
/// in ranked order, e.g. `{"OK": "0.9800", "H": "0.0100"}`.
pub fn categories_json(analysis: &AnalysisResult) -> String {
    let entries: Vec<String> = analysis
        .categories
        .iter()
        .map(|(category, probability)| format!("\"{}\": \"{:.4}\"", category, probability))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Serialize an upstream result for inclusion in a prompt.
fn to_prompt_json<T: Serialize>(value: &T, context: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!(error = %e, context = %context, "Failed to serialize prompt section");
        "{}".to_string()
    })
}

/// User prompt for the moderation stage.
pub fn moderation_prompt(analysis: &AnalysisResult) -> String {
    format!(
        "analysis:\nsentiment score: {} (-100 to +100)\ncategories (probabilities): {}\n\n\
         Decide: approve, flag or block.",
        analysis.sentiment,
        categories_json(analysis)
    )
}

fn review_details(
    message: &Message,
    analysis: &AnalysisResult,
    moderation: &ModerationResult,
) -> String {
    format!(
        "details:\nmessage: {}\nsentiment score: {}\ncategories detected: {}\nmoderation decision: {}",
        message.content,
        analysis.sentiment,
        categories_json(analysis),
        to_prompt_json(moderation, "moderation")
    )
}

/// User prompt for the mediation stage.
pub fn mediation_prompt(
    message: &Message,
    analysis: &AnalysisResult,
    moderation: &ModerationResult,
) -> String {
    format!(
        "{}\n\nSuggest resolution strategies.",
        review_details(message, analysis, moderation)
    )
}

/// User prompt for the education stage.
pub fn education_prompt(
    message: &Message,
    analysis: &AnalysisResult,
    moderation: &ModerationResult,
) -> String {
    format!(
        "{}\n\nRecommend educational resources.",
        review_details(message, analysis, moderation)
    )
}

/// User prompt for the orchestration stage.
///
/// Absent mediation or education results are replaced by placeholders.
pub fn orchestration_prompt(
    message: &Message,
    analysis: &AnalysisResult,
    moderation: &ModerationResult,
    mediation: Option<&MediationResult>,
    education: Option<&EducationResult>,
) -> String {
    let mediation_json = mediation
        .map(|m| to_prompt_json(m, "mediation"))
        .unwrap_or_else(|| MEDIATION_PLACEHOLDER.to_string());
    let education_json = education
        .map(|e| to_prompt_json(e, "education"))
        .unwrap_or_else(|| EDUCATION_PLACEHOLDER.to_string());
    let allowed: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();

    format!(
        "inputs:\nmessage: {}\nanalysis:\n  sentiment: {}\n  categories: {}\n\
         moderation: {}\nmediation: {}\neducation: {}\n\n\
         allowed actions: {}",
        message.content,
        analysis.sentiment,
        categories_json(analysis),
        to_prompt_json(moderation, "moderation"),
        mediation_json,
        education_json,
        allowed.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentCategory, ModerationDecision};

    fn sample_message() -> Message {
        Message::new("you are all trash", "player_1", "ava", "msg_1")
    }

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult {
            sentiment: -60,
            categories: vec![
                (ContentCategory::Hate, 0.8),
                (ContentCategory::Ok, 0.123456),
            ],
        }
    }

    #[test]
    fn test_categories_json_four_decimals_ranked() {
        assert_eq!(
            categories_json(&sample_analysis()),
            r#"{"H": "0.8000", "OK": "0.1235"}"#
        );
    }

    #[test]
    fn test_categories_json_is_valid_json() {
        let parsed: serde_json::Value =
            serde_json::from_str(&categories_json(&sample_analysis())).unwrap();
        assert_eq!(parsed["H"], "0.8000");
    }

    #[test]
    fn test_moderation_prompt_contains_analysis() {
        let prompt = moderation_prompt(&sample_analysis());
        assert!(prompt.contains("sentiment score: -60"));
        assert!(prompt.contains(r#""H": "0.8000""#));
    }

    #[test]
    fn test_mediation_prompt_contains_moderation_json() {
        let moderation = ModerationResult {
            decision: ModerationDecision::Block,
            reason: "hate".to_string(),
            details: vec![],
            degraded: false,
        };
        let prompt = mediation_prompt(&sample_message(), &sample_analysis(), &moderation);
        assert!(prompt.contains("message: you are all trash"));
        assert!(prompt.contains(r#""decision":"block""#));
    }

    #[test]
    fn test_orchestration_prompt_uses_placeholders() {
        let prompt = orchestration_prompt(
            &sample_message(),
            &sample_analysis(),
            &ModerationResult::fallback(),
            None,
            None,
        );
        assert!(prompt.contains(MEDIATION_PLACEHOLDER));
        assert!(prompt.contains(EDUCATION_PLACEHOLDER));
        assert!(prompt.contains("queue for human moderator review"));
        assert!(prompt.contains("require completion of community standards course"));
    }

    #[test]
    fn test_system_prompts_demand_json() {
        for prompt in [
            MODERATOR_PROMPT,
            MEDIATOR_PROMPT,
            EDUCATOR_PROMPT,
            ORCHESTRATOR_PROMPT,
        ] {
            assert!(prompt.contains("MUST be valid JSON"));
        }
    }
}
