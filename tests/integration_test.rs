//! Integration tests for the full Analyze → Moderate → ... → Orchestrate flow
//!
//! These tests drive the pipeline end to end against a wiremock
//! chat-completion endpoint, using the lexicon classifiers (or fixed
//! rankings) so no other network access is needed. Each stage is
//! recognized by its system prompt.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

use chat_moderation_pipeline::classifier::{ClassifierGateway, Ranking, TextClassifier};
use chat_moderation_pipeline::config::{ClassifierConfig, Config, LlmConfig, LoggingConfig};
use chat_moderation_pipeline::error::ClassifierResult;
use chat_moderation_pipeline::llm::LlmClient;
use chat_moderation_pipeline::models::{ActionKind, ContentCategory, Message, ModerationDecision};
use chat_moderation_pipeline::pipeline::{
    ModerationPipeline, ModerationReport, PipelineNode, NOT_AVAILABLE,
};

const MODERATOR: &str = "You are the moderator agent";
const MEDIATOR: &str = "You are the mediator agent";
const EDUCATOR: &str = "You are the educator agent";
const ORCHESTRATOR: &str = "You are the orchestrator agent";

/// Create test configuration with mock server URL
fn create_test_config(mock_url: &str) -> Config {
    Config {
        llm: LlmConfig {
            api_key: Some("test-api-key".to_string()),
            api_url: format!("{}/v1/chat/completions", mock_url),
            timeout_ms: 5000,
            ..LlmConfig::default()
        },
        classifier: ClassifierConfig::default(),
        logging: LoggingConfig::default(),
    }
}

fn create_pipeline(mock_server: &MockServer) -> ModerationPipeline {
    ModerationPipeline::from_config(&create_test_config(&mock_server.uri()))
        .expect("Failed to build pipeline")
}

/// Chat-completion body whose assistant message is `content`
fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

async fn mount_stage(mock_server: &MockServer, marker: &str, content: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .expect(calls)
        .mount(mock_server)
        .await;
}

const PATH_FAST: [PipelineNode; 5] = [
    PipelineNode::Start,
    PipelineNode::Analyze,
    PipelineNode::Moderate,
    PipelineNode::Orchestrate,
    PipelineNode::End,
];

const PATH_REVIEW: [PipelineNode; 7] = [
    PipelineNode::Start,
    PipelineNode::Analyze,
    PipelineNode::Moderate,
    PipelineNode::Mediate,
    PipelineNode::Educate,
    PipelineNode::Orchestrate,
    PipelineNode::End,
];

#[tokio::test]
async fn test_clean_approve_skips_review() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "approve", "reason": "friendly banter", "details": []}"#,
        1,
    )
    .await;
    mount_stage(&mock_server, MEDIATOR, "{}", 0).await;
    mount_stage(&mock_server, EDUCATOR, "{}", 0).await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "approved", "actions": ["approve message for public display", "award positive communication points to user"], "notification": null}"#,
        1,
    )
    .await;

    let pipeline = create_pipeline(&mock_server);
    let state = pipeline
        .run(Message::new("gg everyone, great game", "player_1", "ava", "msg_1"))
        .await;

    assert_eq!(state.path, PATH_FAST.to_vec());
    assert!(!state.took_review_path());
    assert!(!state.degraded());
    assert!(state.mediation.is_none());
    assert!(state.education.is_none());

    let analysis = state.analysis.as_ref().unwrap();
    assert_eq!(analysis.sentiment, 30);
    assert_eq!(analysis.top_category(), ContentCategory::Ok);

    let final_action = state.final_action.as_ref().unwrap();
    assert_eq!(
        final_action.actions,
        vec![ActionKind::ApproveMessage, ActionKind::AwardPoints]
    );
    assert!(final_action.notification.is_none());

    let report = ModerationReport::from(&state);
    assert_eq!(report.message_id, "msg_1");
    assert_eq!(report.moderation_decision, "approved");
    assert_eq!(report.moderation_reason, "friendly banter");
    assert_eq!(report.conflict_assessment, NOT_AVAILABLE);
    assert_eq!(report.educational_assessment, NOT_AVAILABLE);
    assert!(report.resolution_strategies.is_empty());
}

#[tokio::test]
async fn test_flag_goes_through_review() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "flag", "reason": "insults another player", "details": "uses 'idiot'"}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        MEDIATOR,
        r#"{"assessment": "heated exchange after a loss", "strategies": [{"title": "Cool down", "description": "Step away for a minute", "example": "Let's take a breather"}]}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        EDUCATOR,
        r#"Here you go: {"assessment": "learn respectful disagreement", "resources": [{"title": "Community guidelines", "description": "What we expect", "url": "https://example.com/guidelines"}]}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "message hidden pending review", "actions": ["hide message from public view pending review", "notify user of guideline violation"], "notification": "Please keep chat respectful."}"#,
        1,
    )
    .await;

    let pipeline = create_pipeline(&mock_server);
    let state = pipeline
        .run(Message::new("shut up idiot", "player_2", "bo", "msg_2"))
        .await;

    assert_eq!(state.path, PATH_REVIEW.to_vec());
    assert!(state.took_review_path());
    assert!(!state.degraded());

    let analysis = state.analysis.as_ref().unwrap();
    assert_eq!(analysis.top_category(), ContentCategory::Harassment);
    assert!((analysis.probability(ContentCategory::Harassment) - 0.75).abs() < 1e-9);

    let moderation = state.moderation.as_ref().unwrap();
    assert_eq!(moderation.decision, ModerationDecision::Flag);
    assert_eq!(moderation.details, vec!["uses 'idiot'".to_string()]);

    let report = ModerationReport::from(&state);
    assert_eq!(report.conflict_assessment, "heated exchange after a loss");
    assert_eq!(report.resolution_strategies.len(), 1);
    assert_eq!(report.educational_resources[0].url, "https://example.com/guidelines");
    assert_eq!(
        report.actions,
        vec![
            "hide message from public view pending review".to_string(),
            "notify user of guideline violation".to_string()
        ]
    );
    assert_eq!(
        report.notification.as_deref(),
        Some("Please keep chat respectful.")
    );
    assert_eq!(report.detected_categories.get("HR"), Some(&0.75));
}

#[tokio::test]
async fn test_block_with_fenced_orchestrator_output() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        "```json\n{\"decision\": \"Blocked\", \"reason\": \"violent threat\", \"details\": [\"threat\"]}\n```",
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        MEDIATOR,
        r#"{"assessment": "threat", "strategies": []}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        EDUCATOR,
        r#"{"assessment": "threat", "resources": []}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        "Final plan:\n```json\n{\"decision\": \"blocked\", \"actions\": [\"block message from being displayed\", \"ban forever\", \"restrict chat privileges temporarily\"], \"notification\": \"Threats are not allowed.\"}\n```",
        1,
    )
    .await;

    let pipeline = create_pipeline(&mock_server);
    let state = pipeline
        .run(Message::new("I will hurt you", "player_3", "cy", "msg_3"))
        .await;

    assert_eq!(
        state.moderation.as_ref().unwrap().decision,
        ModerationDecision::Block
    );
    assert_eq!(state.path, PATH_REVIEW.to_vec());

    let final_action = state.final_action.as_ref().unwrap();
    assert_eq!(
        final_action.actions,
        vec![ActionKind::BlockMessage, ActionKind::RestrictChat]
    );
    assert!(!final_action.degraded);
}

#[tokio::test]
async fn test_total_outage_still_ends_with_final_action() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let pipeline = create_pipeline(&mock_server);
    let state = pipeline
        .run(Message::new("hello there", "player_4", "di", "msg_4"))
        .await;

    assert_eq!(state.path, PATH_REVIEW.to_vec());
    assert!(state.degraded());

    let report = ModerationReport::from(&state);
    assert_eq!(
        report.moderation_decision,
        "flagged due to orchestration error (flag suggested)"
    );
    assert_eq!(report.moderation_reason, "llm call or parsing failed");
    assert_eq!(
        report.conflict_assessment,
        "error: llm call or parsing failed for mediation"
    );
    assert_eq!(
        report.educational_assessment,
        "error: llm call or parsing failed for education"
    );
    assert_eq!(report.actions, vec!["queue for human moderator review".to_string()]);
    assert!(report.degraded);
}

#[tokio::test]
async fn test_orchestrator_failure_after_approve() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "approve", "reason": "fine", "details": []}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "approved", "actions": ["celebrate"]}"#,
        1,
    )
    .await;

    let pipeline = create_pipeline(&mock_server);
    let state = pipeline
        .run(Message::new("nice play", "player_5", "ed", "msg_5"))
        .await;

    assert_eq!(state.path, PATH_FAST.to_vec());

    let final_action = state.final_action.as_ref().unwrap();
    assert_eq!(
        final_action.decision,
        "flagged due to orchestration error (approve suggested)"
    );
    assert!(final_action.requires_review());
    assert!(state.degraded());
}

#[tokio::test]
async fn test_empty_message_is_still_moderated() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "approve", "reason": "empty", "details": []}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "approved", "actions": ["approve message for public display"], "notification": ""}"#,
        1,
    )
    .await;

    let pipeline = create_pipeline(&mock_server);
    let state = pipeline.run(Message::new("", "player_6", "fi", "msg_6")).await;

    let analysis = state.analysis.as_ref().unwrap();
    assert_eq!(analysis.sentiment, 0);
    assert_eq!(analysis.categories, vec![(ContentCategory::Ok, 1.0)]);

    // Blank notifications are dropped
    assert!(state.final_action.as_ref().unwrap().notification.is_none());
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "approve", "reason": "fine", "details": []}"#,
        2,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "approved", "actions": ["approve message for public display"], "notification": null}"#,
        2,
    )
    .await;

    let pipeline = create_pipeline(&mock_server);
    let message = Message::new("love this community", "player_7", "gu", "msg_7");

    let first = pipeline.run(message.clone()).await;
    let second = pipeline.run(message).await;

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// ============================================================================
// Fixed classifier output
// ============================================================================

/// Classifier that always returns the same ranking.
struct FixedClassifier(Ranking);

#[async_trait]
impl TextClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> ClassifierResult<Ranking> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn ranking(pairs: &[(&str, f64)]) -> Ranking {
    pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect()
}

fn fixed_gateway(sentiment: &[(&str, f64)], content: &[(&str, f64)]) -> ClassifierGateway {
    ClassifierGateway::new(
        Arc::new(FixedClassifier(ranking(sentiment))),
        Arc::new(FixedClassifier(ranking(content))),
        1000,
    )
}

fn create_client(mock_server: &MockServer) -> Arc<LlmClient> {
    let config = create_test_config(&mock_server.uri());
    Arc::new(LlmClient::new(&config.llm).expect("Failed to create client"))
}

#[tokio::test]
async fn test_positive_message_is_approved_for_display() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "approve", "reason": "positive team spirit", "details": []}"#,
        1,
    )
    .await;
    mount_stage(&mock_server, MEDIATOR, "{}", 0).await;
    mount_stage(&mock_server, EDUCATOR, "{}", 0).await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "approved", "actions": ["approve message for public display"], "notification": null}"#,
        1,
    )
    .await;

    let classifiers = fixed_gateway(
        &[("positive", 0.85), ("neutral", 0.1), ("negative", 0.05)],
        &[("OK", 0.98), ("H", 0.01), ("V", 0.01)],
    );
    let pipeline = ModerationPipeline::new(classifiers, create_client(&mock_server));
    let state = pipeline
        .run(Message::new("great game, love this team!", "player_8", "ha", "msg_8"))
        .await;

    let analysis = state.analysis.as_ref().unwrap();
    assert_eq!(analysis.sentiment, 80);
    assert_eq!(analysis.categories[0], (ContentCategory::Ok, 0.98));

    assert_eq!(state.path, PATH_FAST.to_vec());
    assert!(state.mediation.is_none());
    assert!(state.education.is_none());
    assert!(state
        .final_action
        .as_ref()
        .unwrap()
        .actions
        .contains(&ActionKind::ApproveMessage));
}

#[tokio::test]
async fn test_hateful_message_is_blocked_and_queued() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "block", "reason": "hate speech", "details": ["slur"]}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        MEDIATOR,
        r#"{"assessment": "hostile", "strategies": []}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        EDUCATOR,
        r#"{"assessment": "respect", "resources": []}"#,
        1,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "blocked", "actions": ["block message from being displayed", "queue for human moderator review"], "notification": "Hate speech is not allowed."}"#,
        1,
    )
    .await;

    let classifiers = fixed_gateway(
        &[("negative", 0.7), ("neutral", 0.2), ("positive", 0.1)],
        &[("H", 0.8), ("OK", 0.15), ("HR", 0.05)],
    );
    let pipeline = ModerationPipeline::new(classifiers, create_client(&mock_server));
    let state = pipeline
        .run(Message::new("<hateful text>", "player_9", "io", "msg_9"))
        .await;

    let analysis = state.analysis.as_ref().unwrap();
    assert_eq!(analysis.sentiment, -60);
    assert_eq!(analysis.top_category(), ContentCategory::Hate);

    assert_eq!(state.path, PATH_REVIEW.to_vec());
    assert!(state.mediation.is_some());
    assert!(state.education.is_some());

    let actions = &state.final_action.as_ref().unwrap().actions;
    assert!(actions.contains(&ActionKind::BlockMessage));
    assert!(actions.contains(&ActionKind::QueueForReview));
}

#[tokio::test]
async fn test_missing_llm_credentials_falls_back_everywhere() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let llm = LlmClient::new(&LlmConfig {
        api_key: None,
        api_url: format!("{}/v1/chat/completions", mock_server.uri()),
        ..LlmConfig::default()
    })
    .unwrap();
    let classifiers = ClassifierGateway::from_config(&ClassifierConfig::default()).unwrap();
    let pipeline = ModerationPipeline::new(classifiers, Arc::new(llm));

    let state = pipeline
        .run(Message::new("see you next round", "player_10", "jo", "msg_10"))
        .await;

    let moderation = state.moderation.as_ref().unwrap();
    assert_eq!(moderation.decision, ModerationDecision::Flag);
    assert!(moderation.degraded);
    assert!(state.mediation.as_ref().unwrap().degraded);
    assert!(state.education.as_ref().unwrap().degraded);

    let final_action = state.final_action.as_ref().unwrap();
    assert_eq!(
        serde_json::to_value(final_action).unwrap(),
        json!({
            "decision": "flagged due to orchestration error (flag suggested)",
            "actions": ["queue for human moderator review"],
            "notification": null,
            "degraded": true
        })
    );
}

#[tokio::test]
async fn test_repeated_runs_serialize_identically() {
    let mock_server = MockServer::start().await;

    mount_stage(
        &mock_server,
        MODERATOR,
        r#"{"decision": "block", "reason": "hate speech", "details": []}"#,
        2,
    )
    .await;
    mount_stage(
        &mock_server,
        MEDIATOR,
        r#"{"assessment": "hostile", "strategies": [{"title": "Pause", "description": "Mute the thread", "example": "Let's cool off"}]}"#,
        2,
    )
    .await;
    mount_stage(
        &mock_server,
        EDUCATOR,
        r#"{"assessment": "respect", "resources": []}"#,
        2,
    )
    .await;
    mount_stage(
        &mock_server,
        ORCHESTRATOR,
        r#"{"decision": "blocked", "actions": ["block message from being displayed"], "notification": "Removed."}"#,
        2,
    )
    .await;

    let classifiers = fixed_gateway(
        &[("negative", 0.7), ("neutral", 0.2), ("positive", 0.1)],
        &[("H", 0.8), ("OK", 0.2)],
    );
    let pipeline = ModerationPipeline::new(classifiers, create_client(&mock_server));
    let message = Message::new("<hateful text>", "player_11", "ka", "msg_11");

    let first = serde_json::to_string(&pipeline.run(message.clone()).await).unwrap();
    let second = serde_json::to_string(&pipeline.run(message).await).unwrap();

    assert_eq!(first, second);
}
