use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use super::SharedState;
use crate::error::{ServerError, ServerResult};
use crate::pipeline::{ModerationReport, ModerationRequest, ScoreReport};

/// Full pipeline run.
pub const METHOD_ANALYZE: &str = "moderation.analyze";
/// Sentiment score only.
pub const METHOD_SCORE: &str = "moderation.score";

/// Route a method call to its handler
pub async fn handle_method(
    state: &SharedState,
    method: &str,
    params: Option<Value>,
) -> ServerResult<Value> {
    match method {
        METHOD_ANALYZE => handle_analyze(state, params).await,
        METHOD_SCORE => handle_score(state, params).await,
        _ => Err(ServerError::UnknownMethod {
            method: method.to_string(),
        }),
    }
}

/// Handle moderation.analyze
async fn handle_analyze(state: &SharedState, params: Option<Value>) -> ServerResult<Value> {
    let start = Instant::now();
    let request: ModerationRequest = parse_params(METHOD_ANALYZE, params)?;
    let message = request.into_message();

    info!(
        method = METHOD_ANALYZE,
        message_id = %message.id(),
        username = %message.context.username,
        "Handling request"
    );

    let outcome = state.pipeline.run(message).await;
    let report = ModerationReport::from(&outcome);

    info!(
        method = METHOD_ANALYZE,
        message_id = %report.message_id,
        decision = %report.moderation_decision,
        latency_ms = start.elapsed().as_millis(),
        "Request complete"
    );

    to_result(report)
}

/// Handle moderation.score
async fn handle_score(state: &SharedState, params: Option<Value>) -> ServerResult<Value> {
    let request: ModerationRequest = parse_params(METHOD_SCORE, params)?;
    let message = request.into_message();

    info!(
        method = METHOD_SCORE,
        message_id = %message.id(),
        username = %message.context.username,
        "Handling request"
    );

    let analysis = state.pipeline.analyze(&message).await;
    to_result(ScoreReport::new(&message, &analysis))
}

fn parse_params<T: serde::de::DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> ServerResult<T> {
    match params {
        Some(params) => {
            serde_json::from_value(params).map_err(|e| ServerError::InvalidParameters {
                method: method.to_string(),
                message: e.to_string(),
            })
        }
        None => Err(ServerError::InvalidParameters {
            method: method.to_string(),
            message: "Missing params".to_string(),
        }),
    }
}

fn to_result<T: Serialize>(value: T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(ServerError::Json)
}
