use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{Ranking, TextClassifier};
use crate::error::{ClassifierError, ClassifierResult};

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Text-classification model served over a Hugging Face style inference
/// endpoint (`POST {"inputs": text}` answering with label/score pairs).
#[derive(Clone)]
pub struct RemoteClassifier {
    client: Client,
    name: String,
    url: String,
    token: Option<String>,
    timeout_ms: u64,
}

impl RemoteClassifier {
    /// Create a classifier for one inference endpoint
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        token: Option<String>,
        timeout_ms: u64,
    ) -> ClassifierResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(ClassifierError::Http)?;

        Ok(Self {
            client,
            name: name.into(),
            url: url.into(),
            token,
            timeout_ms,
        })
    }

    /// Get the endpoint URL (for testing)
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TextClassifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> ClassifierResult<Ranking> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&InferenceRequest { inputs: text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                ClassifierError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidOutput {
                message: format!("Failed to parse response: {}", e),
            })?;

        let ranking = parse_ranking(body)?;
        debug!(classifier = %self.name, labels = ranking.len(), "Inference response parsed");
        Ok(ranking)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Accepts `[[{label, score}, ...]]`, `[{label, score}, ...]` or a single
/// `{label, score}` object.
pub fn parse_ranking(body: Value) -> ClassifierResult<Ranking> {
    let items = match body {
        Value::Array(outer) if matches!(outer.first(), Some(Value::Array(_))) => {
            match outer.into_iter().next() {
                Some(Value::Array(inner)) => inner,
                _ => Vec::new(),
            }
        }
        Value::Array(flat) => flat,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(ClassifierError::InvalidOutput {
                message: format!("unexpected payload: {}", other),
            })
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<LabelScore>(item)
                .map(|ls| (ls.label, ls.score))
                .map_err(|e| ClassifierError::InvalidOutput {
                    message: e.to_string(),
                })
        })
        .collect()
}
