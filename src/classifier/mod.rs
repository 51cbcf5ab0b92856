//! Text classifiers behind a uniform ranked-label interface.
//!
//! The pipeline consults two independent classifiers: one for sentiment
//! (`negative` / `neutral` / `positive`) and one for content categories
//! (the closed [`ContentCategory`] label set). The [`ClassifierGateway`]
//! bounds every call with a timeout and turns any failure into an empty
//! ranking, which callers read as "no signal".

mod lexicon;
mod remote;

pub use lexicon::*;
pub use remote::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::error::{ClassifierError, ClassifierResult};
use crate::models::{AnalysisResult, ContentCategory};

/// A ranked `(label, score)` list, highest score first.
pub type Ranking = Vec<(String, f64)>;

/// A text classifier producing per-label scores.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Score every label the model knows for `text`.
    async fn classify(&self, text: &str) -> ClassifierResult<Ranking>;

    /// Classifier name, for logging
    fn name(&self) -> &str;
}

/// Runs the sentiment and content classifiers and folds their output into
/// an [`AnalysisResult`].
///
/// Cheap to clone; the classifiers are shared read-only between requests.
#[derive(Clone)]
pub struct ClassifierGateway {
    sentiment: Arc<dyn TextClassifier>,
    content: Arc<dyn TextClassifier>,
    timeout: Duration,
}

impl ClassifierGateway {
    /// Create a gateway over two classifiers
    pub fn new(
        sentiment: Arc<dyn TextClassifier>,
        content: Arc<dyn TextClassifier>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            sentiment,
            content,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Build the configured backend
    pub fn from_config(config: &ClassifierConfig) -> ClassifierResult<Self> {
        let (sentiment, content): (Arc<dyn TextClassifier>, Arc<dyn TextClassifier>) =
            match config.backend {
                ClassifierBackend::Lexicon => (
                    Arc::new(LexiconSentimentClassifier::new()?),
                    Arc::new(LexiconCategoryClassifier::new()?),
                ),
                ClassifierBackend::Remote => (
                    Arc::new(RemoteClassifier::new(
                        "sentiment",
                        &config.sentiment_url,
                        config.hf_token.clone(),
                        config.timeout_ms,
                    )?),
                    Arc::new(RemoteClassifier::new(
                        "content",
                        &config.moderation_url,
                        config.hf_token.clone(),
                        config.timeout_ms,
                    )?),
                ),
            };

        Ok(Self::new(sentiment, content, config.timeout_ms))
    }

    /// Sentiment ranking for `text`; empty on any failure.
    pub async fn classify_sentiment(&self, text: &str) -> Ranking {
        let prepared = preprocess_social_text(text);
        self.rank(self.sentiment.as_ref(), &prepared).await
    }

    /// Content-category ranking for `text`; empty on any failure.
    pub async fn classify_content(&self, text: &str) -> Ranking {
        self.rank(self.content.as_ref(), text).await
    }

    /// Analyze a message. Never fails: empty input and classifier failures
    /// both degrade to neutral sentiment and an OK category.
    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        if text.trim().is_empty() {
            return AnalysisResult::neutral();
        }

        let sentiment = sentiment_score(&self.classify_sentiment(text).await);
        let categories = filter_categories(self.classify_content(text).await);

        AnalysisResult {
            sentiment,
            categories,
        }
    }

    async fn rank(&self, classifier: &dyn TextClassifier, text: &str) -> Ranking {
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, classifier.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(mut ranking) => {
                ranking.retain(|(_, score)| score.is_finite());
                ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
                debug!(
                    classifier = classifier.name(),
                    labels = ranking.len(),
                    latency_ms = start.elapsed().as_millis(),
                    "Classification complete"
                );
                ranking
            }
            Err(e) => {
                warn!(
                    classifier = classifier.name(),
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Classification failed, treating as no signal"
                );
                Vec::new()
            }
        }
    }
}

/// Normalize social-media text the way the sentiment model was trained:
/// mentions become `@user` and links become `http`.
pub fn preprocess_social_text(text: &str) -> String {
    text.split(' ')
        .map(|token| {
            if token.starts_with('@') && token.len() > 1 {
                "@user"
            } else if token.starts_with("http") {
                "http"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse a sentiment ranking into a score in `[-100, 100]`.
///
/// A `neutral` top label (or no ranking at all) scores 0; otherwise the
/// score is `round((P(positive) - P(negative)) * 100)`.
pub fn sentiment_score(ranking: &[(String, f64)]) -> i32 {
    let Some((top, _)) = ranking.first() else {
        return 0;
    };
    if top.eq_ignore_ascii_case("neutral") {
        return 0;
    }

    let probability = |label: &str| {
        ranking
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    };

    let scaled = (probability("positive") - probability("negative")) * 100.0;
    (scaled.round() as i32).clamp(-100, 100)
}

/// Keep only recognized category labels, preserving rank order.
///
/// Falls back to `[(OK, 1.0)]` when nothing recognizable remains.
pub fn filter_categories(ranking: Ranking) -> Vec<(ContentCategory, f64)> {
    let categories: Vec<(ContentCategory, f64)> = ranking
        .into_iter()
        .filter_map(|(label, score)| match label.parse::<ContentCategory>() {
            Ok(category) => Some((category, score)),
            Err(_) => {
                debug!(label = %label, "Dropping unrecognized category label");
                None
            }
        })
        .collect();

    if categories.is_empty() {
        AnalysisResult::neutral().categories
    } else {
        categories
    }
}
