use std::time::Instant;
use tracing::info;

use crate::classifier::ClassifierGateway;
use crate::models::{AnalysisResult, Message};

/// Analyze stage handler
#[derive(Clone)]
pub struct AnalyzeStage {
    classifiers: ClassifierGateway,
}

impl AnalyzeStage {
    /// Create a new analyze stage
    pub fn new(classifiers: ClassifierGateway) -> Self {
        Self { classifiers }
    }

    /// Sentiment and category analysis. Always yields at least one category.
    pub async fn process(&self, message: &Message) -> AnalysisResult {
        let start = Instant::now();
        let analysis = self.classifiers.analyze(&message.content).await;

        info!(
            stage = "analyze",
            message_id = %message.id(),
            sentiment = analysis.sentiment,
            top_category = %analysis.top_category(),
            latency_ms = start.elapsed().as_millis(),
            "Analysis complete"
        );

        analysis
    }
}
