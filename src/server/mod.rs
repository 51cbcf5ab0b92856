//! Stdio JSON-RPC front-end.
//!
//! This module provides:
//! - A newline-delimited JSON-RPC 2.0 server over stdin/stdout
//! - Method handlers for `moderation.analyze` and `moderation.score`
//! - Shared application state

mod handlers;
mod rpc;

pub use handlers::*;
pub use rpc::*;

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::pipeline::ModerationPipeline;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The moderation pipeline.
    pub pipeline: ModerationPipeline,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: ModerationPipeline) -> Self {
        Self { pipeline }
    }

    /// Build the pipeline from configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        tracing::info!(
            model = %config.llm.model,
            llm_url = %config.llm.api_url,
            has_llm_key = config.llm.api_key.is_some(),
            classifier_backend = %config.classifier.backend,
            "AppState initializing"
        );
        Ok(Self::new(ModerationPipeline::from_config(config)?))
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
