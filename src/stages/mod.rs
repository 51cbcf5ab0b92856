//! Pipeline stage handlers.
//!
//! - [`AnalyzeStage`]: classifier-backed sentiment and category analysis
//! - [`ModerateStage`]: approve / flag / block decision
//! - [`MediateStage`]: conflict-resolution strategies
//! - [`EducateStage`]: educational resources
//! - [`OrchestrateStage`]: final action plan
//!
//! No stage returns an error. Each one substitutes its fixed fallback
//! value, marked `degraded`, when its dependency fails.
//!
//! The LLM-backed stages share infrastructure via [`StageCore`] composition.

mod analyze;
mod core;
mod educate;
mod mediate;
mod moderate;
mod orchestrate;

pub use analyze::*;
pub use core::*;
pub use educate::*;
pub use mediate::*;
pub use moderate::*;
pub use orchestrate::*;

use tracing::warn;

/// Serialize a value to JSON for logging, with warning on failure.
pub(crate) fn serialize_for_log<T: serde::Serialize>(
    value: &T,
    context: &str,
) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(
            error = %e,
            context = %context,
            "Failed to serialize value for stage log"
        );
        serde_json::json!({
            "serialization_error": e.to_string(),
            "context": context
        })
    })
}
