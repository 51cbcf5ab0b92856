//! # Chat Moderation Pipeline
//!
//! A multi-stage moderation pipeline for game community chat. Each message
//! is analyzed by text classifiers and then judged by a chain of
//! LLM-backed stages.
//!
//! ## Stages
//!
//! - **Analyze**: sentiment score and content-category probabilities
//! - **Moderate**: approve / flag / block decision
//! - **Mediate**: conflict-resolution strategies (review path only)
//! - **Educate**: educational resources (review path only)
//! - **Orchestrate**: final action plan and user notification
//!
//! Every stage has a fixed fallback, so a run always ends with a final
//! action even when the classifiers or the LLM are unavailable.
//!
//! ## Architecture
//!
//! ```text
//! JSON-RPC (stdio) → ModerationPipeline → ClassifierGateway (lexicon | HF inference)
//!                                       → LlmGateway (chat completions)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use chat_moderation_pipeline::{Config, Message, ModerationPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let pipeline = ModerationPipeline::from_config(&config)?;
//!     let state = pipeline
//!         .run(Message::new("gg everyone!", "player_1", "ava", "msg_1"))
//!         .await;
//!     println!("{:?}", state.final_action);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Sentiment and content-category classifiers.
pub mod classifier;
/// Extraction of JSON payloads from model output.
pub mod codec;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Chat-completion client and wire types.
pub mod llm;
/// Domain types shared by every stage.
pub mod models;
/// The moderation graph, its runner and caller-facing reports.
pub mod pipeline;
/// System prompts and user-prompt builders for the LLM stages.
pub mod prompts;
/// Stdio JSON-RPC server and method handlers.
pub mod server;
/// Stage handlers.
pub mod stages;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::Message;
pub use pipeline::{ModerationPipeline, PipelineState};
pub use server::{AppState, RpcServer, SharedState};
