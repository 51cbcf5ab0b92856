//! Chat-completion gateway used by the LLM-backed stages.

mod client;
mod types;


pub use client::*;
pub use types::*;
