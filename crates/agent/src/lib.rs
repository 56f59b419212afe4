//! Agent Runtime - LLM-backed prompt generation and scoring
//!
//! This crate owns every call promptbot makes to a language model:
//! - **LLM client** (`llm`) - `LlmClient` seam plus an OpenAI-compatible
//!   chat-completions client (OpenAI, or Ollama's `/v1` endpoint)
//! - **Prompt agent** (`prompt`) - turns user text into a generated prompt and
//!   rates that prompt on a fixed 1-5 rubric
//!
//! # Flow
//!
//! ```text
//! user text → PromptAgent::generate_prompt → PromptAgent::score_prompt
//!                         ↓                            ↓
//!                  LlmClient::complete          LlmClient::complete
//! ```
//!
//! The score is passed through verbatim. Nothing here parses or clamps it.

pub mod llm;
pub mod prompt;

pub use llm::{ChatMessage, ChatRole, LlmClient, LlmError, OpenAiChatClient};
pub use prompt::PromptAgent;
