//! Cedar LLM - OpenAI-compatible chat, transcription and speech adapters

pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{LlmError, LlmProvider, LlmResult, LlmStream, SpeechProvider};
pub use types::*;
