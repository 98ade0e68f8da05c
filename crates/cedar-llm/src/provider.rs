//! LLM Provider traits

use crate::types::{AudioInput, LlmRequest, StreamDelta};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tracing::warn;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl LlmError {
    /// Convert into the crate-wide error, tagged with the provider name.
    pub fn into_core(self, provider: &str) -> cedar_core::Error {
        cedar_core::Error::llm_error(provider, self.to_string())
    }
}

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// LLM Provider trait
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Stream a chat completion.
    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream>;

    /// Run a completion to the end and return the concatenated text.
    async fn complete(&self, request: LlmRequest) -> LlmResult<String> {
        let mut stream = self.complete_stream(request).await?;
        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::Text(t) => text.push_str(&t),
                StreamDelta::Done { .. } => break,
                StreamDelta::Error(e) => {
                    warn!("{} stream error: {}", self.name(), e);
                    return Err(LlmError::StreamError(e));
                }
            }
        }
        Ok(text)
    }
}

/// Speech-to-text and text-to-speech.
#[async_trait::async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn transcribe(&self, audio: AudioInput) -> LlmResult<String>;

    /// Synthesize speech; returns encoded audio (MP3).
    async fn synthesize(&self, text: &str) -> LlmResult<Vec<u8>>;
}
