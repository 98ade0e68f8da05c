//! MockProvider: deterministic LLM responses for testing
//!
//! Returns canned text in sequence and records every request so tests can
//! assert on prompts, models and temperatures.

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream, SpeechProvider};
use crate::types::{AudioInput, LlmRequest, StreamDelta};
use async_stream::stream;
use tokio::sync::Mutex;

/// Mock behavior configuration
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Stream a text response
    Text(String),
    /// Fail the request before streaming
    Error(String),
}

/// A sequence of behaviors; each call to complete_stream pops the next one.
/// If the sequence is exhausted, the default behavior is used.
pub struct MockProvider {
    behaviors: Mutex<Vec<MockBehavior>>,
    default_behavior: MockBehavior,
    requests: Mutex<Vec<LlmRequest>>,
    transcript: String,
}

impl MockProvider {
    /// Create a mock that always returns the same behavior
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(Vec::new()),
            default_behavior: behavior,
            requests: Mutex::new(Vec::new()),
            transcript: "(mock transcript)".into(),
        }
    }

    /// Create a mock with a sequence of behaviors (consumed in order)
    pub fn sequence(behaviors: Vec<MockBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors),
            default_behavior: MockBehavior::Text("(mock: sequence exhausted)".into()),
            requests: Mutex::new(Vec::new()),
            transcript: "(mock transcript)".into(),
        }
    }

    /// Shorthand for a sequence of text replies.
    pub fn texts<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::sequence(replies.into_iter().map(|s| MockBehavior::Text(s.into())).collect())
    }

    /// Text returned by `transcribe`.
    pub fn with_transcript(mut self, text: impl Into<String>) -> Self {
        self.transcript = text.into();
        self
    }

    /// Number of completion calls made
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Every completion request received, in order.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_behavior(&self) -> MockBehavior {
        let mut behaviors = self.behaviors.lock().await;
        if behaviors.is_empty() {
            self.default_behavior.clone()
        } else {
            behaviors.remove(0)
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        self.requests.lock().await.push(request);
        match self.next_behavior().await {
            MockBehavior::Error(msg) => Err(LlmError::RequestFailed(msg)),
            MockBehavior::Text(text) => Ok(Box::pin(stream! {
                // Stream text in chunks like a real LLM
                let chars: Vec<char> = text.chars().collect();
                for chunk in chars.chunks(20) {
                    yield Ok(StreamDelta::Text(chunk.iter().collect()));
                }
                yield Ok(StreamDelta::Done { stop_reason: Some("stop".into()), usage: None });
            })),
        }
    }
}

#[async_trait::async_trait]
impl SpeechProvider for MockProvider {
    async fn transcribe(&self, _audio: AudioInput) -> LlmResult<String> {
        Ok(self.transcript.clone())
    }

    async fn synthesize(&self, text: &str) -> LlmResult<Vec<u8>> {
        Ok(format!("mp3:{}", text).into_bytes())
    }
}
