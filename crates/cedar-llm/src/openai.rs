//! OpenAI-compatible provider: streamed chat completions, transcription, speech

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream, SpeechProvider};
use crate::types::{AudioInput, LlmMessage, LlmRequest, StreamDelta, Usage};
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_SPEECH_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_VOICE: &str = "alloy";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    transcription_model: String,
    speech_model: String,
    voice: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }

    /// Base URL without trailing slash, e.g. `http://localhost:11434/v1`.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn with_speech(
        mut self,
        transcription_model: impl Into<String>,
        speech_model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        self.transcription_model = transcription_model.into();
        self.speech_model = speech_model.into();
        self.voice = voice.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| {
            error!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        })
}

/// Map a non-success HTTP status onto an `LlmError`.
async fn check_status(response: Response) -> LlmResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    error!("OpenAI error {}: {}", status, error_text);
    match status.as_u16() {
        401 | 403 => Err(LlmError::AuthFailed(error_text)),
        429 => Err(LlmError::RateLimited { retry_after_ms: 60000 }),
        _ => Err(LlmError::RequestFailed(format!("{}: {}", status, error_text))),
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.wire_messages(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        debug!("OpenAI request: model={} messages={}", body.model, body.messages.len());

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        let stream = parse_sse_stream(response.bytes_stream());
        Ok(Box::pin(stream))
    }
}

#[async_trait::async_trait]
impl SpeechProvider for OpenAiProvider {
    async fn transcribe(&self, audio: AudioInput) -> LlmResult<String> {
        let part = reqwest::multipart::Part::bytes(audio.bytes.to_vec())
            .file_name(audio.file_name)
            .mime_str(&audio.mime)?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let transcription: TranscriptionResponse = check_status(response).await?.json().await?;
        debug!("Transcribed {} chars", transcription.text.len());
        Ok(transcription.text)
    }

    async fn synthesize(&self, text: &str) -> LlmResult<Vec<u8>> {
        let body = SpeechRequest {
            model: &self.speech_model,
            voice: &self.voice,
            input: text,
        };
        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let audio = check_status(response).await?.bytes().await?;
        debug!("Synthesized {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }
}

/// Turn a chat-completions SSE byte stream into text deltas.
pub fn parse_sse_stream<E>(
    bytes_stream: impl futures::Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
) -> impl futures::Stream<Item = LlmResult<StreamDelta>> + Send
where
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        // Raw bytes: a multibyte character may straddle two network chunks.
        let mut buffer: Vec<u8> = Vec::new();
        let mut stop_reason: Option<String> = None;
        let mut usage: Option<Usage> = None;
        let mut finished = false;

        tokio::pin!(bytes_stream);

        'outer: while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    continue;
                }
            };

            buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

            while let Some(event_end) = find_event_end(&buffer) {
                let event_str = String::from_utf8_lossy(&buffer[..event_end]).into_owned();
                buffer.drain(..event_end + 2);

                let data: String = event_str
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect::<Vec<_>>()
                    .join("\n");

                if data.is_empty() { continue; }

                if data == "[DONE]" {
                    finished = true;
                    yield Ok(StreamDelta::Done {
                        stop_reason: stop_reason.take(),
                        usage: usage.take(),
                    });
                    break 'outer;
                }

                if let Ok(err) = serde_json::from_str::<ErrorEvent>(&data) {
                    yield Err(LlmError::StreamError(err.error.message));
                    continue;
                }

                match serde_json::from_str::<ChatChunk>(&data) {
                    Ok(chunk) => {
                        if chunk.usage.is_some() {
                            usage = chunk.usage;
                        }
                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content {
                                if !text.is_empty() {
                                    yield Ok(StreamDelta::Text(text));
                                }
                            }
                            if let Some(reason) = choice.finish_reason {
                                debug!("Completion finished: {}", reason);
                                stop_reason = Some(reason);
                            }
                        }
                    }
                    Err(e) => {
                        debug!("Skipping unparseable SSE chunk: {}", e);
                    }
                }
            }
        }

        if !finished {
            yield Ok(StreamDelta::Done { stop_reason, usage });
        }
    }
}

fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<LlmMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEvent {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}
