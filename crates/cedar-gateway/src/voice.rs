//! Voice round trip: transcription → chat reply → speech

use crate::server::{public_message, AppState};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use cedar_core::Error;
use cedar_llm::{AudioInput, LlmMessage, LlmRequest};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const AUDIO_FIELD: &str = "audio";
pub const REPLY_MIME: &str = "audio/mpeg";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceReply {
    pub ok: bool,
    pub user_text: String,
    pub reply_text: String,
    pub audio_base64: String,
    pub mime: &'static str,
}

/// Voice failures keep the `{ ok: false, error }` shape clients parse.
pub struct VoiceError(Error);

impl<E: Into<Error>> From<E> for VoiceError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Voice round trip failed: {}", self.0);
        } else {
            warn!("Voice request rejected: {}", self.0);
        }
        let body = json!({ "ok": false, "error": public_message(&self.0) });
        (status, Json(body)).into_response()
    }
}

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "ok": true, "ping": "voice endpoint is alive" }))
}

async fn read_audio(multipart: &mut Multipart) -> Result<AudioInput, VoiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("audio.webm").to_string();
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::invalid(format!("could not read audio: {}", e)))?;
        if bytes.is_empty() {
            break;
        }
        return Ok(AudioInput {
            bytes,
            file_name,
            mime,
        });
    }
    Err(Error::invalid("No audio").into())
}

pub async fn round_trip(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<VoiceReply>, VoiceError> {
    let audio = read_audio(&mut multipart).await?;
    info!("Voice request: {} bytes ({})", audio.bytes.len(), audio.mime);

    let transcript = state
        .speech
        .transcribe(audio)
        .await
        .map_err(|e| e.into_core("speech"))?;
    let user_text = match transcript.trim() {
        "" => "(empty)".to_string(),
        t => t.to_string(),
    };

    let voice = &state.config.voice;
    let reply = state
        .chat
        .complete(LlmRequest {
            model: voice.chat_model.clone(),
            system: Some(voice.system_prompt.clone()),
            messages: vec![LlmMessage::user(user_text.clone())],
            temperature: Some(voice.temperature),
            max_tokens: None,
        })
        .await
        .map_err(|e| e.into_core(state.chat.name()))?;
    let reply_text = match reply.trim() {
        "" => "(no reply)".to_string(),
        t => t.to_string(),
    };

    let audio = state
        .speech
        .synthesize(&reply_text)
        .await
        .map_err(|e| e.into_core("speech"))?;

    Ok(Json(VoiceReply {
        ok: true,
        user_text,
        reply_text,
        audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
        mime: REPLY_MIME,
    }))
}
