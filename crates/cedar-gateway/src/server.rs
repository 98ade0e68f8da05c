//! Gateway server: shared state, routes and error responses

use crate::auth::{require_token, ResolvedAuth};
use crate::config::CedarConfig;
use crate::{api, notes, voice};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use cedar_core::{Error, ErrorBody};
use cedar_dialogue::{Dispatcher, Summarizer};
use cedar_llm::{LlmProvider, OpenAiProvider, SpeechProvider};
use cedar_memory::{FileNoteStore, MemoryStore, NoteStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub config: CedarConfig,
    pub auth: ResolvedAuth,
    pub dispatcher: Dispatcher,
    pub summarizer: Summarizer,
    pub memories: MemoryStore,
    pub notes: Arc<dyn NoteStore>,
    /// Plain chat completions (voice replies).
    pub chat: Arc<dyn LlmProvider>,
    pub speech: Arc<dyn SpeechProvider>,
}

impl AppState {
    pub fn new(
        config: CedarConfig,
        chat: Arc<dyn LlmProvider>,
        speech: Arc<dyn SpeechProvider>,
    ) -> Self {
        let notes: Arc<dyn NoteStore> = Arc::new(FileNoteStore::new(&config.storage.notes_dir));
        Self::with_note_store(config, chat, speech, notes)
    }

    pub fn with_note_store(
        config: CedarConfig,
        chat: Arc<dyn LlmProvider>,
        speech: Arc<dyn SpeechProvider>,
        notes: Arc<dyn NoteStore>,
    ) -> Self {
        Self {
            auth: ResolvedAuth::from_config(&config.server.auth),
            dispatcher: Dispatcher::new(chat.clone(), config.dialogue.clone()),
            summarizer: Summarizer::new(chat.clone(), config.dialogue.clone()),
            memories: MemoryStore::new(&config.storage.memory_dir),
            notes,
            chat,
            speech,
            config,
        }
    }
}

/// Error response: `{ "error": ..., "details"?: [...] }` with a status
/// derived from the error variant.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E> From<E> for ApiError
where
    E: Into<Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

/// Client-facing message for an error.
pub fn public_message(e: &Error) -> String {
    match e {
        Error::InvalidRequest(reason) => reason.clone(),
        Error::Validation { .. } => "Validation failed".into(),
        Error::NotFound { kind, .. } => {
            let mut chars = kind.chars();
            match chars.next() {
                Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
                None => "Not found".into(),
            }
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        let body = ErrorBody {
            error: public_message(&self.0),
            details: match self.0 {
                Error::Validation { errors } => Some(errors),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/dual-agents",
            get(api::dual_agents_info).post(api::dual_agents_step),
        )
        .route(
            "/summarizer",
            get(api::get_summaries).post(api::summarize),
        )
        .route("/memory", get(api::search_memories).post(api::memory_action))
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/search", get(notes::search_notes))
        .route("/notes/calendar", get(notes::calendar))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/voice", get(voice::ping).post(voice::round_trip))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn health_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    let d = &state.config.dialogue;
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "models": {
            "chat": d.chat_model,
            "router": d.router_model,
            "summarizer": d.summarizer_model,
            "transcription": state.config.llm.transcription_model,
            "speech": state.config.llm.speech_model,
        },
        "auth": !matches!(state.auth.mode, cedar_core::AuthMode::None),
    }))
}

pub async fn start_gateway(config: CedarConfig) -> anyhow::Result<()> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let provider = Arc::new(
        OpenAiProvider::new(api_key)
            .with_base_url(config.llm.base_url.clone())
            .with_timeout(Duration::from_secs(config.llm.timeout_secs))
            .with_speech(
                config.llm.transcription_model.clone(),
                config.llm.speech_model.clone(),
                config.llm.voice.clone(),
            ),
    );

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind.to_addr(), config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {}", e))?;

    info!("Cedar Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  LLM endpoint: {}", provider.base_url());
    info!("  Memories:     {}", config.storage.memory_dir.display());
    info!("  Notes:        {}", config.storage.notes_dir.display());

    let state = Arc::new(AppState::new(config, provider.clone(), provider));
    info!("  Auth mode:    {:?}", state.auth.mode);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_messages() {
        assert_eq!(public_message(&Error::invalid("Username is required")), "Username is required");
        assert_eq!(public_message(&Error::not_found("note", "n1")), "Note not found");
        assert_eq!(
            public_message(&Error::Validation { errors: vec!["x".into()] }),
            "Validation failed"
        );
        assert!(public_message(&Error::llm_error("openai", "timeout")).contains("timeout"));
    }
}
