//! Dual-agent, summarizer and memory endpoints

use crate::extract::{ApiJson, ApiQuery};
use crate::server::{ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use cedar_core::{
    ConversationMemory, DualAgentRequest, DualAgentResponse, Error, SummarizeRequest,
    SummarizeResponse, DEFAULT_MAX_TURNS,
};
use cedar_memory::store::{DEFAULT_RECENT_LIMIT, DEFAULT_SEARCH_LIMIT};
use cedar_memory::{conversation_starter, format_for_agent, memory_insights, MemoryQuery};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Memories folded into the persona prompt when `useMemory` is set.
const MEMORY_CONTEXT_COUNT: usize = 3;

// ---------------------------------------------------------------------------
// Dual agents
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

pub async fn dual_agents_info(
    ApiQuery(q): ApiQuery<ActionQuery>,
) -> ApiResult<Json<Value>> {
    match q.action.as_deref().unwrap_or("start") {
        "start" => Ok(Json(json!({
            "message": "Ego-Superego System Ready",
            "agents": {
                "ego": "Ego - Realistic mediator operating on reality principle",
                "superego": "Superego - Moral compass enforcing rules and ideals",
            },
            "maxTurns": DEFAULT_MAX_TURNS,
        }))),
        _ => Err(Error::invalid("Invalid action").into()),
    }
}

pub async fn dual_agents_step(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<DualAgentRequest>,
) -> ApiResult<Json<DualAgentResponse>> {
    let memory_context = if req.use_memory {
        memory_context(&state).await
    } else {
        None
    };
    let response = state.dispatcher.step(&req, memory_context.as_deref()).await?;
    Ok(Json(response))
}

/// Insights from the latest memories plus the newest one's digest.
/// Storage failures leave the prompt without memory rather than failing the turn.
async fn memory_context(state: &AppState) -> Option<String> {
    let recent = match state.memories.recent(MEMORY_CONTEXT_COUNT).await {
        Ok(recent) => recent,
        Err(e) => {
            warn!("Could not load memories for context: {}", e);
            return None;
        }
    };
    let newest = recent.first()?;
    Some(format!(
        "{}\n\nMost recent conversation:\n{}",
        memory_insights(&recent),
        format_for_agent(newest)
    ))
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SummarizeRequest>,
) -> ApiResult<Json<SummarizeResponse>> {
    let outcome = state
        .summarizer
        .summarize(&req.messages, req.conversation_id.as_deref())
        .await?;
    let saved = state.memories.save(outcome.memory).await?;
    info!(
        "Saved conversation summary {} ({} messages)",
        saved.id, saved.conversation_length
    );
    Ok(Json(SummarizeResponse {
        success: true,
        storage_path: saved.storage_path.clone(),
        summary: saved,
        structured: outcome.structured,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub id: Option<String>,
}

pub async fn get_summaries(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<SummaryQuery>,
) -> ApiResult<Json<Value>> {
    match q.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => {
            let summary = state.memories.get(id).await?;
            Ok(Json(json!({ "success": true, "summary": summary })))
        }
        None => {
            let summaries = state.memories.load_all().await?;
            Ok(Json(json!({ "success": true, "summaries": summaries })))
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

pub async fn search_memories(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<MemoryQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.memories.search(&query).await?;
    let mut body = serde_json::to_value(page)?;
    body["success"] = json!(true);
    Ok(Json(body))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryAction {
    pub action: String,
    pub memory_id: Option<String>,
    pub search_query: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub topics: Vec<String>,
}

fn listing(memories: Vec<ConversationMemory>) -> Value {
    json!({
        "success": true,
        "totalCount": memories.len(),
        "memories": memories,
    })
}

pub async fn memory_action(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<MemoryAction>,
) -> ApiResult<Json<Value>> {
    let store = &state.memories;
    let response = match body.action.as_str() {
        "search" => {
            let query = MemoryQuery {
                search: body.search_query,
                limit: body.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
                offset: body.offset.unwrap_or(0),
                ..MemoryQuery::default()
            };
            let mut page = serde_json::to_value(store.search(&query).await?)?;
            page["success"] = json!(true);
            page
        }
        "get_recent" => listing(
            store
                .recent(body.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
                .await?,
        ),
        "get_by_id" => {
            let id = body
                .memory_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| Error::invalid("memoryId is required"))?;
            json!({ "success": true, "memory": store.get(id).await? })
        }
        "get_context" => listing(store.contextual(&body.topics).await?),
        "insights" => {
            let recent = store
                .recent(body.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
                .await?;
            json!({ "success": true, "insights": memory_insights(&recent) })
        }
        "starter" => {
            let recent = store
                .recent(body.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
                .await?;
            json!({ "success": true, "starter": conversation_starter(&recent) })
        }
        _ => return Err(Error::invalid("Invalid action").into()),
    };
    Ok(Json(response))
}
