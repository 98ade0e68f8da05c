//! Notes endpoints

use crate::extract::{ApiJson, ApiQuery};
use crate::server::{ApiResult, AppState};
use axum::extract::{Path, State};
use axum::Json;
use cedar_core::Error;
use cedar_memory::notes::{calendar_cutoff, validate_username};
use cedar_memory::{NoteCategory, NoteDraft, NoteFilter, NoteOrder, NotePatch, SortOrder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub username: String,
    pub category: Option<NoteCategory>,
    /// Comma-separated.
    pub tags: Option<String>,
    pub is_archived: Option<bool>,
    pub limit: Option<usize>,
    pub order_by: Option<NoteOrder>,
    pub order_direction: Option<SortOrder>,
}

impl ListQuery {
    fn filter(&self) -> NoteFilter {
        NoteFilter {
            category: self.category,
            tags: self.tags.as_deref().map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
            is_archived: self.is_archived,
            limit: self.limit,
            order_by: self.order_by.unwrap_or_default(),
            order_direction: self.order_direction.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub username: String,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub username: String,
    pub days: Option<i64>,
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    ApiJson(draft): ApiJson<NoteDraft>,
) -> ApiResult<Json<Value>> {
    let note = state.notes.create(draft).await?;
    Ok(Json(json!({ "success": true, "id": note.id, "note": note })))
}

pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Value>> {
    let notes = state.notes.list(&q.username, &q.filter()).await?;
    Ok(Json(json!({ "success": true, "count": notes.len(), "notes": notes })))
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<UserQuery>,
) -> ApiResult<Json<Value>> {
    let note = state.notes.get(&q.username, &id).await?;
    Ok(Json(json!({ "success": true, "note": note })))
}

pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<UserQuery>,
    ApiJson(patch): ApiJson<NotePatch>,
) -> ApiResult<Json<Value>> {
    let note = state.notes.update(&q.username, &id, patch).await?;
    Ok(Json(json!({ "success": true, "note": note })))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<UserQuery>,
) -> ApiResult<Json<Value>> {
    state.notes.delete(&q.username, &id).await?;
    Ok(Json(json!({ "success": true, "message": "Note deleted successfully" })))
}

pub async fn search_notes(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Value>> {
    validate_username(&q.username)?;
    let term = q
        .q
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::invalid("Search query is required"))?;
    let notes = state.notes.search(&q.username, term).await?;
    Ok(Json(json!({
        "success": true,
        "count": notes.len(),
        "query": term,
        "notes": notes,
    })))
}

pub async fn calendar(
    State(state): State<Arc<AppState>>,
    ApiQuery(q): ApiQuery<CalendarQuery>,
) -> ApiResult<Json<Value>> {
    let since = calendar_cutoff(q.days)?;
    let days = state.notes.calendar(&q.username, since).await?;
    let total: usize = days.iter().map(|d| d.count).sum();
    Ok(Json(json!({ "success": true, "total": total, "days": days })))
}
