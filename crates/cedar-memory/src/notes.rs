//! Per-user notes
//!
//! [`NoteStore`] is the storage seam; [`FileNoteStore`] keeps one JSON file
//! per note at `{root}/{username}/{id}.json`.

use crate::store::SortOrder;
use async_trait::async_trait;
use cedar_core::{is_valid_record_id, Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 50_000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_CHARS: usize = 50;
pub const DEFAULT_CALENDAR_DAYS: i64 = 365;
pub const MAX_CALENDAR_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    #[default]
    General,
    Work,
    Personal,
    Ideas,
    Meetings,
    Projects,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl NotePriority {
    fn rank(self) -> u8 {
        match self {
            NotePriority::Low => 0,
            NotePriority::Medium => 1,
            NotePriority::High => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    pub word_count: usize,
    pub character_count: usize,
}

impl NoteMetadata {
    pub fn for_content(content: &str) -> Self {
        Self {
            word_count: content.split_whitespace().count(),
            character_count: content.chars().count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub username: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub category: NoteCategory,
    pub priority: NotePriority,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub metadata: NoteMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteDraft {
    pub username: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub category: NoteCategory,
    pub priority: NotePriority,
    pub is_pinned: bool,
    pub is_archived: bool,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<NoteCategory>,
    pub priority: Option<NotePriority>,
    pub is_pinned: Option<bool>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteOrder {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Priority,
}

#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub category: Option<NoteCategory>,
    /// Matches notes carrying any of these tags.
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
    pub limit: Option<usize>,
    pub order_by: NoteOrder,
    pub order_direction: SortOrder,
}

/// One heatmap cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    /// `YYYY-MM-DD` (UTC).
    pub date: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_title(title: &str, errors: &mut Vec<String>) {
    if title.trim().is_empty() {
        errors.push("Title is required".into());
    } else if title.chars().count() > MAX_TITLE_CHARS {
        errors.push(format!("Title must be {} characters or less", MAX_TITLE_CHARS));
    }
}

fn check_content(content: &str, errors: &mut Vec<String>) {
    if content.chars().count() > MAX_CONTENT_CHARS {
        errors.push(format!("Content must be {} characters or less", MAX_CONTENT_CHARS));
    }
}

fn check_tags(tags: &[String], errors: &mut Vec<String>) {
    if tags.len() > MAX_TAGS {
        errors.push(format!("Maximum {} tags allowed", MAX_TAGS));
    }
    if tags.iter().any(|t| t.chars().count() > MAX_TAG_CHARS) {
        errors.push(format!("Each tag must be {} characters or less", MAX_TAG_CHARS));
    }
}

fn into_result(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { errors })
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::invalid("Username is required"));
    }
    if !is_valid_record_id(username) {
        return Err(Error::invalid(format!("invalid username: {}", username)));
    }
    Ok(())
}

pub fn validate_draft(draft: &NoteDraft) -> Result<()> {
    let mut errors = Vec::new();
    if draft.username.trim().is_empty() {
        errors.push("Username is required".into());
    }
    check_title(&draft.title, &mut errors);
    check_content(&draft.content, &mut errors);
    check_tags(&draft.tags, &mut errors);
    into_result(errors)
}

pub fn validate_patch(patch: &NotePatch) -> Result<()> {
    let mut errors = Vec::new();
    if let Some(title) = &patch.title {
        check_title(title, &mut errors);
    }
    if let Some(content) = &patch.content {
        check_content(content, &mut errors);
    }
    if let Some(tags) = &patch.tags {
        check_tags(tags, &mut errors);
    }
    into_result(errors)
}

// ---------------------------------------------------------------------------
// Querying
// ---------------------------------------------------------------------------

/// Filter, order (pinned first) and limit.
pub fn apply_filter(mut notes: Vec<Note>, filter: &NoteFilter) -> Vec<Note> {
    notes.retain(|n| {
        filter.category.map_or(true, |c| n.category == c)
            && filter.is_archived.map_or(true, |a| n.is_archived == a)
            && filter
                .tags
                .as_ref()
                .filter(|tags| !tags.is_empty())
                .map_or(true, |tags| n.tags.iter().any(|t| tags.contains(t)))
    });

    notes.sort_by(|a, b| {
        let ord = match filter.order_by {
            NoteOrder::CreatedAt => a.created_at.cmp(&b.created_at),
            NoteOrder::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            NoteOrder::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            NoteOrder::Priority => a.priority.rank().cmp(&b.priority.rank()),
        };
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| filter.order_direction.apply(ord))
    });

    if let Some(limit) = filter.limit {
        notes.truncate(limit);
    }
    notes
}

pub fn matches_term(note: &Note, term: &str) -> bool {
    let t = term.to_lowercase();
    note.title.to_lowercase().contains(&t)
        || note.content.to_lowercase().contains(&t)
        || note.tags.iter().any(|tag| tag.to_lowercase().contains(&t))
}

/// Notes created on or after `since`, counted per UTC day, oldest first.
pub fn day_counts(notes: &[Note], since: DateTime<Utc>) -> Vec<DayCount> {
    let mut days: BTreeMap<String, usize> = BTreeMap::new();
    for note in notes.iter().filter(|n| n.created_at >= since) {
        *days
            .entry(note.created_at.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }
    days.into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect()
}

/// Start of the heatmap window, `days` back from now (one year by default).
pub fn calendar_cutoff(days: Option<i64>) -> Result<DateTime<Utc>> {
    let days = days.unwrap_or(DEFAULT_CALENDAR_DAYS);
    if !(0..=MAX_CALENDAR_DAYS).contains(&days) {
        return Err(Error::invalid(format!(
            "days must be between 0 and {}",
            MAX_CALENDAR_DAYS
        )));
    }
    Duration::try_days(days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| Error::invalid(format!("days out of range: {}", days)))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create(&self, draft: NoteDraft) -> Result<Note>;

    async fn get(&self, username: &str, id: &str) -> Result<Note>;

    async fn list(&self, username: &str, filter: &NoteFilter) -> Result<Vec<Note>>;

    async fn update(&self, username: &str, id: &str, patch: NotePatch) -> Result<Note>;

    async fn delete(&self, username: &str, id: &str) -> Result<()>;

    /// Newest first.
    async fn search(&self, username: &str, term: &str) -> Result<Vec<Note>> {
        let notes = self.list(username, &NoteFilter::default()).await?;
        Ok(notes.into_iter().filter(|n| matches_term(n, term)).collect())
    }

    async fn calendar(&self, username: &str, since: DateTime<Utc>) -> Result<Vec<DayCount>> {
        let notes = self.list(username, &NoteFilter::default()).await?;
        Ok(day_counts(&notes, since))
    }
}

pub struct FileNoteStore {
    root: PathBuf,
}

impl FileNoteStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn user_dir(&self, username: &str) -> Result<PathBuf> {
        validate_username(username)?;
        Ok(self.root.join(username))
    }

    fn note_path(&self, username: &str, id: &str) -> Result<PathBuf> {
        let dir = self.user_dir(username)?;
        if !is_valid_record_id(id) {
            return Err(Error::not_found("note", id));
        }
        Ok(dir.join(format!("{}.json", id)))
    }

    async fn write(&self, note: &Note) -> Result<()> {
        let dir = self.user_dir(&note.username)?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.json", note.id));
        let tmp = dir.join(format!("{}.json.tmp", note.id));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(note)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    async fn load_user(&self, username: &str) -> Result<Vec<Note>> {
        let dir = self.user_dir(username)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut notes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(data) => match serde_json::from_slice::<Note>(&data) {
                    Ok(note) => notes.push(note),
                    Err(e) => warn!("Skipping note file {}: {}", path.display(), e),
                },
                Err(e) => warn!("Skipping note file {}: {}", path.display(), e),
            }
        }
        Ok(notes)
    }
}

#[async_trait]
impl NoteStore for FileNoteStore {
    async fn create(&self, draft: NoteDraft) -> Result<Note> {
        validate_draft(&draft)?;
        validate_username(&draft.username)?;

        let now = Utc::now();
        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: NoteMetadata::for_content(&draft.content),
            username: draft.username,
            title: draft.title.trim().to_string(),
            content: draft.content,
            tags: draft.tags,
            category: draft.category,
            priority: draft.priority,
            is_pinned: draft.is_pinned,
            is_archived: draft.is_archived,
            created_at: now,
            updated_at: now,
        };
        self.write(&note).await?;
        info!("Created note {} for {}", note.id, note.username);
        Ok(note)
    }

    async fn get(&self, username: &str, id: &str) -> Result<Note> {
        let path = self.note_path(username, id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found("note", id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, username: &str, filter: &NoteFilter) -> Result<Vec<Note>> {
        let notes = self.load_user(username).await?;
        Ok(apply_filter(notes, filter))
    }

    async fn update(&self, username: &str, id: &str, patch: NotePatch) -> Result<Note> {
        validate_patch(&patch)?;
        let mut note = self.get(username, id).await?;

        if let Some(title) = patch.title {
            note.title = title.trim().to_string();
        }
        if let Some(content) = patch.content {
            note.metadata = NoteMetadata::for_content(&content);
            note.content = content;
        }
        if let Some(tags) = patch.tags {
            note.tags = tags;
        }
        if let Some(category) = patch.category {
            note.category = category;
        }
        if let Some(priority) = patch.priority {
            note.priority = priority;
        }
        if let Some(pinned) = patch.is_pinned {
            note.is_pinned = pinned;
        }
        if let Some(archived) = patch.is_archived {
            note.is_archived = archived;
        }
        note.updated_at = Utc::now();

        self.write(&note).await?;
        Ok(note)
    }

    async fn delete(&self, username: &str, id: &str) -> Result<()> {
        let path = self.note_path(username, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted note {} for {}", id, username);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::not_found("note", id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_counts_words_and_chars() {
        let m = NoteMetadata::for_content("  two  words\nhere ");
        assert_eq!(m.word_count, 3);
        assert_eq!(m.character_count, 18);
        assert_eq!(NoteMetadata::for_content("").word_count, 0);
    }

    #[test]
    fn draft_validation_collects_all_errors() {
        let draft = NoteDraft {
            title: "x".repeat(201),
            tags: vec!["t".repeat(51)],
            ..Default::default()
        };
        match validate_draft(&draft).unwrap_err() {
            Error::Validation { errors } => {
                assert_eq!(errors.len(), 3);
                assert!(errors.contains(&"Username is required".to_string()));
                assert!(errors[1].starts_with("Title must be 200"));
                assert!(errors[2].starts_with("Each tag"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn patch_validation_checks_present_fields_only() {
        assert!(validate_patch(&NotePatch::default()).is_ok());
        let blank = NotePatch {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert!(validate_patch(&blank).is_err());
        let many = NotePatch {
            tags: Some((0..21).map(|i| i.to_string()).collect()),
            ..Default::default()
        };
        assert!(validate_patch(&many).is_err());
    }

    #[test]
    fn calendar_cutoff_bounds() {
        let year = calendar_cutoff(None).unwrap();
        let age = Utc::now() - year;
        assert!((364..=365).contains(&age.num_days()));

        assert!(calendar_cutoff(Some(0)).is_ok());
        assert!(calendar_cutoff(Some(MAX_CALENDAR_DAYS)).is_ok());
        assert!(matches!(
            calendar_cutoff(Some(1_000_000_000)),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(calendar_cutoff(Some(-7)), Err(Error::InvalidRequest(_))));
        assert!(matches!(calendar_cutoff(Some(i64::MAX)), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn category_and_order_wire_names() {
        assert_eq!(serde_json::to_string(&NoteCategory::Meetings).unwrap(), "\"meetings\"");
        assert_eq!(
            serde_json::from_str::<NoteOrder>("\"updatedAt\"").unwrap(),
            NoteOrder::UpdatedAt
        );
    }
}
