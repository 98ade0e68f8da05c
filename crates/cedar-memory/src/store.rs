//! Conversation memory store
//!
//! Layout: `{dir}/{id}.json`, one pretty-printed [`ConversationMemory`] per
//! file. Every query scans the directory; there is no index.

use cedar_core::{is_valid_record_id, ConversationMemory, Error, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Date,
    Topics,
    Length,
    /// Also the fallback for unrecognized sort keys.
    #[default]
    #[serde(other)]
    Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Apply this direction to an ascending comparison.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Search, sort and pagination parameters (`GET /api/memory` query string).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryQuery {
    pub search: Option<String>,
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            search: None,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPage {
    pub memories: Vec<ConversationMemory>,
    /// Matches before pagination.
    pub total_count: usize,
    pub search_query: Option<String>,
    pub pagination: Pagination,
}

/// Case-insensitive substring match over summary, topics, tags, concerns
/// and themes.
pub fn matches_query(memory: &ConversationMemory, query: &str) -> bool {
    let q = query.to_lowercase();
    let hit = |s: &String| s.to_lowercase().contains(&q);
    hit(&memory.summary)
        || memory.key_topics.iter().any(hit)
        || memory.memory_tags.iter().any(hit)
        || memory.user_concerns.iter().any(hit)
        || memory.psychological_themes.iter().any(hit)
}

/// Any of `topics` is a substring of a key topic or theme.
pub fn matches_topics(memory: &ConversationMemory, topics: &[String]) -> bool {
    topics.iter().any(|topic| {
        let t = topic.to_lowercase();
        memory
            .key_topics
            .iter()
            .chain(memory.psychological_themes.iter())
            .any(|k| k.to_lowercase().contains(&t))
    })
}

fn timestamp_millis(memory: &ConversationMemory) -> i64 {
    DateTime::parse_from_rfc3339(&memory.timestamp)
        .map(|t| t.timestamp_millis())
        .unwrap_or(0)
}

fn sort_memories(memories: &mut [ConversationMemory], by: SortBy, order: SortOrder) {
    memories.sort_by(|a, b| {
        let ord = match by {
            SortBy::Timestamp | SortBy::Date => timestamp_millis(a).cmp(&timestamp_millis(b)),
            SortBy::Topics => a.key_topics.len().cmp(&b.key_topics.len()),
            SortBy::Length => a.conversation_length.cmp(&b.conversation_length),
        };
        order.apply(ord)
    });
}

pub struct MemoryStore {
    dir: PathBuf,
}

impl MemoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_record_id(id) {
            return Err(Error::invalid(format!("invalid memory id: {}", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Persist a memory, filling in `storage_path`. Written to a temp file
    /// and renamed into place.
    pub async fn save(&self, mut memory: ConversationMemory) -> Result<ConversationMemory> {
        let path = self.record_path(&memory.id)?;
        memory.storage_path = path.display().to_string();

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!("{}.json.tmp", memory.id));
        let body = serde_json::to_vec_pretty(&memory)?;
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("wrote {} ({} bytes)", path.display(), body.len());
        Ok(memory)
    }

    pub async fn get(&self, id: &str) -> Result<ConversationMemory> {
        let path = self.record_path(id)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("memory", id));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// Every readable memory. A missing directory is an empty store.
    pub async fn load_all(&self) -> Result<Vec<ConversationMemory>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut memories = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = match tokio::fs::read(&path).await {
                Ok(data) => serde_json::from_slice::<ConversationMemory>(&data)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(memory) => memories.push(memory),
                Err(e) => warn!("Skipping memory file {}: {}", path.display(), e),
            }
        }
        Ok(memories)
    }

    pub async fn search(&self, query: &MemoryQuery) -> Result<MemoryPage> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut memories = self.load_all().await?;
        if let Some(q) = search {
            memories.retain(|m| matches_query(m, q));
        }
        sort_memories(&mut memories, query.sort_by, query.sort_order);

        let total_count = memories.len();
        let page: Vec<_> = memories
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(MemoryPage {
            memories: page,
            total_count,
            search_query: search.map(str::to_string),
            pagination: Pagination {
                limit: query.limit,
                offset: query.offset,
                has_more: query.offset.saturating_add(query.limit) < total_count,
            },
        })
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<ConversationMemory>> {
        let mut memories = self.load_all().await?;
        sort_memories(&mut memories, SortBy::Timestamp, SortOrder::Desc);
        memories.truncate(limit);
        Ok(memories)
    }

    pub async fn contextual(&self, topics: &[String]) -> Result<Vec<ConversationMemory>> {
        let mut memories = self.load_all().await?;
        memories.retain(|m| matches_topics(m, topics));
        sort_memories(&mut memories, SortBy::Timestamp, SortOrder::Desc);
        Ok(memories)
    }
}
