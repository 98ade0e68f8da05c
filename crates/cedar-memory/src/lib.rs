//! Cedar Memory - flat-file conversation memories and per-user notes
//!
//! - `store`: one JSON file per summarized conversation, linear-scan queries
//! - `insights`: prompt digests, name extraction and conversation starters
//! - `notes`: the `NoteStore` trait and its file-backed implementation

pub mod insights;
pub mod notes;
pub mod store;

pub use insights::{
    conversation_starter, extract_personal_info, format_for_agent, memory_insights, PersonalInfo,
};
pub use notes::{
    DayCount, FileNoteStore, Note, NoteCategory, NoteDraft, NoteFilter, NoteOrder, NotePatch,
    NotePriority, NoteStore,
};
pub use store::{MemoryPage, MemoryQuery, MemoryStore, Pagination, SortBy, SortOrder};
