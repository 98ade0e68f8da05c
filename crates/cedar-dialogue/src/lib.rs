//! Cedar Dialogue - Ego/Superego turn dispatch over an LLM
//!
//! - `bracket`: the `[To: X] [Content: Y]` reply convention
//! - `router`: which persona answers a user message
//! - `dispatcher`: one conversation step (start, user turn, autonomous turn)
//! - `summarizer`: transcript → structured memory record

pub mod bracket;
pub mod config;
pub mod dispatcher;
pub mod prompts;
pub mod router;
pub mod summarizer;

pub use bracket::BracketReply;
pub use config::DialogueConfig;
pub use dispatcher::Dispatcher;
pub use router::{ConversationStats, RouteDecision, Router};
pub use summarizer::{SummaryOutcome, Summarizer};
