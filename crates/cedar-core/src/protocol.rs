//! HTTP wire protocol for the dual-agent and summarizer endpoints
//!
//! Dual-agent step (client → server):
//!   { "messages": [...], "currentAgent": "ego", "turnCount": 3, "maxTurns": 100,
//!     "userInput": "I can't decide", "mode": "listen" }
//!
//! Dual-agent step (server → client):
//!   { "role": "assistant", "content": "...", "agent": "ego", "to": "user",
//!     "turnCount": 4, "currentAgent": "superego", "conversationComplete": false }
//!
//! Errors on every endpoint:
//!   { "error": "message" }   (plus "details" for validation failures)

use crate::types::{Addressee, AgentMessage, ConversationMemory, ConversationMode, Persona, Role};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TURNS: u32 = 100;

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

// ---------------------------------------------------------------------------
// Dual-agent step
// ---------------------------------------------------------------------------

/// One dispatcher step. All conversation state travels with the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualAgentRequest {
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub current_agent: Option<Persona>,
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default)]
    pub start_conversation: bool,
    #[serde(default)]
    pub user_input: Option<String>,
    #[serde(default)]
    pub mode: ConversationMode,
    #[serde(default)]
    pub user_name: Option<String>,
    /// Inject insights from stored memories into the persona prompt.
    #[serde(default)]
    pub use_memory: bool,
}

impl Default for DualAgentRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            current_agent: None,
            turn_count: 0,
            max_turns: DEFAULT_MAX_TURNS,
            start_conversation: false,
            user_input: None,
            mode: ConversationMode::default(),
            user_name: None,
            use_memory: false,
        }
    }
}

impl DualAgentRequest {
    /// The user's new text, if any non-blank text was sent.
    pub fn user_text(&self) -> Option<&str> {
        self.user_input
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Which rule chose the responding persona.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteReason {
    /// The router LLM named a persona.
    Llm,
    /// The previous message addressed a persona.
    Addressed,
    /// A persona had fallen behind in reply count.
    Balance,
    /// A persona had been silent too long.
    Silence,
    /// Caller-supplied default.
    Default,
}

/// Result of one dispatcher step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualAgentResponse {
    pub role: Role,
    pub content: String,
    /// Persona that produced `content`.
    pub agent: Persona,
    /// Who `content` is addressed to.
    pub to: Addressee,
    pub turn_count: u32,
    /// Persona expected to speak next.
    pub current_agent: Persona,
    pub conversation_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<AgentMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routed_by: Option<RouteReason>,
}

impl DualAgentResponse {
    /// The reply as a history entry the client appends.
    pub fn as_message(&self) -> AgentMessage {
        AgentMessage::persona(self.agent, self.content.clone(), self.to)
    }
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub success: bool,
    pub summary: ConversationMemory,
    pub storage_path: String,
    /// False when the model's reply was not valid JSON and the raw text was used.
    pub structured: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}
