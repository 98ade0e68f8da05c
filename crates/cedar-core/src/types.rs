//! Core types for Cedar

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One of the two roleplayed voices.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Ego,
    Superego,
}

impl Persona {
    pub const ALL: [Persona; 2] = [Persona::Ego, Persona::Superego];

    pub fn other(&self) -> Persona {
        match self {
            Persona::Ego => Persona::Superego,
            Persona::Superego => Persona::Ego,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Ego => "ego",
            Persona::Superego => "superego",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Ego => "Ego",
            Persona::Superego => "Superego",
        }
    }

    /// Case-insensitive name lookup ("Ego", "SUPEREGO", ...).
    pub fn from_name(s: &str) -> Option<Persona> {
        match s.trim().to_lowercase().as_str() {
            "ego" => Some(Persona::Ego),
            "superego" => Some(Persona::Superego),
            _ => None,
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Who produced a message.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Ego,
    Superego,
    User,
}

impl AgentRole {
    pub fn persona(&self) -> Option<Persona> {
        match self {
            AgentRole::Ego => Some(Persona::Ego),
            AgentRole::Superego => Some(Persona::Superego),
            AgentRole::User => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Ego => "Ego",
            AgentRole::Superego => "Superego",
            AgentRole::User => "User",
        }
    }
}

impl From<Persona> for AgentRole {
    fn from(p: Persona) -> Self {
        match p {
            Persona::Ego => AgentRole::Ego,
            Persona::Superego => AgentRole::Superego,
        }
    }
}

/// Target of a `[To: X]` tag.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Addressee {
    Ego,
    Superego,
    User,
}

impl Addressee {
    pub fn persona(&self) -> Option<Persona> {
        match self {
            Addressee::Ego => Some(Persona::Ego),
            Addressee::Superego => Some(Persona::Superego),
            Addressee::User => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Addressee::Ego => "Ego",
            Addressee::Superego => "Superego",
            Addressee::User => "User",
        }
    }

    pub fn from_name(s: &str) -> Option<Addressee> {
        match s.trim().to_lowercase().as_str() {
            "ego" => Some(Addressee::Ego),
            "superego" => Some(Addressee::Superego),
            "user" => Some(Addressee::User),
            _ => None,
        }
    }
}

impl From<Persona> for Addressee {
    fn from(p: Persona) -> Self {
        match p {
            Persona::Ego => Addressee::Ego,
            Persona::Superego => Addressee::Superego,
        }
    }
}

/// A message in a dual-agent conversation. The client holds the history and
/// sends it back on every request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Addressee>,
}

impl AgentMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            agent: Some(AgentRole::User),
            to: None,
        }
    }

    pub fn persona(persona: Persona, content: impl Into<String>, to: Addressee) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            agent: Some(persona.into()),
            to: Some(to),
        }
    }

    /// The persona that wrote this message, if any.
    pub fn speaker(&self) -> Option<Persona> {
        self.agent.and_then(|a| a.persona())
    }

    /// Display name used in transcripts; untagged messages count as the user.
    pub fn speaker_name(&self) -> &'static str {
        self.agent.unwrap_or(AgentRole::User).display_name()
    }
}

/// Conversation mode requested by the client.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    #[default]
    Listen,
    Solve,
}

impl ConversationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationMode::Listen => "listen",
            ConversationMode::Solve => "solve",
        }
    }
}

/// Per-agent message counts in a summarized conversation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentInteractions {
    pub ego: usize,
    pub superego: usize,
    pub user: usize,
}

impl AgentInteractions {
    pub fn count(messages: &[AgentMessage]) -> Self {
        let mut counts = Self::default();
        for msg in messages {
            match msg.agent {
                Some(AgentRole::Ego) => counts.ego += 1,
                Some(AgentRole::Superego) => counts.superego += 1,
                Some(AgentRole::User) => counts.user += 1,
                None => {}
            }
        }
        counts
    }
}

/// A summarized conversation, persisted as `{id}.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationMemory {
    pub id: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Human-readable date, e.g. "Sunday, October 18, 2026".
    pub date: String,
    /// Human-readable time, e.g. "03:15 PM".
    pub time: String,
    pub summary: String,
    pub key_topics: Vec<String>,
    pub insights: Vec<String>,
    pub psychological_themes: Vec<String>,
    pub recommendations: Vec<String>,
    pub memory_tags: Vec<String>,
    pub emotional_tone: String,
    pub user_concerns: Vec<String>,
    pub resolutions: Vec<String>,
    pub agent_interactions: AgentInteractions,
    pub conversation_length: usize,
    pub storage_path: String,
}

/// Whether a string is safe to use as a record id (and therefore file stem).
pub fn is_valid_record_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Gateway configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: BindMode,
    pub auth: AuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind: BindMode::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Bind mode for the gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub token: Option<String>,
}

/// Authentication mode
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Token,
    #[default]
    None,
}
