//! Dialogue tuning
//!
//! Models, temperatures and turn-taking thresholds. Embedded as the
//! `[dialogue]` section of the gateway's TOML config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Model for persona replies.
    pub chat_model: String,
    /// Model for the routing call.
    pub router_model: String,
    /// Model for transcript summaries.
    pub summarizer_model: String,
    /// Model for reformatting non-conforming replies.
    pub reformat_model: String,

    pub dialogue_temperature: f32,
    pub router_temperature: f32,
    pub summarizer_temperature: f32,
    pub reformat_temperature: f32,

    /// Output cap for persona replies (None = provider default).
    pub max_reply_tokens: Option<u32>,

    /// A persona that has replied this many fewer times is routed to.
    pub balance_gap: usize,
    /// A persona silent for this many messages is routed to.
    pub silence_turns: usize,
    /// Messages of history shown to the router.
    pub router_window: usize,

    /// Chance an autonomous turn is aimed at the user instead of the other persona.
    pub interjection_probability: f64,
    /// Persona-to-persona messages needed before an interjection is possible.
    pub interjection_streak: usize,

    /// Issue one reformat call when a reply ignores the bracket convention.
    pub reformat_nonconforming: bool,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o-mini".into(),
            router_model: "gpt-4o-mini".into(),
            summarizer_model: "gpt-4o-mini".into(),
            reformat_model: "gpt-4o-mini".into(),
            dialogue_temperature: 0.7,
            router_temperature: 0.0,
            summarizer_temperature: 0.3,
            reformat_temperature: 0.0,
            max_reply_tokens: None,
            balance_gap: 2,
            silence_turns: 6,
            router_window: 12,
            interjection_probability: 0.35,
            interjection_streak: 2,
            reformat_nonconforming: true,
        }
    }
}
