//! Transcript summarizer
//!
//! Turns a finished conversation into a [`ConversationMemory`]. The model is
//! asked for JSON; anything else is kept verbatim as the summary text with
//! fixed placeholder lists.

use crate::config::DialogueConfig;
use crate::prompts::{render_transcript, SUMMARIZER_PROMPT};
use cedar_core::{
    is_valid_record_id, AgentInteractions, AgentMessage, ConversationMemory, Error, Result,
};
use cedar_llm::{LlmMessage, LlmProvider, LlmRequest};
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use rand::Rng;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Fields the model is asked to produce. Everything is optional so a
/// partially filled object still counts as structured.
#[derive(Debug, Default)]
pub struct Analysis {
    pub summary: Option<String>,
    pub key_topics: Option<Vec<String>>,
    pub insights: Option<Vec<String>>,
    pub psychological_themes: Option<Vec<String>>,
    pub recommendations: Option<Vec<String>>,
    pub memory_tags: Option<Vec<String>>,
    pub emotional_tone: Option<String>,
    pub user_concerns: Option<Vec<String>>,
    pub resolutions: Option<Vec<String>>,
}

impl Analysis {
    /// Placeholder analysis wrapping unparseable model output.
    pub fn unstructured(raw: &str) -> Self {
        let list = |s: &str| Some(vec![s.to_string()]);
        Self {
            summary: Some(raw.trim().to_string()),
            key_topics: list("conversation analysis"),
            insights: list("AI-generated insights"),
            psychological_themes: list("psychological exploration"),
            recommendations: list("continue the conversation"),
            memory_tags: list("conversation"),
            emotional_tone: Some("neutral".into()),
            user_concerns: list("general discussion"),
            resolutions: list("ongoing exploration"),
        }
    }

    /// Read fields leniently from any JSON object: a bare string stands in
    /// for a one-element list, and mistyped fields fall back to defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(text_field);
        let list = |key: &str| obj.get(key).and_then(list_field);
        Some(Self {
            summary: text("summary"),
            key_topics: list("keyTopics"),
            insights: list("insights"),
            psychological_themes: list("psychologicalThemes"),
            recommendations: list("recommendations"),
            memory_tags: list("memoryTags"),
            emotional_tone: text("emotionalTone"),
            user_concerns: list("userConcerns"),
            resolutions: list("resolutions"),
        })
    }
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn list_field(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(text_field)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
        _ => None,
    }
}

/// Parse a model reply, tolerating a Markdown code fence or prose around
/// the JSON object.
pub fn parse_analysis(raw: &str) -> Option<Analysis> {
    let body = strip_code_fence(raw);
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(analysis) = Analysis::from_value(&value) {
            return Some(analysis);
        }
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&body[start..=end]).ok()?;
    Analysis::from_value(&value)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line ("```json").
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// `summary_{millis}_{9 base36 chars}`.
pub fn generate_summary_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("summary_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Assemble the memory record. `storage_path` is left empty for the store
/// to fill in.
pub fn build_memory<Tz>(
    id: String,
    analysis: Analysis,
    messages: &[AgentMessage],
    now: DateTime<Tz>,
) -> ConversationMemory
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ConversationMemory {
        id,
        timestamp: now
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        date: now.format("%A, %B %-d, %Y").to_string(),
        time: now.format("%I:%M %p").to_string(),
        summary: analysis
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "No summary available".into()),
        key_topics: analysis.key_topics.unwrap_or_default(),
        insights: analysis.insights.unwrap_or_default(),
        psychological_themes: analysis.psychological_themes.unwrap_or_default(),
        recommendations: analysis.recommendations.unwrap_or_default(),
        memory_tags: analysis.memory_tags.unwrap_or_default(),
        emotional_tone: analysis
            .emotional_tone
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "neutral".into()),
        user_concerns: analysis.user_concerns.unwrap_or_default(),
        resolutions: analysis.resolutions.unwrap_or_default(),
        agent_interactions: AgentInteractions::count(messages),
        conversation_length: messages.len(),
        storage_path: String::new(),
    }
}

/// A summarized conversation plus whether the model returned valid JSON.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub memory: ConversationMemory,
    pub structured: bool,
}

pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    config: DialogueConfig,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn LlmProvider>, config: DialogueConfig) -> Self {
        Self { provider, config }
    }

    pub async fn summarize(
        &self,
        messages: &[AgentMessage],
        conversation_id: Option<&str>,
    ) -> Result<SummaryOutcome> {
        if messages.is_empty() {
            return Err(Error::invalid("No conversation messages provided"));
        }
        let id = match conversation_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) if is_valid_record_id(id) => id.to_string(),
            Some(id) => return Err(Error::invalid(format!("invalid conversation id: {}", id))),
            None => generate_summary_id(),
        };

        let request = LlmRequest {
            model: self.config.summarizer_model.clone(),
            system: Some(SUMMARIZER_PROMPT.to_string()),
            messages: vec![LlmMessage::user(format!(
                "Please analyze the following conversation between psychological agents and a user:\n\n{}\n\nProvide a comprehensive analysis following the specified JSON format.",
                render_transcript(messages)
            ))],
            temperature: Some(self.config.summarizer_temperature),
            max_tokens: None,
        };

        let raw = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.into_core(self.provider.name()))?;

        let (analysis, structured) = match parse_analysis(&raw) {
            Some(analysis) => (analysis, true),
            None => {
                warn!("Summary for {} was not valid JSON, storing raw text", id);
                (Analysis::unstructured(&raw), false)
            }
        };

        let memory = build_memory(id, analysis, messages, Local::now());
        info!(
            "Summarized {} messages into {} ({} topics)",
            memory.conversation_length,
            memory.id,
            memory.key_topics.len()
        );
        Ok(SummaryOutcome { memory, structured })
    }
}
