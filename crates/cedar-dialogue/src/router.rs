//! Responder routing for user messages
//!
//! An auxiliary LLM call names the persona that should answer. When its
//! reply can't be parsed, a priority-ordered fallback applies:
//! addressed persona → reply-count balance → long silence → default.

use crate::bracket;
use crate::config::DialogueConfig;
use crate::prompts::{render_transcript, ROUTER_PROMPT};
use cedar_core::{AgentMessage, Persona, Result, RouteReason};
use cedar_llm::{LlmMessage, LlmProvider, LlmRequest};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

static ROUTER_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\bagent\s*:\s*(ego|superego)\b").expect("valid regex"),
        Regex::new(r"(?i)\[\s*responder\s*:\s*(ego|superego)\s*\]").expect("valid regex"),
        Regex::new(r"(?i)\[\s*to\s*:\s*(ego|superego)\s*\]").expect("valid regex"),
    ]
});

// "Ego, ..." / "Superego: ..." at the start of a message.
static VOCATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(ego|superego)\s*[,:]").expect("valid regex"));

/// Persona named by a router reply, trying each accepted pattern in order.
pub fn parse_router_output(text: &str) -> Option<Persona> {
    ROUTER_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|c| Persona::from_name(&c[1]))
}

/// The persona a message is aimed at: its `to` field, a `[To: X]` tag, or
/// an opening "Ego," / "Superego:".
pub fn addressed_persona(msg: &AgentMessage) -> Option<Persona> {
    if let Some(to) = msg.to {
        return to.persona();
    }
    if let Some(to) = bracket::parse_target(&msg.content) {
        return to.persona();
    }
    VOCATIVE
        .captures(&msg.content)
        .and_then(|c| Persona::from_name(&c[1]))
}

/// Reply counts and silence streaks derived from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversationStats {
    pub ego_replies: usize,
    pub superego_replies: usize,
    /// Messages since Ego last spoke (whole history if it never did).
    pub ego_silence: usize,
    /// Messages since Superego last spoke.
    pub superego_silence: usize,
}

impl ConversationStats {
    pub fn from_history(history: &[AgentMessage]) -> Self {
        let mut stats = Self {
            ego_silence: history.len(),
            superego_silence: history.len(),
            ..Self::default()
        };
        for (i, msg) in history.iter().enumerate() {
            let since = history.len() - i - 1;
            match msg.speaker() {
                Some(Persona::Ego) => {
                    stats.ego_replies += 1;
                    stats.ego_silence = since;
                }
                Some(Persona::Superego) => {
                    stats.superego_replies += 1;
                    stats.superego_silence = since;
                }
                None => {}
            }
        }
        stats
    }

    pub fn replies(&self, persona: Persona) -> usize {
        match persona {
            Persona::Ego => self.ego_replies,
            Persona::Superego => self.superego_replies,
        }
    }

    pub fn silence(&self, persona: Persona) -> usize {
        match persona {
            Persona::Ego => self.ego_silence,
            Persona::Superego => self.superego_silence,
        }
    }
}

/// Rule-based choice used when the router reply is unusable.
pub fn fallback_responder(
    history: &[AgentMessage],
    default: Persona,
    config: &DialogueConfig,
) -> (Persona, RouteReason) {
    if let Some(persona) = history.last().and_then(addressed_persona) {
        return (persona, RouteReason::Addressed);
    }

    let stats = ConversationStats::from_history(history);

    for persona in Persona::ALL {
        if stats.replies(persona) + config.balance_gap <= stats.replies(persona.other()) {
            return (persona, RouteReason::Balance);
        }
    }

    let quiet: Vec<Persona> = Persona::ALL
        .into_iter()
        .filter(|p| stats.silence(*p) >= config.silence_turns)
        .collect();
    match quiet.as_slice() {
        [one] => return (*one, RouteReason::Silence),
        [a, b] => {
            let pick = match stats.silence(*a).cmp(&stats.silence(*b)) {
                std::cmp::Ordering::Greater => *a,
                std::cmp::Ordering::Less => *b,
                std::cmp::Ordering::Equal => default,
            };
            return (pick, RouteReason::Silence);
        }
        _ => {}
    }

    (default, RouteReason::Default)
}

/// Outcome of a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub responder: Persona,
    pub reason: RouteReason,
}

pub struct Router {
    provider: Arc<dyn LlmProvider>,
    config: DialogueConfig,
}

impl Router {
    pub fn new(provider: Arc<dyn LlmProvider>, config: DialogueConfig) -> Self {
        Self { provider, config }
    }

    /// Choose the persona that answers the last message in `history`.
    pub async fn route(&self, history: &[AgentMessage], default: Persona) -> Result<RouteDecision> {
        let window_start = history.len().saturating_sub(self.config.router_window);
        let transcript = render_transcript(&history[window_start..]);

        let request = LlmRequest {
            model: self.config.router_model.clone(),
            system: Some(ROUTER_PROMPT.to_string()),
            messages: vec![LlmMessage::user(format!(
                "Recent conversation:\n\n{}\n\nWhich persona should respond next?",
                transcript
            ))],
            temperature: Some(self.config.router_temperature),
            max_tokens: Some(20),
        };

        let raw = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.into_core(self.provider.name()))?;

        if let Some(responder) = parse_router_output(&raw) {
            debug!("Router chose {} from {:?}", responder, raw.trim());
            return Ok(RouteDecision {
                responder,
                reason: RouteReason::Llm,
            });
        }

        let (responder, reason) = fallback_responder(history, default, &self.config);
        info!(
            "Router reply unparseable ({:?}); fell back to {} via {:?}",
            raw.trim(),
            responder,
            reason
        );
        Ok(RouteDecision { responder, reason })
    }
}
