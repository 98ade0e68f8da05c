//! Dual-agent dispatcher
//!
//! One call to [`Dispatcher::step`] produces exactly one persona reply. The
//! conversation lives on the client; every request carries the full history,
//! the turn counter and whose turn it is.
//!
//! Step kinds, checked in order:
//! 1. turn limit reached → closing message, no model call
//! 2. user input → router picks the responder, who answers the user
//! 3. start (or empty history) → opening greeting to the user
//! 4. otherwise → autonomous turn, usually aimed at the other persona

use crate::bracket::{self, BracketReply};
use crate::config::DialogueConfig;
use crate::prompts::{
    build_system_prompt, intro, speaker_tag, PromptContext, CLOSING_MESSAGE, EMPTY_REPLY,
    REFORMAT_PROMPT,
};
use crate::router::Router;
use cedar_core::{
    Addressee, AgentMessage, DualAgentRequest, DualAgentResponse, Persona, Result, Role,
    RouteReason,
};
use cedar_llm::{LlmMessage, LlmProvider, LlmRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const START_INSTRUCTION: &str = "Begin the conversation: greet the user warmly, introduce \
yourself in one sentence and invite them to share what is on their mind.";

pub struct Dispatcher {
    provider: Arc<dyn LlmProvider>,
    router: Router,
    config: DialogueConfig,
    rng: Mutex<StdRng>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn LlmProvider>, config: DialogueConfig) -> Self {
        Self::with_rng(provider, config, StdRng::from_entropy())
    }

    /// Deterministic persona picks and interjections, for tests.
    pub fn with_seed(provider: Arc<dyn LlmProvider>, config: DialogueConfig, seed: u64) -> Self {
        Self::with_rng(provider, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(provider: Arc<dyn LlmProvider>, config: DialogueConfig, rng: StdRng) -> Self {
        Self {
            router: Router::new(provider.clone(), config.clone()),
            provider,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    /// Produce the next reply in the conversation.
    pub async fn step(
        &self,
        req: &DualAgentRequest,
        memory_context: Option<&str>,
    ) -> Result<DualAgentResponse> {
        if req.turn_count >= req.max_turns {
            info!(
                "Turn limit reached ({}/{}), closing conversation",
                req.turn_count, req.max_turns
            );
            let agent = req.current_agent.unwrap_or(Persona::Ego);
            return Ok(DualAgentResponse {
                role: Role::Assistant,
                content: CLOSING_MESSAGE.to_string(),
                agent,
                to: Addressee::User,
                turn_count: req.turn_count,
                current_agent: agent,
                conversation_complete: true,
                user_message: None,
                routed_by: None,
            });
        }

        if let Some(text) = req.user_text() {
            return self.user_turn(req, text, memory_context).await;
        }

        if req.start_conversation || req.messages.is_empty() {
            return self.opening_turn(req, memory_context).await;
        }

        self.autonomous_turn(req, memory_context).await
    }

    async fn user_turn(
        &self,
        req: &DualAgentRequest,
        text: &str,
        memory_context: Option<&str>,
    ) -> Result<DualAgentResponse> {
        let user_message = AgentMessage::user(text);
        let mut history = req.messages.clone();
        history.push(user_message.clone());

        let default = req.current_agent.unwrap_or(Persona::Ego);
        let decision = self.router.route(&history, default).await?;
        info!(
            "User turn routed to {} ({:?})",
            decision.responder, decision.reason
        );

        let reply = self
            .speak(decision.responder, &history, Addressee::User, req, memory_context)
            .await?;
        let content = non_empty(reply.content, EMPTY_REPLY);
        Ok(self.respond(
            req,
            decision.responder,
            Addressee::User,
            reply.to,
            content,
            req.turn_count + 1,
            Some(user_message),
            Some(decision.reason),
        ))
    }

    async fn opening_turn(
        &self,
        req: &DualAgentRequest,
        memory_context: Option<&str>,
    ) -> Result<DualAgentResponse> {
        let speaker = match req.current_agent {
            Some(p) => p,
            None => self.random_persona(),
        };
        info!("Starting conversation with {}", speaker);

        let mut history = req.messages.clone();
        history.push(AgentMessage {
            role: Role::User,
            content: format!("{}\nYour usual introduction: {}", START_INSTRUCTION, intro(speaker)),
            agent: None,
            to: Some(speaker.into()),
        });

        let reply = self
            .speak(speaker, &history, Addressee::User, req, memory_context)
            .await?;
        let content = non_empty(reply.content, intro(speaker));
        Ok(self.respond(
            req,
            speaker,
            Addressee::User,
            reply.to,
            content,
            1,
            None,
            None,
        ))
    }

    async fn autonomous_turn(
        &self,
        req: &DualAgentRequest,
        memory_context: Option<&str>,
    ) -> Result<DualAgentResponse> {
        let speaker = req.current_agent.unwrap_or(Persona::Ego);

        let streak = persona_streak(&req.messages);
        let audience = if streak >= self.config.interjection_streak && self.roll_interjection() {
            debug!("{} interjects to the user after {} persona messages", speaker, streak);
            Addressee::User
        } else {
            speaker.other().into()
        };

        let reply = self
            .speak(speaker, &req.messages, audience, req, memory_context)
            .await?;
        let content = non_empty(reply.content, EMPTY_REPLY);
        Ok(self.respond(
            req,
            speaker,
            audience,
            reply.to,
            content,
            req.turn_count + 1,
            None,
            None,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn respond(
        &self,
        req: &DualAgentRequest,
        speaker: Persona,
        audience: Addressee,
        parsed_to: Option<Addressee>,
        content: String,
        turn_count: u32,
        user_message: Option<AgentMessage>,
        routed_by: Option<RouteReason>,
    ) -> DualAgentResponse {
        let to = match parsed_to {
            Some(to) if to.persona() != Some(speaker) => to,
            _ => audience,
        };
        let current_agent = match to.persona() {
            Some(next) if next != speaker => next,
            _ => speaker.other(),
        };
        DualAgentResponse {
            role: Role::Assistant,
            content,
            agent: speaker,
            to,
            turn_count,
            current_agent,
            conversation_complete: turn_count >= req.max_turns,
            user_message,
            routed_by,
        }
    }

    /// Ask `persona` for a reply to `history`, aimed at `audience`.
    async fn speak(
        &self,
        persona: Persona,
        history: &[AgentMessage],
        audience: Addressee,
        req: &DualAgentRequest,
        memory_context: Option<&str>,
    ) -> Result<BracketReply> {
        let ctx = PromptContext {
            mode: req.mode,
            user_name: req.user_name.as_deref(),
            memory_context,
            audience,
        };
        let request = LlmRequest {
            model: self.config.chat_model.clone(),
            system: Some(build_system_prompt(persona, &ctx)),
            messages: persona_view(persona, history),
            temperature: Some(self.config.dialogue_temperature),
            max_tokens: self.config.max_reply_tokens,
        };

        let raw = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.into_core(self.provider.name()))?;
        let reply = bracket::parse(&raw);

        if reply.conforming || !self.config.reformat_nonconforming || raw.trim().is_empty() {
            return Ok(reply);
        }

        debug!("{} reply ignored the bracket format, reformatting", persona);
        match self.reformat(&raw, audience).await {
            Ok(text) => {
                let reformatted = bracket::parse(&text);
                if reformatted.content.trim().is_empty() {
                    Ok(reply)
                } else {
                    Ok(reformatted)
                }
            }
            Err(e) => {
                warn!("Reformat call failed, keeping original reply: {}", e);
                Ok(reply)
            }
        }
    }

    async fn reformat(&self, raw: &str, audience: Addressee) -> cedar_llm::LlmResult<String> {
        let request = LlmRequest {
            model: self.config.reformat_model.clone(),
            system: Some(REFORMAT_PROMPT.to_string()),
            messages: vec![LlmMessage::user(format!(
                "Intended recipient: {}\n\nMessage:\n{}",
                audience.display_name(),
                raw.trim()
            ))],
            temperature: Some(self.config.reformat_temperature),
            max_tokens: None,
        };
        self.provider.complete(request).await
    }

    fn random_persona(&self) -> Persona {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        if rng.gen_bool(0.5) {
            Persona::Ego
        } else {
            Persona::Superego
        }
    }

    fn roll_interjection(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>() < self.config.interjection_probability
    }
}

/// History as seen by `persona`: its own messages as assistant turns,
/// everyone else's as user turns prefixed with a speaker tag.
pub fn persona_view(persona: Persona, history: &[AgentMessage]) -> Vec<LlmMessage> {
    history
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            if m.speaker() == Some(persona) {
                LlmMessage::assistant(m.content.clone())
            } else {
                LlmMessage::user(format!("{} {}", speaker_tag(m), m.content))
            }
        })
        .collect()
}

/// Trailing run of persona messages addressed to the other persona.
pub fn persona_streak(history: &[AgentMessage]) -> usize {
    history
        .iter()
        .rev()
        .take_while(|m| {
            m.speaker().is_some() && m.to.and_then(|to| to.persona()).is_some()
        })
        .count()
}

fn non_empty(content: String, fallback: &str) -> String {
    if content.trim().is_empty() {
        fallback.to_string()
    } else {
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_view_tags_other_speakers() {
        let history = vec![
            AgentMessage {
                role: Role::System,
                content: "hidden".into(),
                agent: None,
                to: None,
            },
            AgentMessage::user("I can't sleep"),
            AgentMessage::persona(Persona::Ego, "User, since when?", Addressee::User),
            AgentMessage::persona(Persona::Superego, "Ego, be gentle.", Addressee::Ego),
        ];
        let view = persona_view(Persona::Ego, &history);
        assert_eq!(view.len(), 3);
        assert_eq!(view[0], LlmMessage::user("[USER] I can't sleep"));
        assert_eq!(view[1], LlmMessage::assistant("User, since when?"));
        assert_eq!(view[2], LlmMessage::user("[SUPEREGO] Ego, be gentle."));
    }

    #[test]
    fn streak_counts_persona_to_persona_tail() {
        let history = vec![
            AgentMessage::user("hi"),
            AgentMessage::persona(Persona::Ego, "a", Addressee::User),
            AgentMessage::persona(Persona::Superego, "b", Addressee::Ego),
            AgentMessage::persona(Persona::Ego, "c", Addressee::Superego),
        ];
        assert_eq!(persona_streak(&history), 2);
        assert_eq!(persona_streak(&history[..2]), 0);
        assert_eq!(persona_streak(&[]), 0);
    }

    #[test]
    fn non_empty_falls_back() {
        assert_eq!(non_empty("  ".into(), "x"), "x");
        assert_eq!(non_empty("y".into(), "x"), "y");
    }
}
