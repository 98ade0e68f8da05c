//! Tests for cedar-core: types, wire protocol, errors

use cedar_core::*;

// ===========================================================================
// Persona / AgentRole / Addressee
// ===========================================================================

#[test]
fn persona_other_alternates() {
    assert_eq!(Persona::Ego.other(), Persona::Superego);
    assert_eq!(Persona::Superego.other(), Persona::Ego);
    assert_eq!(Persona::Ego.other().other(), Persona::Ego);
}

#[test]
fn persona_from_name_is_case_insensitive() {
    assert_eq!(Persona::from_name("Ego"), Some(Persona::Ego));
    assert_eq!(Persona::from_name(" SUPEREGO "), Some(Persona::Superego));
    assert_eq!(Persona::from_name("user"), None);
    assert_eq!(Persona::from_name("id"), None);
}

#[test]
fn persona_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Persona::Ego).unwrap(), r#""ego""#);
    assert_eq!(serde_json::to_string(&Persona::Superego).unwrap(), r#""superego""#);
}

#[test]
fn addressee_persona_mapping() {
    assert_eq!(Addressee::Ego.persona(), Some(Persona::Ego));
    assert_eq!(Addressee::Superego.persona(), Some(Persona::Superego));
    assert_eq!(Addressee::User.persona(), None);
    assert_eq!(Addressee::from_name("user"), Some(Addressee::User));
    assert_eq!(Addressee::from(Persona::Superego), Addressee::Superego);
}

// ===========================================================================
// AgentMessage
// ===========================================================================

#[test]
fn agent_message_user_constructor() {
    let msg = AgentMessage::user("hello");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.agent, Some(AgentRole::User));
    assert_eq!(msg.speaker(), None);
    assert_eq!(msg.speaker_name(), "User");
}

#[test]
fn agent_message_persona_constructor() {
    let msg = AgentMessage::persona(Persona::Superego, "Ego, consider this.", Addressee::Ego);
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.speaker(), Some(Persona::Superego));
    assert_eq!(msg.to, Some(Addressee::Ego));
}

#[test]
fn agent_message_optional_fields_skipped() {
    let msg = AgentMessage {
        role: Role::System,
        content: "x".into(),
        agent: None,
        to: None,
    };
    let json = serde_json::to_string(&msg).unwrap();
    assert!(!json.contains("agent"));
    assert!(!json.contains("\"to\""));
}

#[test]
fn agent_message_parses_client_shape() {
    let msg: AgentMessage =
        serde_json::from_str(r#"{"role":"assistant","content":"hi","agent":"ego"}"#).unwrap();
    assert_eq!(msg.speaker(), Some(Persona::Ego));
    assert!(msg.to.is_none());
}

#[test]
fn agent_interactions_counts_per_agent() {
    let messages = vec![
        AgentMessage::user("a"),
        AgentMessage::persona(Persona::Ego, "b", Addressee::User),
        AgentMessage::persona(Persona::Superego, "c", Addressee::Ego),
        AgentMessage::persona(Persona::Ego, "d", Addressee::Superego),
    ];
    let counts = AgentInteractions::count(&messages);
    assert_eq!(counts, AgentInteractions { ego: 2, superego: 1, user: 1 });
}

// ===========================================================================
// ConversationMemory
// ===========================================================================

#[test]
fn conversation_memory_uses_camel_case() {
    let memory = ConversationMemory {
        id: "summary_1".into(),
        key_topics: vec!["work".into()],
        emotional_tone: "calm".into(),
        ..Default::default()
    };
    let json = serde_json::to_value(&memory).unwrap();
    assert_eq!(json["keyTopics"][0], "work");
    assert_eq!(json["emotionalTone"], "calm");
    assert!(json.get("agentInteractions").is_some());
}

#[test]
fn conversation_memory_tolerates_missing_fields() {
    let memory: ConversationMemory =
        serde_json::from_str(r#"{"id":"m1","summary":"short"}"#).unwrap();
    assert_eq!(memory.id, "m1");
    assert!(memory.key_topics.is_empty());
    assert_eq!(memory.conversation_length, 0);
}

#[test]
fn record_id_validation() {
    assert!(is_valid_record_id("summary_1700000000000_abc123xyz"));
    assert!(is_valid_record_id("note-42"));
    assert!(!is_valid_record_id(""));
    assert!(!is_valid_record_id("../etc/passwd"));
    assert!(!is_valid_record_id("a b"));
}

// ===========================================================================
// Protocol
// ===========================================================================

#[test]
fn dual_agent_request_defaults() {
    let req: DualAgentRequest = serde_json::from_str("{}").unwrap();
    assert!(req.messages.is_empty());
    assert_eq!(req.turn_count, 0);
    assert_eq!(req.max_turns, DEFAULT_MAX_TURNS);
    assert!(!req.start_conversation);
    assert_eq!(req.mode, ConversationMode::Listen);
    assert!(req.current_agent.is_none());
}

#[test]
fn dual_agent_request_camel_case_fields() {
    let req: DualAgentRequest = serde_json::from_str(
        r#"{"currentAgent":"superego","turnCount":4,"maxTurns":10,"userInput":"  hi  ","mode":"solve"}"#,
    )
    .unwrap();
    assert_eq!(req.current_agent, Some(Persona::Superego));
    assert_eq!(req.turn_count, 4);
    assert_eq!(req.max_turns, 10);
    assert_eq!(req.user_text(), Some("hi"));
    assert_eq!(req.mode, ConversationMode::Solve);
}

#[test]
fn blank_user_input_is_ignored() {
    let req = DualAgentRequest {
        user_input: Some("   ".into()),
        ..Default::default()
    };
    assert_eq!(req.user_text(), None);
}

#[test]
fn dual_agent_response_serializes_camel_case() {
    let resp = DualAgentResponse {
        role: Role::Assistant,
        content: "User, tell me more.".into(),
        agent: Persona::Ego,
        to: Addressee::User,
        turn_count: 2,
        current_agent: Persona::Superego,
        conversation_complete: false,
        user_message: None,
        routed_by: Some(RouteReason::Silence),
    };
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["turnCount"], 2);
    assert_eq!(json["currentAgent"], "superego");
    assert_eq!(json["conversationComplete"], false);
    assert_eq!(json["routedBy"], "silence");
    assert!(json.get("userMessage").is_none());
    assert_eq!(resp.as_message().to, Some(Addressee::User));
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_status_codes() {
    assert_eq!(Error::invalid("x").status_code(), 400);
    assert_eq!(Error::Validation { errors: vec![] }.status_code(), 400);
    assert_eq!(Error::PermissionDenied("x".into()).status_code(), 403);
    assert_eq!(Error::not_found("note", "n1").status_code(), 404);
    assert_eq!(Error::Unavailable("x".into()).status_code(), 503);
    assert_eq!(Error::llm_error("openai", "boom").status_code(), 500);
}

#[test]
fn error_display() {
    assert_eq!(Error::not_found("memory", "m1").to_string(), "memory not found: m1");
    assert_eq!(
        Error::llm_error("openai", "timeout").to_string(),
        "llm error: openai - timeout"
    );
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: Error = io.into();
    assert!(matches!(err, Error::IoError(_)));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn bind_mode_addresses() {
    assert_eq!(BindMode::Loopback.to_addr(), "127.0.0.1");
    assert_eq!(BindMode::Lan.to_addr(), "0.0.0.0");
    assert_eq!(GatewayConfig::default().bind, BindMode::Loopback);
    assert_eq!(AuthConfig::default().mode, AuthMode::None);
}
