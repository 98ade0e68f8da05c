//! Dispatcher, router and summarizer against the scripted mock provider.

use cedar_core::{
    Addressee, AgentMessage, ConversationMode, DualAgentRequest, Persona, Role, RouteReason,
};
use cedar_dialogue::prompts::{intro, CLOSING_MESSAGE, EMPTY_REPLY};
use cedar_dialogue::{DialogueConfig, Dispatcher, Router, Summarizer};
use cedar_llm::mock::{MockBehavior, MockProvider};
use std::sync::Arc;

fn dispatcher(mock: &Arc<MockProvider>, config: DialogueConfig) -> Dispatcher {
    Dispatcher::with_seed(mock.clone(), config, 7)
}

fn no_reformat() -> DialogueConfig {
    DialogueConfig {
        reformat_nonconforming: false,
        ..DialogueConfig::default()
    }
}

fn persona_exchange() -> Vec<AgentMessage> {
    vec![
        AgentMessage::user("I keep putting off my thesis."),
        AgentMessage::persona(Persona::Ego, "User, what's in the way?", Addressee::User),
        AgentMessage::persona(Persona::Superego, "Ego, ask about values.", Addressee::Ego),
        AgentMessage::persona(Persona::Ego, "Superego, fair.", Addressee::Superego),
    ]
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn turn_limit_closes_without_model_call() {
    let mock = Arc::new(MockProvider::texts(["unused"]));
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        turn_count: 5,
        max_turns: 5,
        user_input: Some("still here".into()),
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();
    assert!(resp.conversation_complete);
    assert_eq!(resp.content, CLOSING_MESSAGE);
    assert_eq!(resp.turn_count, 5);
    assert_eq!(mock.call_count().await, 0);
}

#[tokio::test]
async fn start_greets_user_with_requested_persona() {
    let mock = Arc::new(MockProvider::texts(["[To: User] [Content: User, welcome. What's on your mind?]"]));
    let req = DualAgentRequest {
        start_conversation: true,
        current_agent: Some(Persona::Superego),
        user_name: Some("Maya".into()),
        mode: ConversationMode::Solve,
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();
    assert_eq!(resp.agent, Persona::Superego);
    assert_eq!(resp.to, Addressee::User);
    assert_eq!(resp.content, "User, welcome. What's on your mind?");
    assert_eq!(resp.turn_count, 1);
    assert_eq!(resp.current_agent, Persona::Ego);
    assert!(!resp.conversation_complete);

    let requests = mock.requests().await;
    let system = requests[0].system.as_deref().unwrap();
    assert!(system.contains("Superego from Freud"));
    assert!(system.contains("Current mode: solve."));
    assert!(system.contains("The user's name is Maya."));
    assert_eq!(requests[0].temperature, Some(0.7));
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, "user");
}

#[tokio::test]
async fn start_with_empty_reply_uses_intro() {
    let mock = Arc::new(MockProvider::texts([""]));
    let req = DualAgentRequest {
        start_conversation: true,
        current_agent: Some(Persona::Ego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();
    assert_eq!(resp.content, intro(Persona::Ego));
    // Empty text is not reformatted.
    assert_eq!(mock.call_count().await, 1);
}

#[tokio::test]
async fn start_without_persona_picks_one() {
    let mock = Arc::new(MockProvider::texts(["[To: User] [Content: User, hi.]"]));
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&DualAgentRequest::default(), None)
        .await
        .unwrap();
    assert!(Persona::ALL.contains(&resp.agent));
    assert_eq!(resp.current_agent, resp.agent.other());
}

#[tokio::test]
async fn user_input_is_routed_then_answered() {
    let mock = Arc::new(MockProvider::texts([
        "AGENT: Superego",
        "[To: User] [Content: User, that sounds like it matters to you.]",
    ]));
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        turn_count: 4,
        user_input: Some("  Is it wrong to quit?  ".into()),
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();

    assert_eq!(resp.agent, Persona::Superego);
    assert_eq!(resp.to, Addressee::User);
    assert_eq!(resp.routed_by, Some(RouteReason::Llm));
    assert_eq!(resp.turn_count, 5);
    assert_eq!(resp.current_agent, Persona::Ego);
    let user_message = resp.user_message.unwrap();
    assert_eq!(user_message.content, "Is it wrong to quit?");
    assert_eq!(user_message.role, Role::User);

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].temperature, Some(0.0));
    assert_eq!(requests[0].max_tokens, Some(20));
    assert!(requests[0].messages[0].content.contains("[User]: Is it wrong to quit?"));
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.content, "[USER] Is it wrong to quit?");
    assert!(requests[1].system.as_deref().unwrap().ends_with("address User."));
}

#[tokio::test]
async fn unparseable_router_reply_falls_back_to_addressed() {
    let mock = Arc::new(MockProvider::texts([
        "Either could answer.",
        "[To: User] [Content: User, here's a plan.]",
    ]));
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        user_input: Some("Ego, what should I do first?".into()),
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();
    assert_eq!(resp.agent, Persona::Ego);
    assert_eq!(resp.routed_by, Some(RouteReason::Addressed));
}

#[tokio::test]
async fn router_failure_is_an_error() {
    let mock = Arc::new(MockProvider::constant(MockBehavior::Error("boom".into())));
    let router = Router::new(mock.clone(), DialogueConfig::default());
    let err = router
        .route(&[AgentMessage::user("hi")], Persona::Ego)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("mock"));
}

#[tokio::test]
async fn autonomous_turns_alternate_personas() {
    let mock = Arc::new(MockProvider::texts([
        "Ego, I think we should slow down.",
        "Superego, agreed, but time is short.",
    ]));
    let config = DialogueConfig {
        interjection_probability: 0.0,
        ..no_reformat()
    };
    let d = dispatcher(&mock, config);

    let mut req = DualAgentRequest {
        messages: vec![
            AgentMessage::user("I can't decide."),
            AgentMessage::persona(Persona::Ego, "User, tell me more.", Addressee::User),
        ],
        current_agent: Some(Persona::Superego),
        turn_count: 2,
        ..Default::default()
    };

    let first = d.step(&req, None).await.unwrap();
    assert_eq!(first.agent, Persona::Superego);
    assert_eq!(first.to, Addressee::Ego);
    assert_eq!(first.current_agent, Persona::Ego);
    assert_eq!(first.turn_count, 3);

    req.messages.push(first.as_message());
    req.current_agent = Some(first.current_agent);
    req.turn_count = first.turn_count;

    let second = d.step(&req, None).await.unwrap();
    assert_eq!(second.agent, Persona::Ego);
    assert_eq!(second.to, Addressee::Superego);
    assert_eq!(second.current_agent, Persona::Superego);
    assert_eq!(second.turn_count, 4);
}

#[tokio::test]
async fn explicit_user_target_hands_turn_to_other_persona() {
    let mock = Arc::new(MockProvider::texts(["[To: User] [Content: User, how does that sit with you?]"]));
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();
    assert_eq!(resp.to, Addressee::User);
    assert_eq!(resp.current_agent, Persona::Ego);
}

#[tokio::test]
async fn self_addressed_reply_uses_audience() {
    let mock = Arc::new(MockProvider::texts(["[To: Superego] [Content: Ego, wait.]"]));
    let config = DialogueConfig {
        interjection_probability: 0.0,
        ..DialogueConfig::default()
    };
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, config).step(&req, None).await.unwrap();
    assert_eq!(resp.agent, Persona::Superego);
    assert_eq!(resp.to, Addressee::Ego);
    assert_eq!(resp.current_agent, Persona::Ego);
}

#[tokio::test]
async fn long_persona_exchange_interjects_to_user() {
    let mock = Arc::new(MockProvider::texts(["[To: User] [Content: User, where do you stand?]"]));
    let config = DialogueConfig {
        interjection_probability: 1.0,
        ..DialogueConfig::default()
    };
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, config).step(&req, None).await.unwrap();
    assert_eq!(resp.to, Addressee::User);
    let requests = mock.requests().await;
    assert!(requests[0].system.as_deref().unwrap().ends_with("address User."));
}

#[tokio::test]
async fn short_exchange_never_interjects() {
    let mock = Arc::new(MockProvider::texts(["[To: Ego] [Content: Ego, go on.]"]));
    let config = DialogueConfig {
        interjection_probability: 1.0,
        ..DialogueConfig::default()
    };
    let req = DualAgentRequest {
        messages: persona_exchange()[..3].to_vec(),
        current_agent: Some(Persona::Ego),
        ..Default::default()
    };
    // Streak is one message long.
    let resp = dispatcher(&mock, config).step(&req, None).await.unwrap();
    let requests = mock.requests().await;
    assert!(requests[0].system.as_deref().unwrap().ends_with("address Superego."));
    assert_eq!(resp.agent, Persona::Ego);
}

#[tokio::test]
async fn nonconforming_reply_is_reformatted_once() {
    let mock = Arc::new(MockProvider::texts([
        "Ego, I disagree with that.",
        "[To: Ego] [Content: Ego, I disagree with that.]",
    ]));
    let config = DialogueConfig {
        interjection_probability: 0.0,
        reformat_model: "reformatter".into(),
        ..DialogueConfig::default()
    };
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, config).step(&req, None).await.unwrap();
    assert_eq!(resp.content, "Ego, I disagree with that.");
    assert_eq!(resp.to, Addressee::Ego);

    let requests = mock.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].model, "reformatter");
    assert!(requests[1].messages[0].content.contains("Intended recipient: Ego"));
}

#[tokio::test]
async fn failed_reformat_keeps_stripped_text() {
    let mock = Arc::new(MockProvider::sequence(vec![
        MockBehavior::Text("[Superego] Ego, let's pause. [Superego]".into()),
        MockBehavior::Error("reformat down".into()),
    ]));
    let config = DialogueConfig {
        interjection_probability: 0.0,
        ..DialogueConfig::default()
    };
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, config).step(&req, None).await.unwrap();
    assert_eq!(resp.content, "Ego, let's pause.");
    assert_eq!(resp.to, Addressee::Ego);
}

#[tokio::test]
async fn empty_autonomous_reply_gets_placeholder() {
    let mock = Arc::new(MockProvider::texts(["   "]));
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        ..Default::default()
    };
    let resp = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap();
    assert_eq!(resp.content, EMPTY_REPLY);
}

#[tokio::test]
async fn reaching_max_turns_marks_complete() {
    let mock = Arc::new(MockProvider::texts(["[To: Ego] [Content: Ego, one last thought.]"]));
    let req = DualAgentRequest {
        messages: persona_exchange(),
        current_agent: Some(Persona::Superego),
        turn_count: 9,
        max_turns: 10,
        ..Default::default()
    };
    let resp = dispatcher(&mock, no_reformat()).step(&req, None).await.unwrap();
    assert_eq!(resp.turn_count, 10);
    assert!(resp.conversation_complete);
}

#[tokio::test]
async fn llm_failure_propagates() {
    let mock = Arc::new(MockProvider::constant(MockBehavior::Error("upstream 500".into())));
    let req = DualAgentRequest {
        start_conversation: true,
        ..Default::default()
    };
    let err = dispatcher(&mock, DialogueConfig::default())
        .step(&req, None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("upstream 500"));
}

#[tokio::test]
async fn memory_context_reaches_system_prompt() {
    let mock = Arc::new(MockProvider::texts(["[To: User] [Content: User, welcome back.]"]));
    let req = DualAgentRequest {
        start_conversation: true,
        current_agent: Some(Persona::Ego),
        ..Default::default()
    };
    dispatcher(&mock, DialogueConfig::default())
        .step(&req, Some("Frequently discusses: thesis"))
        .await
        .unwrap();
    let requests = mock.requests().await;
    assert!(requests[0]
        .system
        .as_deref()
        .unwrap()
        .contains("Frequently discusses: thesis"));
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

const ANALYSIS_JSON: &str = r#"{
  "summary": "Maya talked about procrastinating on her thesis.",
  "keyTopics": ["thesis", "procrastination"],
  "insights": ["fear of judgement"],
  "psychologicalThemes": ["perfectionism"],
  "recommendations": ["write for 20 minutes a day"],
  "memoryTags": ["school"],
  "emotionalTone": "anxious but hopeful",
  "userConcerns": ["deadline"],
  "resolutions": ["talk to advisor"]
}"#;

#[tokio::test]
async fn summarizer_parses_structured_reply() {
    let mock = Arc::new(MockProvider::texts([format!("```json\n{}\n```", ANALYSIS_JSON)]));
    let summarizer = Summarizer::new(mock.clone(), DialogueConfig::default());
    let outcome = summarizer
        .summarize(&persona_exchange(), Some("conv-42"))
        .await
        .unwrap();

    assert!(outcome.structured);
    let memory = outcome.memory;
    assert_eq!(memory.id, "conv-42");
    assert_eq!(memory.key_topics, vec!["thesis", "procrastination"]);
    assert_eq!(memory.emotional_tone, "anxious but hopeful");
    assert_eq!(memory.agent_interactions.ego, 2);
    assert_eq!(memory.agent_interactions.superego, 1);
    assert_eq!(memory.agent_interactions.user, 1);
    assert_eq!(memory.conversation_length, 4);

    let requests = mock.requests().await;
    assert_eq!(requests[0].temperature, Some(0.3));
    assert!(requests[0].messages[0]
        .content
        .contains("[User]: I keep putting off my thesis.\n\n[Ego]: User, what's in the way?"));
}

#[tokio::test]
async fn summarizer_keeps_raw_text_when_not_json() {
    let mock = Arc::new(MockProvider::texts(["The user seemed stressed about school."]));
    let summarizer = Summarizer::new(mock, DialogueConfig::default());
    let outcome = summarizer.summarize(&persona_exchange(), None).await.unwrap();

    assert!(!outcome.structured);
    let memory = outcome.memory;
    assert_eq!(memory.summary, "The user seemed stressed about school.");
    assert_eq!(memory.key_topics, vec!["conversation analysis"]);
    assert_eq!(memory.user_concerns, vec!["general discussion"]);
    assert_eq!(memory.emotional_tone, "neutral");
    assert!(memory.id.starts_with("summary_"));
}

#[tokio::test]
async fn summarizer_fills_missing_fields() {
    let mock = Arc::new(MockProvider::texts([r#"{"keyTopics": ["sleep"]}"#]));
    let summarizer = Summarizer::new(mock, DialogueConfig::default());
    let outcome = summarizer.summarize(&persona_exchange(), None).await.unwrap();
    assert!(outcome.structured);
    assert_eq!(outcome.memory.summary, "No summary available");
    assert_eq!(outcome.memory.key_topics, vec!["sleep"]);
    assert!(outcome.memory.insights.is_empty());
}

#[tokio::test]
async fn summarizer_accepts_loosely_typed_json() {
    let mock = Arc::new(MockProvider::texts([
        r#"{"summary":"User Maya talked about work stress.","keyTopics":"work","emotionalTone":"anxious","resolutions":null}"#,
    ]));
    let summarizer = Summarizer::new(mock, DialogueConfig::default());
    let outcome = summarizer.summarize(&persona_exchange(), None).await.unwrap();

    assert!(outcome.structured);
    assert_eq!(outcome.memory.summary, "User Maya talked about work stress.");
    assert_eq!(outcome.memory.key_topics, vec!["work"]);
    assert_eq!(outcome.memory.emotional_tone, "anxious");
    assert!(outcome.memory.resolutions.is_empty());
}

#[tokio::test]
async fn summarizer_rejects_empty_transcript_and_bad_id() {
    let mock = Arc::new(MockProvider::texts(["{}"]));
    let summarizer = Summarizer::new(mock.clone(), DialogueConfig::default());

    let err = summarizer.summarize(&[], None).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("No conversation messages provided"));

    let err = summarizer
        .summarize(&persona_exchange(), Some("../etc/passwd"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(mock.call_count().await, 0);
}
