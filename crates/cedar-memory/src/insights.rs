//! Memory insights for persona prompts
//!
//! Digests stored memories into short text blocks: one per conversation,
//! one for recurring patterns, plus a personalised greeting.

use cedar_core::ConversationMemory;
use regex::Regex;
use std::sync::LazyLock;

/// Keyword part is case-insensitive; the captured name must be capitalised.
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?i:(?:user|person|individual),\s+(?:identified\s+as|named|called)\s+)([A-Z][a-z]+)",
        r"\b(?i:(?:providing|provides|provided)\s+(?:their\s+)?(?:actual\s+)?name,\s+)([A-Z][a-z]+)",
        r"\b(?i:(?:user|person|individual)\s+(?:identified\s+as|named|called)\s+)([A-Z][a-z]+)",
        r"\b([A-Z][a-z]+)(?i:,\s+(?:the\s+)?(?:user|person|individual)\b)",
        r"\b(?i:(?:the\s+)?(?:user|person|individual),\s+)([A-Z][a-z]+)",
        r"\b(?i:introduc(?:es|ed)\s+(?:himself|herself|themselves)\s+as\s+)([A-Z][a-z]+)",
        r"\b(?i:(?:user|person|individual)\s+(?:named|called|is)\s+)([A-Z][a-z]+)",
        r"(?i:\bname\s+is|\bI'm|\bI\s+am)\s+([A-Z][a-z]+)",
        r"\b(?i:(?:call\s+me|my\s+name\s+is)\s+)([A-Z][a-z]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static DETAIL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"age|years old",
        r"job|work|profession|career",
        r"location|city|country|live in",
        r"family|parents|siblings|children",
        r"hobbies|interests|passions",
    ]
    .iter()
    .map(|kw| Regex::new(&format!(r"(?i).{{0,50}}(?:{}).{{0,50}}", kw)).expect("valid regex"))
    .collect()
});

/// Capitalised words the name patterns pick up that are not names.
const NOT_NAMES: &[&str] = &[
    "conversation", "user", "person", "individual", "dialogue", "discussion", "ego",
    "superego", "agent", "assistant", "system", "however", "therefore", "although", "because",
    "before", "after", "during", "while", "since", "until", "unless", "except", "besides",
    "instead", "rather", "indeed", "certainly", "obviously", "clearly", "apparently",
    "evidently", "supposedly", "allegedly", "reportedly", "accordingly", "consequently",
    "furthermore", "moreover", "nevertheless", "nonetheless", "meanwhile", "subsequently",
    "previously", "initially", "finally", "ultimately", "eventually", "gradually", "suddenly",
    "immediately", "quickly", "slowly", "carefully", "the", "and", "who", "feeling",
];

const NO_HISTORY: &str = "No previous conversation history available.";
const FIRST_GREETING: &str =
    "Hello! I'm here to help you explore your thoughts and feelings. What's on your mind today?";

/// Names and personal details mentioned across summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalInfo {
    /// First name found.
    pub name: Option<String>,
    pub all_names: Vec<String>,
    /// Short context windows around personal keywords.
    pub details: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

pub fn extract_personal_info(summaries: &[&str]) -> PersonalInfo {
    let mut info = PersonalInfo::default();

    for summary in summaries {
        for pattern in NAME_PATTERNS.iter() {
            let Some(candidate) = pattern.captures(summary).map(|c| c[1].to_string()) else {
                continue;
            };
            if NOT_NAMES.contains(&candidate.to_lowercase().as_str()) {
                continue;
            }
            if info.name.is_none() {
                info.name = Some(candidate.clone());
            }
            push_unique(&mut info.all_names, candidate);
        }
    }

    for summary in summaries {
        for pattern in DETAIL_PATTERNS.iter() {
            for m in pattern.find_iter(summary) {
                push_unique(&mut info.details, m.as_str().trim().to_string());
            }
        }
    }

    info
}

/// Multi-line digest of one conversation for a persona prompt.
pub fn format_for_agent(memory: &ConversationMemory) -> String {
    format!(
        "Previous Conversation ({} at {}):\nSummary: {}\n\nKey Topics: {}\nPsychological Themes: {}\nUser Concerns: {}\nResolutions: {}\nEmotional Tone: {}\n\nMemory Tags: {}",
        memory.date,
        memory.time,
        memory.summary,
        memory.key_topics.join(", "),
        memory.psychological_themes.join(", "),
        memory.user_concerns.join(", "),
        memory.resolutions.join(", "),
        memory.emotional_tone,
        memory.memory_tags.join(", "),
    )
}

/// Items ordered by frequency, ties broken by first appearance.
fn by_frequency<'a>(items: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut counts: Vec<(&String, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(item, _)| item).collect()
}

fn first_distinct<'a>(items: impl Iterator<Item = &'a String>, n: usize) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for item in items {
        if out.len() == n {
            break;
        }
        if !out.contains(&item.as_str()) {
            out.push(item);
        }
    }
    out
}

fn join(items: &[&str]) -> String {
    items.join(", ")
}

/// Recurring patterns across memories, injected into persona prompts.
pub fn memory_insights(memories: &[ConversationMemory]) -> String {
    if memories.is_empty() {
        return NO_HISTORY.to_string();
    }

    let topics: Vec<&str> = by_frequency(memories.iter().flat_map(|m| m.key_topics.iter()))
        .into_iter()
        .take(3)
        .map(String::as_str)
        .collect();
    let themes = first_distinct(memories.iter().flat_map(|m| m.psychological_themes.iter()), 3);
    let concerns = first_distinct(memories.iter().flat_map(|m| m.user_concerns.iter()), 3);
    let tone = by_frequency(memories.iter().map(|m| &m.emotional_tone))
        .into_iter()
        .next()
        .map(String::as_str)
        .unwrap_or("neutral");

    let mut out = format!(
        "User Conversation Patterns:\n- Frequently discusses: {}\n- Common psychological themes: {}\n- Recurring concerns: {}\n- Typical emotional tone: {}\n- Total conversations: {}",
        join(&topics),
        join(&themes),
        join(&concerns),
        tone,
        memories.len()
    );

    let summaries: Vec<&str> = memories.iter().map(|m| m.summary.as_str()).collect();
    let info = extract_personal_info(&summaries);
    if info.name.is_some() || !info.details.is_empty() {
        out.push_str("\n\nPersonal Information:");
        if let Some(name) = &info.name {
            out.push_str(&format!("\n- User's current name: {}", name));
        }
        if info.all_names.len() > 1 {
            out.push_str(&format!("\n- All names mentioned: {}", info.all_names.join(", ")));
        }
        if !info.details.is_empty() {
            out.push_str(&format!("\n- Other personal details: {}", info.details.join(", ")));
        }
    }
    out
}

/// Greeting that picks up from the most recent memory (`memories[0]`).
pub fn conversation_starter(memories: &[ConversationMemory]) -> String {
    let Some(recent) = memories.first() else {
        return FIRST_GREETING.to_string();
    };

    let summaries: Vec<&str> = memories.iter().map(|m| m.summary.as_str()).collect();
    let mut starter = match extract_personal_info(&summaries).name {
        Some(name) => format!("Hello {}! I remember our previous conversation", name),
        None => "Hello! I remember our previous conversation".to_string(),
    };
    if !recent.date.is_empty() {
        starter.push_str(&format!(" from {}", recent.date));
    }
    let topics: Vec<&str> = recent.key_topics.iter().take(2).map(String::as_str).collect();
    if !topics.is_empty() {
        starter.push_str(&format!(" where we discussed {}", topics.join(" and ")));
    }
    if let Some(concern) = recent.user_concerns.first() {
        starter.push_str(&format!(". You mentioned being concerned about {}", concern));
    }
    starter.push_str(". How are you feeling about that now? Has anything changed since we last talked?");
    starter
}
