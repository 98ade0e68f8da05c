//! Bracket reply convention: `[To: Ego|Superego|User] [Content: ...]`
//!
//! Models drift from the convention regularly, so parsing never fails:
//! a non-conforming reply still yields usable content with leading tags
//! and a trailing persona signature stripped.

use cedar_core::Addressee;
use regex::Regex;
use std::sync::LazyLock;

static TO_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*to\s*:\s*(ego|superego|user)\s*\]").expect("valid regex")
});

// Greedy: content runs to the final `]`.
static CONTENT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\[\s*content\s*:\s*(.*)\]").expect("valid regex"));

static LEADING_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\[[^\]\n]*\]\s*)+").expect("valid regex"));

static OPEN_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\[\s*content\s*:\s*").expect("valid regex"));

static TRAILING_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\[\s*(?:ego|superego)\s*\]\s*$").expect("valid regex")
});

/// A parsed persona reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketReply {
    pub to: Option<Addressee>,
    pub content: String,
    /// Both tags were present and the content was non-empty.
    pub conforming: bool,
}

/// First `[To: X]` target in `text`.
pub fn parse_target(text: &str) -> Option<Addressee> {
    TO_TAG
        .captures(text)
        .and_then(|c| Addressee::from_name(&c[1]))
}

/// Parse a raw model reply.
pub fn parse(raw: &str) -> BracketReply {
    let to = parse_target(raw);
    // A signature may follow the closing bracket or sit just inside it.
    let unsigned = TRAILING_SIGNATURE.replace(raw, "");
    let content = CONTENT_TAG
        .captures(&unsigned)
        .map(|c| TRAILING_SIGNATURE.replace(&c[1], "").trim().to_string())
        .filter(|c| !c.is_empty());

    match (to, content) {
        (Some(to), Some(content)) => BracketReply {
            to: Some(to),
            content,
            conforming: true,
        },
        (to, _) => BracketReply {
            to,
            content: strip_tags(raw),
            conforming: false,
        },
    }
}

/// Remove leading bracket tokens, a dangling `[Content:` opener and a
/// trailing `[Ego]` / `[Superego]` signature. Returns the trimmed input when
/// stripping would leave nothing.
pub fn strip_tags(raw: &str) -> String {
    let without_leading = LEADING_TAGS.replace(raw, "");
    let without_opener = OPEN_CONTENT.replace(without_leading.trim_start(), "");
    let stripped = TRAILING_SIGNATURE.replace(&without_opener, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        raw.trim().to_string()
    } else {
        stripped.to_string()
    }
}

/// Render a reply in the bracket convention.
pub fn render(to: Addressee, content: &str) -> String {
    format!("[To: {}] [Content: {}]", to.display_name(), content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let reply = parse("[To: User] [Content: User: hello]");
        assert_eq!(reply.to, Some(Addressee::User));
        assert_eq!(reply.content, "User: hello");
        assert!(reply.conforming);
    }

    #[test]
    fn tag_names_are_case_insensitive() {
        let reply = parse("[to: superego] [CONTENT: Superego, fair point.]");
        assert_eq!(reply.to, Some(Addressee::Superego));
        assert_eq!(reply.content, "Superego, fair point.");
    }

    #[test]
    fn content_may_contain_brackets_and_newlines() {
        let reply = parse("[To: Ego] [Content: Ego, two things:\n[a] honesty\n[b] care]");
        assert!(reply.conforming);
        assert_eq!(reply.content, "Ego, two things:\n[a] honesty\n[b] care");
    }

    #[test]
    fn trailing_signature_is_not_content() {
        let reply = parse("[To: User] [Content: Maya, that sounds hard.] [Ego]");
        assert!(reply.conforming);
        assert_eq!(reply.content, "Maya, that sounds hard.");

        let reply = parse("[To: Ego] [Content: Ego, be honest with her. [Superego]]\n");
        assert!(reply.conforming);
        assert_eq!(reply.content, "Ego, be honest with her.");
    }

    #[test]
    fn malformed_reply_strips_leading_tokens() {
        let reply = parse("[Ego] [To: User] Maya, that sounds exhausting.");
        assert!(!reply.conforming);
        assert_eq!(reply.to, Some(Addressee::User));
        assert_eq!(reply.content, "Maya, that sounds exhausting.");
    }

    #[test]
    fn plain_text_without_tags() {
        let reply = parse("Superego, I hear you. [Ego]");
        assert!(!reply.conforming);
        assert_eq!(reply.to, None);
        assert_eq!(reply.content, "Superego, I hear you.");
    }

    #[test]
    fn unterminated_content_tag() {
        let reply = parse("[To: Superego] [Content: Superego, let's slow down");
        assert!(!reply.conforming);
        assert_eq!(reply.to, Some(Addressee::Superego));
        assert_eq!(reply.content, "Superego, let's slow down");
    }

    #[test]
    fn empty_content_is_not_conforming() {
        let reply = parse("[To: User] [Content:   ]");
        assert!(!reply.conforming);
    }

    #[test]
    fn strip_keeps_text_when_only_tags() {
        assert_eq!(strip_tags("[Ego]"), "[Ego]");
        assert_eq!(strip_tags("  plain  "), "plain");
    }

    #[test]
    fn render_then_parse() {
        let text = render(Addressee::Ego, "Ego, what would be realistic here?");
        let reply = parse(&text);
        assert_eq!(reply.to, Some(Addressee::Ego));
        assert_eq!(reply.content, "Ego, what would be realistic here?");
    }
}
