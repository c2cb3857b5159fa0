//! Prompt assembly: system message, sampling temperature and history trimming.

use hireflow_store::{Agent, ChatMessage, MessageRole, MessageStatus};

use crate::llm::Message;

/// Temperature used when the tone matches no known keyword.
pub const DEFAULT_TEMPERATURE: f64 = 0.5;

/// Rough characters-per-token ratio used for history budgets.
pub const CHARS_PER_TOKEN: usize = 4;

const PRECISE: [&str; 3] = ["formal", "professional", "concise"];
const WARM: [&str; 4] = ["friendly", "warm", "casual", "conversational"];
const CREATIVE: [&str; 3] = ["creative", "enthusiastic", "playful"];

/// Derive a sampling temperature from an agent's tone.
///
/// Keyword groups are checked in order, so "formal but friendly" is 0.3.
#[must_use]
pub fn temperature_for_tone(tone: &str) -> f64 {
    let tone = tone.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| tone.contains(w));

    if has(&PRECISE) {
        0.3
    } else if has(&WARM) {
        0.7
    } else if has(&CREATIVE) {
        0.9
    } else {
        DEFAULT_TEMPERATURE
    }
}

/// Build the system message for a turn with `agent`.
#[must_use]
pub fn build_system_prompt(agent: &Agent, threaded: bool) -> String {
    let config = &agent.configuration;
    let mut prompt = format!(
        "You are {}, an assistant for job seekers.\n\n{}\n\nRespond in a {} tone.\n\n\
         You can call the `retrieve_context` tool to search the user's uploaded documents \
         (resumes, cover letters, portfolios). Use it whenever the answer depends on the \
         user's own experience, and do not invent details that are not in their documents.",
        agent.name,
        config.system_prompt.trim(),
        config.tone.trim(),
    );
    if threaded {
        prompt.push_str(
            "\n\nWhen you suggest a concrete change the user may want applied, such as \
             rewriting a section or generating a new document, call `propose_action` so \
             they can confirm it.",
        );
    }
    prompt
}

/// Convert stored history into model messages, keeping the newest turns that
/// fit in `max_tokens`.
///
/// An interrupted reply is dropped together with the user message it
/// answered, and the result never starts with an assistant message, so user
/// and assistant turns strictly alternate.
#[must_use]
pub fn trim_history(history: &[ChatMessage], max_tokens: u32) -> Vec<Message> {
    let budget = usize::try_from(max_tokens)
        .unwrap_or(usize::MAX)
        .saturating_mul(CHARS_PER_TOKEN);

    let mut complete: Vec<&ChatMessage> = Vec::with_capacity(history.len());
    for message in history {
        if message.role == MessageRole::Assistant && message.status == MessageStatus::Interrupted {
            if complete.last().is_some_and(|m| m.role == MessageRole::User) {
                complete.pop();
            }
            continue;
        }
        complete.push(message);
    }

    let mut used = 0usize;
    let mut start = complete.len();
    for (i, message) in complete.iter().enumerate().rev() {
        let cost = message.content.chars().count();
        if used + cost > budget {
            break;
        }
        used += cost;
        start = i;
    }

    let mut kept = &complete[start..];
    while kept.first().is_some_and(|m| m.role == MessageRole::Assistant) {
        kept = &kept[1..];
    }

    kept.iter()
        .map(|message| match message.role {
            MessageRole::User => Message::user(message.content.clone()),
            MessageRole::Assistant => Message::assistant(message.content.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hireflow_core::{AgentId, ConversationId, MessageId, UserId};
    use hireflow_store::{AgentConfiguration, AgentStatus, AgentType};

    use crate::llm::ChatRole;

    fn message(role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage {
            message_id: MessageId::generate(),
            conversation_id: ConversationId::generate(),
            role,
            content: content.to_string(),
            status: MessageStatus::Completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tone_keywords() {
        assert!((temperature_for_tone("Professional") - 0.3).abs() < f64::EPSILON);
        assert!((temperature_for_tone("concise and direct") - 0.3).abs() < f64::EPSILON);
        assert!((temperature_for_tone("warm") - 0.7).abs() < f64::EPSILON);
        assert!((temperature_for_tone("CONVERSATIONAL") - 0.7).abs() < f64::EPSILON);
        assert!((temperature_for_tone("playful") - 0.9).abs() < f64::EPSILON);
        assert!((temperature_for_tone("stoic") - 0.5).abs() < f64::EPSILON);
        assert!((temperature_for_tone("") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn system_prompt_mentions_persona_and_tools() {
        let agent = Agent {
            agent_id: AgentId::generate(),
            user_id: UserId::from_bytes([1u8; 32]),
            name: "Coach".to_string(),
            agent_type: AgentType::Private,
            status: AgentStatus::Active,
            configuration: AgentConfiguration {
                tone: "friendly".to_string(),
                ..AgentConfiguration::default()
            },
            is_default: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let plain = build_system_prompt(&agent, false);
        assert!(plain.contains("Coach"));
        assert!(plain.contains("friendly"));
        assert!(plain.contains("retrieve_context"));
        assert!(!plain.contains("propose_action"));

        assert!(build_system_prompt(&agent, true).contains("propose_action"));
    }

    #[test]
    fn history_keeps_newest_within_budget() {
        let history = vec![
            message(MessageRole::User, &"a".repeat(8)),
            message(MessageRole::Assistant, &"b".repeat(8)),
            message(MessageRole::User, &"c".repeat(8)),
            message(MessageRole::Assistant, &"d".repeat(8)),
        ];

        // 6 tokens = 24 characters: the newest three fit
        let kept = trim_history(&history, 6);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].role, ChatRole::User);
        assert_eq!(kept[0].content, "c".repeat(8));
        assert_eq!(kept[1].content, "d".repeat(8));

        assert_eq!(trim_history(&history, 100).len(), 4);
        assert!(trim_history(&history, 0).is_empty());
    }

    #[test]
    fn history_never_starts_with_an_assistant_turn() {
        let history = vec![
            message(MessageRole::User, &"a".repeat(40)),
            message(MessageRole::Assistant, &"b".repeat(8)),
        ];

        // only the reply fits, and a lone reply is not replayed
        assert!(trim_history(&history, 2).is_empty());
    }

    #[test]
    fn history_drops_interrupted_exchanges() {
        let mut interrupted = message(MessageRole::Assistant, "");
        interrupted.status = MessageStatus::Interrupted;
        let history = vec![
            message(MessageRole::User, "first"),
            message(MessageRole::Assistant, "reply"),
            message(MessageRole::User, "cut off"),
            interrupted,
            message(MessageRole::User, "again"),
            message(MessageRole::Assistant, "second reply"),
        ];

        let kept = trim_history(&history, 100);
        let contents: Vec<&str> = kept.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "reply", "again", "second reply"]);
        for pair in kept.windows(2) {
            assert_ne!(pair[0].role, pair[1].role);
        }
    }
}
