//! Context pruning for long-running sessions.
//!
//! A pure transform over the history, unit-testable without a live model.
//! Policy: tool-call/tool-result parts survive only within the last
//! [`TOOL_KEEP_WINDOW`] messages; reasoning text and screenshots survive only
//! in the last message; messages left empty are dropped. The leading user
//! message is exempt -- it carries the task and is never pruned.

use deskpilot_types::{ChatMessage, ChatPart};

/// Tool-call/tool-result parts are kept in this many trailing messages.
pub const TOOL_KEEP_WINDOW: usize = 4;

/// Prune stale content from a conversation history.
///
/// Keeps token cost bounded without losing the most recent visual and causal
/// context: the model always sees its task, its last few tool exchanges, and
/// the latest screenshot.
pub fn prune_history(history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let len = history.len();
    history
        .into_iter()
        .enumerate()
        .filter_map(|(i, mut msg)| {
            let is_first = i == 0;
            let is_last = i + 1 == len;
            let in_tool_window = i + TOOL_KEEP_WINDOW >= len;

            if !in_tool_window {
                msg.parts.retain(|p| {
                    !matches!(p, ChatPart::ToolCall { .. } | ChatPart::ToolResult { .. })
                });
            }
            if !is_last && !is_first {
                msg.parts
                    .retain(|p| !matches!(p, ChatPart::Text { .. } | ChatPart::Image { .. }));
            }

            if msg.is_empty() {
                None
            } else {
                Some(msg)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use deskpilot_types::Role;

    use super::*;

    fn text(role: Role, s: &str) -> ChatMessage {
        ChatMessage {
            role,
            parts: vec![ChatPart::Text { text: s.into() }],
        }
    }

    fn tool_pair(n: usize) -> [ChatMessage; 2] {
        [
            ChatMessage {
                role: Role::Assistant,
                parts: vec![ChatPart::ToolCall {
                    id: format!("call-{n}"),
                    name: "computer".into(),
                    input: serde_json::json!({"type": "screenshot"}),
                }],
            },
            ChatMessage {
                role: Role::User,
                parts: vec![ChatPart::ToolResult {
                    tool_call_id: format!("call-{n}"),
                    content: "screenshot completed.".into(),
                    image: None,
                }],
            },
        ]
    }

    fn screenshot_turn(caption: &str) -> ChatMessage {
        ChatMessage::user_with_screenshot(caption, &[1, 2, 3])
    }

    #[test]
    fn task_message_is_never_dropped() {
        let mut history = vec![text(Role::User, "book a flight")];
        for n in 0..6 {
            history.extend(tool_pair(n));
        }
        history.push(screenshot_turn("latest screen"));

        let pruned = prune_history(history);
        assert_eq!(pruned[0].text(), "book a flight");
    }

    #[test]
    fn stale_tool_pairs_are_dropped() {
        let mut history = vec![text(Role::User, "task")];
        for n in 0..5 {
            history.extend(tool_pair(n));
        }
        // 11 messages; tool parts survive only in the last 4.
        let pruned = prune_history(history);

        let tool_parts: Vec<&str> = pruned
            .iter()
            .flat_map(|m| &m.parts)
            .filter_map(|p| match p {
                ChatPart::ToolCall { id, .. } => Some(id.as_str()),
                ChatPart::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tool_parts, vec!["call-3", "call-3", "call-4", "call-4"]);
    }

    #[test]
    fn old_reasoning_and_screenshots_are_dropped() {
        let history = vec![
            text(Role::User, "task"),
            screenshot_turn("step 1 screen"),
            text(Role::Assistant, "I will click the button"),
            screenshot_turn("step 2 screen"),
        ];
        let pruned = prune_history(history);

        // Task survives, middle turns vanish entirely, last screenshot stays.
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[0].text(), "task");
        assert!(pruned[1]
            .parts
            .iter()
            .any(|p| matches!(p, ChatPart::Image { .. })));
    }

    #[test]
    fn mixed_message_keeps_tool_call_loses_text() {
        let mixed = ChatMessage {
            role: Role::Assistant,
            parts: vec![
                ChatPart::Text {
                    text: "clicking now".into(),
                },
                ChatPart::ToolCall {
                    id: "call-9".into(),
                    name: "computer".into(),
                    input: serde_json::json!({"type": "screenshot"}),
                },
            ],
        };
        let history = vec![text(Role::User, "task"), mixed, screenshot_turn("screen")];
        let pruned = prune_history(history);

        assert_eq!(pruned.len(), 3);
        assert_eq!(pruned[1].parts.len(), 1);
        assert!(matches!(pruned[1].parts[0], ChatPart::ToolCall { .. }));
    }

    #[test]
    fn short_history_untouched() {
        let history = vec![text(Role::User, "task"), screenshot_turn("screen")];
        let pruned = prune_history(history.clone());
        assert_eq!(pruned, history);
    }

    #[test]
    fn empty_history() {
        assert!(prune_history(Vec::new()).is_empty());
    }
}
