//! Vendor-native computer-use adapter (Anthropic-style).
//!
//! The vendor's own protocol proposes actions and expects a tool-result
//! message appended after each execution; this adapter is purely translation
//! between the vendor action schema and the internal vocabulary, reusing the
//! same validator and executor as the generic loop. Observation is
//! screenshot-on-demand: the model issues a `screenshot` action and receives
//! the image in the tool result.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use futures_util::StreamExt;
use tracing::info;

use deskpilot_desktop::ActionExecutor;
use deskpilot_types::{
    validate_action, Action, ActionError, ActionOutcome, ChatMessage, ChatPart, Event, MouseButton,
    Point, Resolution, Role, ScrollDirection,
};

use crate::adapters::{budget_message, AdapterDeps, ProviderAdapter, CANCELLED_MESSAGE, MAX_STEPS};
use crate::client::{ChatRequest, ModelChunk, ModelClient, ToolDefinition};
use crate::pruning::prune_history;
use crate::session::AgentSession;
use crate::sink::EventSink;

/// Translate a vendor-native computer-use input into the internal vocabulary.
///
/// `triple_click` and `cursor_position` map to their closest members of the
/// closed set (`double_click` and `move`). Unknown action names are rejected.
pub(crate) fn parse_native_input(input: &serde_json::Value) -> Result<Action, ActionError> {
    let kind = input
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ActionError::Malformed {
            detail: "missing 'action' field".to_string(),
        })?;

    match kind {
        "key" => {
            let text = str_field(input, "text")?;
            Ok(Action::Keypress {
                keys: text.split('+').map(|k| k.trim().to_string()).collect(),
            })
        }
        "type" => Ok(Action::Type {
            text: str_field(input, "text")?,
        }),
        "mouse_move" | "cursor_position" => {
            let (x, y) = coord_pair(input, "coordinate", "move")?;
            Ok(Action::Move { x, y })
        }
        "left_click" => {
            let (x, y) = coord_pair(input, "coordinate", "click")?;
            Ok(Action::Click {
                x,
                y,
                button: MouseButton::Left,
            })
        }
        "right_click" => {
            let (x, y) = coord_pair(input, "coordinate", "right_click")?;
            Ok(Action::RightClick { x, y })
        }
        "middle_click" => {
            let (x, y) = coord_pair(input, "coordinate", "click")?;
            Ok(Action::Click {
                x,
                y,
                button: MouseButton::Middle,
            })
        }
        "double_click" | "triple_click" => {
            let (x, y) = coord_pair(input, "coordinate", "double_click")?;
            Ok(Action::DoubleClick { x, y })
        }
        "left_click_drag" => {
            let (fx, fy) = coord_pair(input, "start_coordinate", "drag")?;
            let (tx, ty) = coord_pair(input, "coordinate", "drag")?;
            Ok(Action::Drag {
                path: vec![Point::new(fx, fy), Point::new(tx, ty)],
            })
        }
        "screenshot" => Ok(Action::Screenshot),
        "scroll" => {
            let direction = match input.get("scroll_direction").and_then(|v| v.as_str()) {
                Some("up") => ScrollDirection::Up,
                Some("left") => ScrollDirection::Left,
                Some("right") => ScrollDirection::Right,
                _ => ScrollDirection::Down,
            };
            let amount = input
                .get("scroll_amount")
                .and_then(|v| v.as_u64())
                .unwrap_or(3) as u32;
            // An absent coordinate means "scroll in place"; a present but
            // malformed one is an error, not a silent no-move.
            let (x, y) = if input.get("coordinate").is_some() {
                let (x, y) = coord_pair(input, "coordinate", "scroll")?;
                (Some(x), Some(y))
            } else {
                (None, None)
            };
            Ok(Action::Scroll {
                direction,
                amount,
                x,
                y,
            })
        }
        "wait" => {
            // The vendor expresses duration in seconds.
            let secs = input
                .get("duration")
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0)
                .max(0.0);
            Ok(Action::Wait {
                duration_ms: (secs * 1000.0) as u64,
            })
        }
        other => Err(ActionError::UnknownAction {
            tag: other.to_string(),
        }),
    }
}

fn str_field(input: &serde_json::Value, field: &str) -> Result<String, ActionError> {
    input
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ActionError::Malformed {
            detail: format!("missing '{field}' field"),
        })
}

fn coord_pair(
    input: &serde_json::Value,
    field: &str,
    action: &'static str,
) -> Result<(f64, f64), ActionError> {
    let arr = input
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or(ActionError::CoordinatesInvalid {
            action,
            field: "x",
        })?;
    let x = arr.first().and_then(|v| v.as_f64());
    let y = arr.get(1).and_then(|v| v.as_f64());
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok((x, y)),
        (Some(x), _) if x.is_finite() => {
            Err(ActionError::CoordinatesInvalid { action, field: "y" })
        }
        _ => Err(ActionError::CoordinatesInvalid { action, field: "x" }),
    }
}

/// Adapter for vendors with a first-party computer-use protocol.
pub struct NativeComputerUseAdapter {
    client: Arc<dyn ModelClient>,
    executor: ActionExecutor,
    model: String,
}

impl NativeComputerUseAdapter {
    /// Build the adapter from shared collaborators.
    pub fn new(deps: AdapterDeps) -> Self {
        Self {
            client: deps.client,
            executor: deps.executor,
            model: deps.model,
        }
    }

    /// Execute one vendor tool call; returns the tool-result part.
    async fn handle_tool_call(
        &self,
        id: String,
        name: &str,
        input: &serde_json::Value,
        model_res: Resolution,
        sink: &mut EventSink,
    ) -> ChatPart {
        let parsed = match name {
            "computer" => parse_native_input(input),
            "bash" => str_field(input, "command").map(|command| Action::ShellExec {
                command,
                timeout_ms: None,
            }),
            other => Err(ActionError::UnknownAction {
                tag: other.to_string(),
            }),
        };

        let action = match parsed {
            Ok(action) => action,
            Err(e) => {
                sink.send(Event::Error {
                    message: e.to_string(),
                })
                .await;
                return ChatPart::ToolResult {
                    tool_call_id: id,
                    content: format!("Invalid action: {e}"),
                    image: None,
                };
            }
        };

        sink.send(Event::ActionProposed {
            action: action.clone(),
        })
        .await;

        if let Err(e) = validate_action(&action, model_res) {
            sink.send(Event::Error {
                message: e.to_string(),
            })
            .await;
            return ChatPart::ToolResult {
                tool_call_id: id,
                content: format!("Invalid action: {e}"),
                image: None,
            };
        }

        let outcome = self.executor.execute(&action).await;
        match &outcome {
            ActionOutcome::Done { .. } => sink.send(Event::ActionCompleted {}).await,
            ActionOutcome::Failed { message, .. } => {
                sink.send(Event::Error {
                    message: message.clone(),
                })
                .await;
            }
        }

        match outcome {
            ActionOutcome::Done {
                screenshot: Some(png),
                ..
            } => ChatPart::ToolResult {
                tool_call_id: id,
                content: "screenshot captured".to_string(),
                image: Some(B64.encode(png)),
            },
            other => ChatPart::ToolResult {
                tool_call_id: id,
                content: other.report_for_model(),
                image: None,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for NativeComputerUseAdapter {
    fn name(&self) -> &'static str {
        "native-computer-use"
    }

    async fn run(
        &mut self,
        session: &mut AgentSession,
        sink: &mut EventSink,
    ) -> anyhow::Result<()> {
        let model_res = self.executor.scaler().model_resolution();

        loop {
            if session.is_cancelled() {
                sink.done(Some(CANCELLED_MESSAGE.into())).await;
                return Ok(());
            }
            if session.steps_taken >= MAX_STEPS {
                sink.done(Some(budget_message())).await;
                return Ok(());
            }

            session.history = prune_history(std::mem::take(&mut session.history));

            let request = ChatRequest {
                model: self.model.clone(),
                system: crate::prompts::toolcall_system(model_res, true),
                messages: session.history.clone(),
                tools: vec![
                    ToolDefinition::native_computer(model_res),
                    ToolDefinition::native_bash(),
                ],
            };
            let mut stream = match self.client.stream_chat(request).await {
                Ok(stream) => stream,
                Err(e) => {
                    sink.fatal(format!("provider error: {e:#}")).await;
                    return Ok(());
                }
            };

            let mut text = String::new();
            let mut tool_calls: Vec<(String, String, serde_json::Value)> = Vec::new();
            let mut safety_halt = false;
            while let Some(chunk) = stream.next().await {
                if session.is_cancelled() {
                    sink.done(Some(CANCELLED_MESSAGE.into())).await;
                    return Ok(());
                }
                match chunk {
                    Err(e) => {
                        sink.fatal(format!("provider error: {e:#}")).await;
                        return Ok(());
                    }
                    Ok(ModelChunk::TextDelta(delta)) => text.push_str(&delta),
                    Ok(ModelChunk::ToolCall { id, name, input }) => {
                        tool_calls.push((id, name, input));
                    }
                    Ok(ModelChunk::SafetyCheck { id, message }) => {
                        // Not session-ending as an error: the caller may
                        // resend with the acknowledgment attached.
                        sink.send(Event::Error {
                            message: format!("safety check {id} requires acknowledgment: {message}"),
                        })
                        .await;
                        safety_halt = true;
                    }
                    Ok(ModelChunk::Finished { .. }) => {}
                }
            }
            drop(stream);

            if !text.is_empty() {
                sink.send(Event::Reasoning { text: text.clone() }).await;
            }

            let mut assistant_parts = Vec::new();
            if !text.is_empty() {
                assistant_parts.push(ChatPart::Text { text: text.clone() });
            }
            for (id, name, input) in &tool_calls {
                assistant_parts.push(ChatPart::ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                });
            }
            if !assistant_parts.is_empty() {
                session.history.push(ChatMessage {
                    role: Role::Assistant,
                    parts: assistant_parts,
                });
            }

            if safety_halt {
                sink.done(Some("awaiting safety acknowledgment".into())).await;
                return Ok(());
            }

            if tool_calls.is_empty() {
                info!(session = %session.id, steps = session.steps_taken, "vendor stop signal");
                let message = if text.is_empty() { None } else { Some(text) };
                sink.done(message).await;
                return Ok(());
            }

            for (id, name, input) in tool_calls {
                if session.is_cancelled() {
                    sink.done(Some(CANCELLED_MESSAGE.into())).await;
                    return Ok(());
                }

                let result = self
                    .handle_tool_call(id, &name, &input, model_res, sink)
                    .await;
                session.history.push(ChatMessage {
                    role: Role::User,
                    parts: vec![result],
                });

                session.steps_taken += 1;
                if session.steps_taken >= MAX_STEPS {
                    sink.done(Some(budget_message())).await;
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use deskpilot_agent::adapters::native::NativeComputerUseAdapter;
    use deskpilot_agent::ModelChunk;
    use deskpilot_harness::{collect_events, run_adapter, MockSurface, ScriptedClient};

    use super::*;

    #[test]
    fn parses_click_with_coordinate_array() {
        let input = serde_json::json!({"action": "left_click", "coordinate": [120, 340]});
        assert_eq!(
            parse_native_input(&input).unwrap(),
            Action::Click {
                x: 120.0,
                y: 340.0,
                button: MouseButton::Left,
            }
        );
    }

    #[test]
    fn parses_key_chord() {
        let input = serde_json::json!({"action": "key", "text": "ctrl+shift+t"});
        assert_eq!(
            parse_native_input(&input).unwrap(),
            Action::Keypress {
                keys: vec!["ctrl".into(), "shift".into(), "t".into()],
            }
        );
    }

    #[test]
    fn maps_lineage_aliases_into_the_closed_set() {
        let triple = serde_json::json!({"action": "triple_click", "coordinate": [5, 6]});
        assert_eq!(
            parse_native_input(&triple).unwrap(),
            Action::DoubleClick { x: 5.0, y: 6.0 }
        );

        let cursor = serde_json::json!({"action": "cursor_position", "coordinate": [5, 6]});
        assert_eq!(
            parse_native_input(&cursor).unwrap(),
            Action::Move { x: 5.0, y: 6.0 }
        );
    }

    #[test]
    fn drag_uses_both_coordinate_fields() {
        let input = serde_json::json!({
            "action": "left_click_drag",
            "start_coordinate": [1, 2],
            "coordinate": [3, 4]
        });
        assert_eq!(
            parse_native_input(&input).unwrap(),
            Action::Drag {
                path: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
            }
        );
    }

    #[test]
    fn wait_converts_seconds() {
        let input = serde_json::json!({"action": "wait", "duration": 2.5});
        assert_eq!(
            parse_native_input(&input).unwrap(),
            Action::Wait { duration_ms: 2500 }
        );
    }

    #[test]
    fn scroll_without_coordinate_scrolls_in_place() {
        let input = serde_json::json!({
            "action": "scroll",
            "scroll_direction": "up",
            "scroll_amount": 2
        });
        assert_eq!(
            parse_native_input(&input).unwrap(),
            Action::Scroll {
                direction: ScrollDirection::Up,
                amount: 2,
                x: None,
                y: None,
            }
        );
    }

    #[test]
    fn scroll_with_malformed_coordinate_rejected() {
        let short = serde_json::json!({"action": "scroll", "coordinate": [5]});
        assert!(matches!(
            parse_native_input(&short),
            Err(ActionError::CoordinatesInvalid {
                action: "scroll",
                field: "y"
            })
        ));

        let non_numeric = serde_json::json!({"action": "scroll", "coordinate": ["a", "b"]});
        assert!(matches!(
            parse_native_input(&non_numeric),
            Err(ActionError::CoordinatesInvalid {
                action: "scroll",
                field: "x"
            })
        ));
    }

    #[test]
    fn unknown_native_action_rejected() {
        let input = serde_json::json!({"action": "hover"});
        assert!(matches!(
            parse_native_input(&input),
            Err(ActionError::UnknownAction { tag }) if tag == "hover"
        ));
    }

    #[test]
    fn missing_coordinate_is_invalid() {
        let input = serde_json::json!({"action": "left_click"});
        assert!(matches!(
            parse_native_input(&input),
            Err(ActionError::CoordinatesInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn screenshot_result_carries_the_image() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec![ModelChunk::ToolCall {
                id: "tc-1".into(),
                name: "computer".into(),
                input: serde_json::json!({"action": "screenshot"}),
            }],
            vec![ModelChunk::TextDelta("I can see the screen".into())],
        ]));
        let surface = Arc::new(MockSurface::default());
        let client_ref = Arc::clone(&client);
        let mut adapter = NativeComputerUseAdapter::new(deskpilot_harness::deps(
            client,
            surface,
            "claude-sonnet-4-20250514",
        ));

        let events = collect_events(run_adapter(&mut adapter, vec![]).await).await;
        assert!(events.contains(&Event::ActionCompleted {}));

        let requests = client_ref.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].messages.iter().any(|m| m.parts.iter().any(
            |p| matches!(p, ChatPart::ToolResult { image: Some(_), .. })
        )));
    }

    #[tokio::test]
    async fn safety_check_surfaces_error_then_done() {
        let client = Arc::new(ScriptedClient::new(vec![vec![ModelChunk::SafetyCheck {
            id: "sc-1".into(),
            message: "about to click a payment button".into(),
        }]]));
        let surface = Arc::new(MockSurface::default());
        let mut adapter = NativeComputerUseAdapter::new(deskpilot_harness::deps(
            client,
            Arc::clone(&surface),
            "claude-sonnet-4-20250514",
        ));

        let events = collect_events(run_adapter(&mut adapter, vec![]).await).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            Event::Error { message } if message.contains("requires acknowledgment")
        ));
        assert_eq!(
            events[1],
            Event::Done {
                message: Some("awaiting safety acknowledgment".into())
            }
        );
        assert!(surface.device_calls().is_empty());
    }

    #[tokio::test]
    async fn bash_tool_maps_to_shell_exec() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec![ModelChunk::ToolCall {
                id: "tc-1".into(),
                name: "bash".into(),
                input: serde_json::json!({"command": "ls /tmp"}),
            }],
            vec![ModelChunk::TextDelta("done".into())],
        ]));
        let surface = Arc::new(MockSurface::default());
        let mut adapter = NativeComputerUseAdapter::new(deskpilot_harness::deps(
            client,
            Arc::clone(&surface),
            "claude-sonnet-4-20250514",
        ));

        let events = collect_events(run_adapter(&mut adapter, vec![]).await).await;

        assert!(events.iter().any(|e| matches!(
            e,
            Event::ActionProposed { action: Action::ShellExec { command, .. } } if command == "ls /tmp"
        )));
        assert_eq!(surface.device_calls(), vec!["run_command(ls /tmp,30000)"]);
    }
}
