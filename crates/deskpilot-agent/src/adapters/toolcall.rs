//! Generic tool-calling agent loop.
//!
//! For any model that supports function/tool calling but no vendor-native
//! computer-use protocol. The loop seeds the model with a screenshot, offers
//! one `computer` tool whose input is the internal action shape, injects a
//! fresh screenshot before each step, prunes stale history, and enforces the
//! step budget. Action failures are reported back into the history so the
//! model can recover; only provider failures end the session.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, info};

use deskpilot_desktop::ActionExecutor;
use deskpilot_types::{
    supports_vision, validate_action, Action, ActionOutcome, ChatMessage, ChatPart, Event,
    Resolution, Role,
};

use crate::adapters::{budget_message, AdapterDeps, ProviderAdapter, CANCELLED_MESSAGE, MAX_STEPS};
use crate::client::{ChatRequest, ModelChunk, ModelClient, ToolDefinition};
use crate::prompts;
use crate::pruning::prune_history;
use crate::session::AgentSession;
use crate::sink::EventSink;

/// The agent-loop controller for generic tool calling.
pub struct ToolCallAdapter {
    client: Arc<dyn ModelClient>,
    executor: ActionExecutor,
    model: String,
}

impl ToolCallAdapter {
    /// Build the adapter from shared collaborators.
    pub fn new(deps: AdapterDeps) -> Self {
        Self {
            client: deps.client,
            executor: deps.executor,
            model: deps.model,
        }
    }

    /// Translate, validate, and execute one tool call, emitting the
    /// proposed/completed/error events. Returns the text to report back to
    /// the model as the tool result.
    async fn handle_tool_call(
        &self,
        name: &str,
        input: &serde_json::Value,
        model_res: Resolution,
        sink: &mut EventSink,
    ) -> String {
        if name != "computer" {
            let message = format!("unknown tool '{name}'");
            sink.send(Event::Error {
                message: message.clone(),
            })
            .await;
            return message;
        }

        let action = match Action::from_json(input) {
            Ok(action) => action,
            Err(e) => {
                sink.send(Event::Error {
                    message: e.to_string(),
                })
                .await;
                return format!("Invalid action: {e}");
            }
        };

        sink.send(Event::ActionProposed {
            action: action.clone(),
        })
        .await;

        if let Err(e) = validate_action(&action, model_res) {
            debug!(action = action.tag(), error = %e, "action rejected");
            sink.send(Event::Error {
                message: e.to_string(),
            })
            .await;
            return format!("Invalid action: {e}");
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
        outcome.report_for_model()
    }
}

#[async_trait]
impl ProviderAdapter for ToolCallAdapter {
    fn name(&self) -> &'static str {
        "tool-calling"
    }

    async fn run(
        &mut self,
        session: &mut AgentSession,
        sink: &mut EventSink,
    ) -> anyhow::Result<()> {
        let model_res = self.executor.scaler().model_resolution();
        let surface = self.executor.surface();
        let vision = supports_vision(&self.model);

        // Seed: a vision model is never asked to act without having seen the
        // screen; a text-only model works from outcome reports instead.
        if vision {
            match surface.screenshot().await {
                Ok(png) => session.history.push(ChatMessage::user_with_screenshot(
                    prompts::INITIAL_INSTRUCTION,
                    &png,
                )),
                Err(e) => {
                    sink.fatal(format!("screenshot capture failed: {e}")).await;
                    return Ok(());
                }
            }
        } else {
            session
                .history
                .push(ChatMessage::user_text(prompts::TEXT_ONLY_INSTRUCTION));
        }

        let mut first_turn = true;
        loop {
            if session.is_cancelled() {
                sink.done(Some(CANCELLED_MESSAGE.into())).await;
                return Ok(());
            }
            if session.steps_taken >= MAX_STEPS {
                sink.done(Some(budget_message())).await;
                return Ok(());
            }

            // A fresh screenshot before each step; the seed covers the first.
            if !first_turn && vision {
                match surface.screenshot().await {
                    Ok(png) => session
                        .history
                        .push(ChatMessage::user_with_screenshot(prompts::STEP_CAPTION, &png)),
                    Err(e) => {
                        sink.fatal(format!("screenshot capture failed: {e}")).await;
                        return Ok(());
                    }
                }
            }
            first_turn = false;

            session.history = prune_history(std::mem::take(&mut session.history));

            let request = ChatRequest {
                model: self.model.clone(),
                system: prompts::toolcall_system(model_res, vision),
                messages: session.history.clone(),
                tools: vec![ToolDefinition::computer(model_res)],
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
                    Ok(ModelChunk::SafetyCheck { message, .. }) => {
                        sink.send(Event::Error {
                            message: format!("safety check: {message}"),
                        })
                        .await;
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

            if tool_calls.is_empty() {
                info!(session = %session.id, steps = session.steps_taken, "model finished");
                let message = if text.is_empty() { None } else { Some(text) };
                sink.done(message).await;
                return Ok(());
            }

            for (id, name, input) in tool_calls {
                if session.is_cancelled() {
                    sink.done(Some(CANCELLED_MESSAGE.into())).await;
                    return Ok(());
                }

                let report = self.handle_tool_call(&name, &input, model_res, sink).await;
                session.history.push(ChatMessage {
                    role: Role::User,
                    parts: vec![ChatPart::ToolResult {
                        tool_call_id: id,
                        content: report,
                        image: None,
                    }],
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
