//! Free-text JSON fallback protocol.
//!
//! For models with no tool-calling support at all. Each turn the model must
//! answer with one `{"reasoning", "action"}` JSON object, possibly wrapped in
//! a fenced code block. Parse failures get a corrective follow-up prompt
//! (consuming an iteration); a `done` action -- or none -- ends the session.
//! After every action the outcome is appended with the continuation prompt;
//! for vision-capable models a fresh screenshot rides along with it.

use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use tracing::debug;

use deskpilot_desktop::ActionExecutor;
use deskpilot_types::{supports_vision, validate_action, Action, ActionOutcome, ChatMessage, Event};

use crate::adapters::{AdapterDeps, ProviderAdapter, CANCELLED_MESSAGE, MAX_STEPS};
use crate::client::{ChatRequest, ModelChunk, ModelClient};
use crate::prompts;
use crate::pruning::prune_history;
use crate::session::AgentSession;
use crate::sink::EventSink;

fn fence_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok())
        .as_ref()
}

/// Extract the first JSON object from a model reply.
///
/// Tries a fenced code block first, then the outermost brace span.
pub(crate) fn extract_json(text: &str) -> Option<serde_json::Value> {
    if let Some(inner) = fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
    {
        if let Ok(value) = serde_json::from_str(inner.as_str()) {
            return Some(value);
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Adapter speaking the JSON-in-prompt protocol.
pub struct JsonFallbackAdapter {
    client: Arc<dyn ModelClient>,
    executor: ActionExecutor,
    model: String,
}

impl JsonFallbackAdapter {
    /// Build the adapter from shared collaborators.
    pub fn new(deps: AdapterDeps) -> Self {
        Self {
            client: deps.client,
            executor: deps.executor,
            model: deps.model,
        }
    }

    /// Run one model turn and return the accumulated reply text, or `None`
    /// after emitting a fatal event.
    async fn complete_turn(
        &self,
        session: &AgentSession,
        sink: &mut EventSink,
    ) -> Option<Option<String>> {
        let model_res = self.executor.scaler().model_resolution();
        let request = ChatRequest {
            model: self.model.clone(),
            system: prompts::json_system(model_res),
            messages: session.history.clone(),
            tools: Vec::new(),
        };
        let mut stream = match self.client.stream_chat(request).await {
            Ok(stream) => stream,
            Err(e) => {
                sink.fatal(format!("provider error: {e:#}")).await;
                return None;
            }
        };

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            if session.is_cancelled() {
                return Some(None);
            }
            match chunk {
                Err(e) => {
                    sink.fatal(format!("provider error: {e:#}")).await;
                    return None;
                }
                Ok(ModelChunk::TextDelta(delta)) => text.push_str(&delta),
                // This protocol never offers tools; stray chunks are ignored.
                Ok(_) => {}
            }
        }
        Some(Some(text))
    }
}

#[async_trait]
impl ProviderAdapter for JsonFallbackAdapter {
    fn name(&self) -> &'static str {
        "json-fallback"
    }

    async fn run(
        &mut self,
        session: &mut AgentSession,
        sink: &mut EventSink,
    ) -> anyhow::Result<()> {
        let model_res = self.executor.scaler().model_resolution();
        let surface = self.executor.surface();
        let vision = supports_vision(&self.model);

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

        for _ in 0..MAX_STEPS {
            if session.is_cancelled() {
                sink.done(Some(CANCELLED_MESSAGE.into())).await;
                return Ok(());
            }

            session.history = prune_history(std::mem::take(&mut session.history));
            session.steps_taken += 1;

            let text = match self.complete_turn(session, sink).await {
                None => return Ok(()),
                Some(None) => {
                    sink.done(Some(CANCELLED_MESSAGE.into())).await;
                    return Ok(());
                }
                Some(Some(text)) => text,
            };

            let parsed = match extract_json(&text) {
                Some(value) => value,
                None => {
                    debug!(session = %session.id, "reply was not valid JSON, correcting");
                    sink.send(Event::Reasoning { text: text.clone() }).await;
                    session.history.push(ChatMessage::assistant_text(text));
                    session
                        .history
                        .push(ChatMessage::user_text(prompts::JSON_CORRECTIVE));
                    continue;
                }
            };

            if let Some(reasoning) = parsed.get("reasoning").and_then(|v| v.as_str()) {
                if !reasoning.is_empty() {
                    sink.send(Event::Reasoning {
                        text: reasoning.to_string(),
                    })
                    .await;
                }
            }

            let action_value = parsed
                .get("action")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let action_type = action_value.get("type").and_then(|t| t.as_str());
            if action_type.is_none() || action_type == Some(prompts::DONE_SENTINEL) {
                let message = action_value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string);
                sink.done(message).await;
                return Ok(());
            }

            let action = match Action::from_json(&action_value)
                .and_then(|a| validate_action(&a, model_res).map(|()| a))
            {
                Ok(action) => action,
                Err(e) => {
                    sink.send(Event::Error {
                        message: e.to_string(),
                    })
                    .await;
                    session.history.push(ChatMessage::assistant_text(text));
                    session.history.push(ChatMessage::user_text(format!(
                        "That action was invalid: {e}. {}",
                        prompts::JSON_CORRECTIVE
                    )));
                    continue;
                }
            };

            sink.send(Event::ActionProposed {
                action: action.clone(),
            })
            .await;

            if session.is_cancelled() {
                sink.done(Some(CANCELLED_MESSAGE.into())).await;
                return Ok(());
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

            session.history.push(ChatMessage::assistant_text(text));
            let report = format!("{} {}", outcome.report_for_model(), prompts::JSON_CONTINUATION);
            if vision {
                // The screenshot after each action is how this protocol shows
                // the model what changed.
                let png = match surface.screenshot().await {
                    Ok(png) => png,
                    Err(e) => {
                        sink.fatal(format!("screenshot capture failed: {e}")).await;
                        return Ok(());
                    }
                };
                session
                    .history
                    .push(ChatMessage::user_with_screenshot(report, &png));
            } else {
                session.history.push(ChatMessage::user_text(report));
            }
        }

        sink.send(Event::Reasoning {
            text: format!(
                "Reached the maximum of {MAX_STEPS} iterations without a completion signal."
            ),
        })
        .await;
        sink.done(Some("step limit reached".into())).await;
        Ok(())
    }
}
