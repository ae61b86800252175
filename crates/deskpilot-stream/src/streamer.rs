//! The session facade.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{error, info};

use deskpilot_agent::{
    create_adapter, select_adapter, AdapterDeps, AgentSession, CancelToken, EventSink, ModelClient,
};
use deskpilot_desktop::{ActionExecutor, DesktopSurface, ResolutionScaler};
use deskpilot_types::{ConversationMessage, Event, ProviderConfig};

const EVENT_CAPACITY: usize = 256;

/// One inbound streaming request.
#[derive(Debug, Clone, Default)]
pub struct StreamRequest {
    /// Conversation so far; the last user message carries the task.
    pub messages: Vec<ConversationMessage>,
    /// Sandbox identifier, announced to the caller when known.
    pub sandbox_id: Option<String>,
    /// Live-view URL for the sandbox, paired with `sandbox_id`.
    pub view_url: Option<String>,
}

/// Turns one request into one ordered, cancellable event stream.
///
/// Holds the per-session collaborators; `stream` may be called once per
/// session since the surface is exclusively owned for the run's duration.
pub struct Streamer {
    config: ProviderConfig,
    client: Arc<dyn ModelClient>,
    surface: Arc<dyn DesktopSurface>,
    scaler: ResolutionScaler,
}

impl Streamer {
    pub fn new(
        config: ProviderConfig,
        client: Arc<dyn ModelClient>,
        surface: Arc<dyn DesktopSurface>,
        scaler: ResolutionScaler,
    ) -> Self {
        Self {
            config,
            client,
            surface,
            scaler,
        }
    }

    /// Start the session and hand back the event stream.
    ///
    /// An invalid configuration produces a stream with a single `Error`
    /// event; no sandbox call is ever made in that case. Otherwise the agent
    /// loop runs on a background task until it terminates, the caller cancels
    /// via `cancel`, or the receiver is dropped.
    pub fn stream(&self, request: StreamRequest, cancel: CancelToken) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let mut sink = EventSink::new(tx);

        if let Err(e) = self.config.validate() {
            tokio::spawn(async move { sink.fatal(e.to_string()).await });
            return rx;
        }

        let kind = select_adapter(&self.config);
        let mut adapter = create_adapter(
            kind,
            AdapterDeps {
                client: Arc::clone(&self.client),
                executor: ActionExecutor::new(Arc::clone(&self.surface), self.scaler),
                model: self.config.model.clone(),
            },
        );
        let mut session = AgentSession::new(request.messages, cancel);
        let sandbox = request.sandbox_id.zip(request.view_url);

        info!(
            session = %session.id,
            adapter = adapter.name(),
            vendor = %self.config.vendor,
            model = %self.config.model,
            "session starting"
        );

        tokio::spawn(async move {
            if let Some((sandbox_id, view_url)) = sandbox {
                sink.send(Event::SandboxReady {
                    sandbox_id,
                    view_url,
                })
                .await;
            }

            // The adapter folds recoverable failures into the stream; a
            // panic or an Err return must still end the stream cleanly.
            let outcome = AssertUnwindSafe(adapter.run(&mut session, &mut sink))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {
                    if !sink.is_terminated() {
                        sink.done(None).await;
                    }
                }
                Ok(Err(e)) => {
                    error!(session = %session.id, error = %format!("{e:#}"), "agent loop failed");
                    sink.fatal(format!("agent failure: {e:#}")).await;
                }
                Err(_) => {
                    error!(session = %session.id, "agent loop panicked");
                    sink.fatal("internal error: agent loop panicked".into()).await;
                }
            }
            info!(session = %session.id, steps = session.steps_taken, "session ended");
        });

        rx
    }
}
