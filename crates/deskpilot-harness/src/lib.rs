//! Test doubles shared by the adapter and streaming tests.
//!
//! [`MockSurface`] records every device call as a flat string so tests can
//! assert exactly what reached the desktop and in what order. The scripted
//! client replays canned chunk sequences and captures each outbound request.
//! Intended for `dev-dependencies` only.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use deskpilot_agent::{
    AdapterDeps, AgentSession, CancelToken, ChatRequest, ChunkStream, EventSink, ModelChunk,
    ModelClient, ProviderAdapter,
};
use deskpilot_desktop::{ActionExecutor, DesktopError, DesktopSurface, ResolutionScaler};
use deskpilot_types::{CommandOutput, ConversationMessage, Event, Resolution, ScrollDirection};

// Large enough to buffer a full budget-exhaustion run before anything reads.
const EVENT_CAPACITY: usize = 1024;

/// A fake desktop that records each call as `name(args)`.
///
/// Screenshots are counted separately and never appear in [`device_calls`],
/// so assertions on input actions stay independent of capture cadence.
///
/// [`device_calls`]: MockSurface::device_calls
#[derive(Default)]
pub struct MockSurface {
    calls: Mutex<Vec<String>>,
    screenshots: AtomicUsize,
    fail_clicks: bool,
}

impl MockSurface {
    /// A surface whose click operations fail with a transport error.
    pub fn failing_clicks() -> Self {
        Self {
            fail_clicks: true,
            ..Self::default()
        }
    }

    /// Every recorded input call, in order, screenshots excluded.
    pub fn device_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many screenshots were captured.
    pub fn screenshot_count(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn click(&self, name: &str, x: i32, y: i32) -> Result<(), DesktopError> {
        if self.fail_clicks {
            return Err(DesktopError::Transport {
                detail: "device unreachable".into(),
            });
        }
        self.record(format!("{name}({x},{y})"));
        Ok(())
    }
}

#[async_trait]
impl DesktopSurface for MockSurface {
    async fn left_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.click("left_click", x, y)
    }

    async fn right_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.click("right_click", x, y)
    }

    async fn middle_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.click("middle_click", x, y)
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.click("double_click", x, y)
    }

    async fn move_mouse(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.record(format!("move_mouse({x},{y})"));
        Ok(())
    }

    async fn drag(&self, from: (i32, i32), to: (i32, i32)) -> Result<(), DesktopError> {
        self.record(format!("drag(({},{})->({},{}))", from.0, from.1, to.0, to.1));
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DesktopError> {
        self.record(format!("scroll({direction},{amount})"));
        Ok(())
    }

    async fn write(&self, text: &str) -> Result<(), DesktopError> {
        self.record(format!("write({})", text.chars().count()));
        Ok(())
    }

    async fn press(&self, keys: &str) -> Result<(), DesktopError> {
        self.record(format!("press({keys})"));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DesktopError> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0xAB, 0xCD])
    }

    async fn run_command(
        &self,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, DesktopError> {
        self.record(format!("run_command({command},{timeout_ms})"));
        Ok(CommandOutput {
            stdout: "ok".into(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

/// A model client that replays scripted chunk sequences, one per turn.
pub struct ScriptedClient {
    turns: Mutex<VecDeque<Vec<ModelChunk>>>,
    repeat: Option<Vec<ModelChunk>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    /// Answer successive turns with the given chunk sequences; a turn past
    /// the end of the script fails like a provider outage.
    pub fn new(turns: Vec<Vec<ModelChunk>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every turn with the same chunk sequence, forever.
    pub fn repeating(turn: Vec<ModelChunk>) -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            repeat: Some(turn),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request this client has seen, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn stream_chat(&self, request: ChatRequest) -> anyhow::Result<ChunkStream> {
        self.requests.lock().unwrap().push(request);
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| anyhow!("scripted client exhausted"))?;
        Ok(futures_util::stream::iter(turn.into_iter().map(Ok)).boxed())
    }
}

/// Adapter collaborators over a mock surface, with a 3840x2160 device scaled
/// down to a 1920x1080 model viewport (a clean 2:1 factor for assertions).
pub fn deps(client: Arc<ScriptedClient>, surface: Arc<MockSurface>, model: &str) -> AdapterDeps {
    let scaler = ResolutionScaler::new(Resolution::new(3840, 2160), Resolution::new(1920, 1080));
    AdapterDeps {
        client,
        executor: ActionExecutor::new(surface, scaler),
        model: model.into(),
    }
}

/// A buffered event channel and its sink.
pub fn sink_pair() -> (mpsc::Receiver<Event>, EventSink) {
    let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
    (rx, EventSink::new(tx))
}

/// Run an adapter over a fresh session to completion and hand back the
/// receiver for the events it emitted.
pub async fn run_adapter<A: ProviderAdapter + ?Sized>(
    adapter: &mut A,
    messages: Vec<ConversationMessage>,
) -> mpsc::Receiver<Event> {
    let mut session = AgentSession::new(messages, CancelToken::new());
    let (rx, mut sink) = sink_pair();
    if let Err(e) = adapter.run(&mut session, &mut sink).await {
        sink.fatal(format!("adapter failure: {e:#}")).await;
    }
    rx
}

/// Drain a closed event channel into a vector.
pub async fn collect_events(mut rx: mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
