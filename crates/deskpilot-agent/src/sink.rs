//! Ordered event emission with terminal-state enforcement.
//!
//! All adapter output funnels through one [`EventSink`], which guarantees the
//! protocol invariants a consumer relies on: events arrive in production
//! order, exactly one terminal event ends the stream, and nothing follows it.

use tokio::sync::mpsc;
use tracing::warn;

use deskpilot_types::Event;

/// Single-producer event channel for one session.
pub struct EventSink {
    tx: mpsc::Sender<Event>,
    terminated: bool,
}

impl EventSink {
    /// Wrap a channel sender.
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self {
            tx,
            terminated: false,
        }
    }

    /// Emit an event. Events after the terminal one are dropped with a
    /// warning; a closed receiver (client went away) is ignored.
    pub async fn send(&mut self, event: Event) {
        if self.terminated {
            warn!(?event, "dropping event after terminal");
            return;
        }
        if event.is_terminal() {
            self.terminated = true;
        }
        let _ = self.tx.send(event).await;
    }

    /// Emit the terminal `Done` event.
    pub async fn done(&mut self, message: Option<String>) {
        self.send(Event::Done { message }).await;
    }

    /// Emit a session-ending `Error` and seal the stream.
    ///
    /// Used for fatal failures (provider errors, broken capture): the error
    /// itself ends the session, so no `Done` follows it.
    pub async fn fatal(&mut self, message: String) {
        if self.terminated {
            warn!(%message, "dropping fatal error after terminal");
            return;
        }
        let _ = self.tx.send(Event::Error { message }).await;
        self.terminated = true;
    }

    /// Whether a terminal event has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(mut rx: mpsc::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Some(e) = rx.recv().await {
            out.push(e);
        }
        out
    }

    #[tokio::test]
    async fn exactly_one_terminal() {
        let (tx, rx) = mpsc::channel(16);
        let mut sink = EventSink::new(tx);

        sink.send(Event::Reasoning {
            text: "working".into(),
        })
        .await;
        sink.done(Some("finished".into())).await;
        sink.done(None).await;
        sink.send(Event::ActionCompleted {}).await;
        drop(sink);

        let events = drain(rx).await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn fatal_seals_the_stream() {
        let (tx, rx) = mpsc::channel(16);
        let mut sink = EventSink::new(tx);

        sink.fatal("provider exploded".into()).await;
        assert!(sink.is_terminated());
        sink.done(None).await;
        drop(sink);

        let events = drain(rx).await;
        assert_eq!(
            events,
            vec![Event::Error {
                message: "provider exploded".into()
            }]
        );
    }

    #[tokio::test]
    async fn closed_receiver_is_tolerated() {
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let mut sink = EventSink::new(tx);
        sink.done(None).await;
        assert!(sink.is_terminated());
    }
}
