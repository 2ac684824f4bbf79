//! Fire-and-forget post-completion side effects.
//!
//! Analytics pings, notification triggers and similar consumers live in
//! their own failure domain: events go through an unbounded queue to a
//! background task, and a failing handler is logged and never rolls back
//! the session-completion transaction that emitted the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Events emitted by the completion path for unrelated collaborators.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionCompleted {
        user_id: String,
        practice_id: Option<String>,
        duration_minutes: u32,
        completed_at: DateTime<Utc>,
    },
}

/// A consumer of session events (notifications, analytics, ...).
#[async_trait]
pub trait SessionEventHandler: Send + Sync {
    async fn handle(&self, event: SessionEvent) -> anyhow::Result<()>;
}

/// Queue decoupling event producers from their consumers.
#[derive(Clone)]
pub struct SideEffectQueue {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SideEffectQueue {
    /// Spawns the background dispatch task and returns the queue handle.
    ///
    /// The task runs until every handle is dropped; handler failures are
    /// logged and dispatch continues with the next event.
    pub fn spawn(handler: Arc<dyn SessionEventHandler>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = handler.handle(event).await {
                    error!(target: "side_effects", "event handler failed: {e:#}");
                }
            }
        });
        Self { tx }
    }

    /// Enqueues an event. Never fails the caller; a closed queue is logged.
    pub fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            warn!(target: "side_effects", "side-effect queue is closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingHandler {
        seen: Mutex<Vec<SessionEvent>>,
        fail_first: AtomicUsize,
        // Signals every handled event, failures included, so tests can
        // wait for dispatch instead of guessing at scheduling.
        done_tx: mpsc::UnboundedSender<()>,
    }

    #[async_trait]
    impl SessionEventHandler for RecordingHandler {
        async fn handle(&self, event: SessionEvent) -> anyhow::Result<()> {
            let result = if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("collaborator is down"))
            } else {
                self.seen.lock().unwrap().push(event);
                Ok(())
            };
            let _ = self.done_tx.send(());
            result
        }
    }

    fn recording(fail_first: usize) -> (Arc<RecordingHandler>, mpsc::UnboundedReceiver<()>) {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let handler = Arc::new(RecordingHandler {
            seen: Mutex::new(Vec::new()),
            fail_first: AtomicUsize::new(fail_first),
            done_tx,
        });
        (handler, done_rx)
    }

    fn completed(user: &str) -> SessionEvent {
        SessionEvent::SessionCompleted {
            user_id: user.to_string(),
            practice_id: Some("morning-flow".to_string()),
            duration_minutes: 20,
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let (handler, mut done) = recording(0);
        let queue = SideEffectQueue::spawn(handler.clone());
        queue.emit(completed("ava"));
        queue.emit(completed("ben"));
        done.recv().await.unwrap();
        done.recv().await.unwrap();

        let seen = handler.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let SessionEvent::SessionCompleted { user_id, .. } = &seen[0];
        assert_eq!(user_id, "ava");
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_dispatch() {
        let (handler, mut done) = recording(1);
        let queue = SideEffectQueue::spawn(handler.clone());
        queue.emit(completed("ava"));
        queue.emit(completed("ben"));
        done.recv().await.unwrap();
        done.recv().await.unwrap();

        let seen = handler.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let SessionEvent::SessionCompleted { user_id, .. } = &seen[0];
        assert_eq!(user_id, "ben");
    }
}
