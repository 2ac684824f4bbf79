//! Live practice session runtime.
//!
//! A [`PracticeRunner`] owns one running session for a `(user, practice)`
//! pair: the zone state machine, the circuit scheduling state, a watch
//! channel publishing read-only snapshots to the UI, and best-effort
//! checkpoint autosaves. All mutation goes through the runner, which keeps
//! the machine and the published snapshot in lockstep.

use crate::circuit::{CircuitPhase, CircuitState};
use crate::completion_usecase::CompletionUseCase;
use chrono::{DateTime, Utc};
use repose_core::error::Result;
use repose_core::session::{
    CheckpointRepository, CheckpointSnapshot, SessionRecord, SessionState, ZoneCompletion,
    ZoneSessionStateMachine,
};
use repose_core::zone::{Intensity, ZoneDefinition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause between zones in circuit mode. Zero means no visible pause.
    pub pause_duration: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pause_duration: Duration::from_secs(5),
        }
    }
}

struct Inner {
    machine: ZoneSessionStateMachine,
    circuit: CircuitState,
}

/// The runtime for one active guided session.
pub struct PracticeRunner {
    user_id: String,
    practice_id: String,
    checkpoints: Arc<dyn CheckpointRepository>,
    inner: Mutex<Inner>,
    snapshot_tx: watch::Sender<SessionState>,
}

impl PracticeRunner {
    /// Starts a fresh session over the catalog zones.
    ///
    /// # Errors
    ///
    /// Propagates state-machine validation errors (empty catalog, bad
    /// zone ids).
    pub fn start(
        user_id: impl Into<String>,
        practice_id: impl Into<String>,
        catalog: &[ZoneDefinition],
        config: RunnerConfig,
        checkpoints: Arc<dyn CheckpointRepository>,
        started_at: DateTime<Utc>,
    ) -> Result<Arc<Self>> {
        let machine = ZoneSessionStateMachine::start(catalog, started_at)?;
        Ok(Self::from_machine(
            user_id.into(),
            practice_id.into(),
            machine,
            config,
            checkpoints,
        ))
    }

    /// Resumes the session checkpointed for this key, if any.
    ///
    /// The saved snapshot is reconciled against the current catalog with
    /// the fail-soft restore policy. The checkpoint itself is kept until
    /// the session finishes or the caller discards it explicitly.
    pub async fn resume_latest(
        user_id: impl Into<String>,
        practice_id: impl Into<String>,
        catalog: &[ZoneDefinition],
        config: RunnerConfig,
        checkpoints: Arc<dyn CheckpointRepository>,
    ) -> Result<Option<Arc<Self>>> {
        let user_id = user_id.into();
        let practice_id = practice_id.into();
        let Some(checkpoint) = checkpoints.load(&user_id, &practice_id).await? else {
            return Ok(None);
        };
        let state = checkpoint.snapshot.restore(catalog)?;
        let machine = ZoneSessionStateMachine::resume(state);
        Ok(Some(Self::from_machine(
            user_id,
            practice_id,
            machine,
            config,
            checkpoints,
        )))
    }

    fn from_machine(
        user_id: String,
        practice_id: String,
        machine: ZoneSessionStateMachine,
        config: RunnerConfig,
        checkpoints: Arc<dyn CheckpointRepository>,
    ) -> Arc<Self> {
        let mut circuit = CircuitState::new(config.pause_duration);
        if machine.state().circuit_mode_active {
            circuit.set_enabled(true);
        }
        let (snapshot_tx, _) = watch::channel(machine.state().clone());
        Arc::new(Self {
            user_id,
            practice_id,
            checkpoints,
            inner: Mutex::new(Inner { machine, circuit }),
            snapshot_tx,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn practice_id(&self) -> &str {
        &self.practice_id
    }

    /// Subscribes to session snapshots. The receiver sees the last known
    /// state immediately and every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshot_tx.subscribe()
    }

    /// The last published snapshot.
    pub fn state(&self) -> SessionState {
        self.snapshot_tx.borrow().clone()
    }

    /// Advances session timers. Called by the screen's timer loop.
    pub async fn tick(&self, delta: Duration) {
        let mut inner = self.inner.lock().await;
        inner.machine.tick(delta);
        self.publish(&inner);
    }

    /// Marks the active zone completed.
    ///
    /// In circuit mode a completed non-final zone starts the between-zones
    /// countdown; the scheduled advance carries a generation token and is
    /// a no-op if the pause is skipped or circuit mode is disabled before
    /// it fires.
    pub async fn complete_current_zone(self: &Arc<Self>) -> Result<ZoneCompletion> {
        let outcome = {
            let mut inner = self.inner.lock().await;
            let outcome = inner.machine.complete_current_zone()?;
            if outcome == ZoneCompletion::AwaitingAdvance && inner.circuit.is_enabled() {
                let token = inner.circuit.schedule_pause();
                let pause = inner.circuit.pause_duration();
                let runner = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(pause).await;
                    runner.advance_if_current(token).await;
                });
            }
            self.publish(&inner);
            outcome
        };
        if outcome == ZoneCompletion::AwaitingAdvance {
            self.autosave().await;
        }
        Ok(outcome)
    }

    /// Timer callback for a scheduled circuit advance. Stale tokens are
    /// dropped silently.
    async fn advance_if_current(self: Arc<Self>, token: u64) {
        {
            let mut inner = self.inner.lock().await;
            if !inner.circuit.try_finish_pause(token) {
                debug!(target: "circuit", "dropping stale advance (token {token})");
                return;
            }
            if let Err(e) = inner.machine.advance_to_next_zone() {
                warn!(target: "circuit", "scheduled advance failed: {e}");
                return;
            }
            self.publish(&inner);
        }
        self.autosave().await;
    }

    /// Skips the between-zones pause and advances immediately. The
    /// originally scheduled advance is invalidated and will not also fire.
    /// A no-op outside a pause.
    pub async fn skip_pause(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.circuit.phase() != CircuitPhase::PausedBetweenZones {
                return Ok(());
            }
            inner.circuit.cancel_pause();
            inner.machine.advance_to_next_zone()?;
            self.publish(&inner);
        }
        self.autosave().await;
        Ok(())
    }

    /// Manually advances to the next zone. Cancels a pending circuit
    /// countdown first, so the scheduled advance cannot fire on top.
    pub async fn advance_to_next_zone(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            inner.circuit.cancel_pause();
            inner.machine.advance_to_next_zone()?;
            self.publish(&inner);
        }
        self.autosave().await;
        Ok(())
    }

    /// Manual forward jump to a zone.
    pub async fn advance_to_zone(&self, index: usize) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            inner.circuit.cancel_pause();
            inner.machine.advance_to_zone(index)?;
            self.publish(&inner);
        }
        self.autosave().await;
        Ok(())
    }

    /// Turns circuit mode on or off. Turning it off during a pause cancels
    /// the countdown; the session stays on the completed zone awaiting a
    /// manual advance.
    pub async fn set_circuit_enabled(&self, enabled: bool) {
        let mut inner = self.inner.lock().await;
        inner.circuit.set_enabled(enabled);
        inner.machine.set_circuit_mode(enabled);
        self.publish(&inner);
    }

    pub async fn record_repetition(&self) {
        let mut inner = self.inner.lock().await;
        inner.machine.record_repetition();
        self.publish(&inner);
    }

    pub async fn set_intensity(&self, level: Intensity) {
        let mut inner = self.inner.lock().await;
        inner.machine.set_intensity(level);
        self.publish(&inner);
    }

    pub async fn set_media_position(&self, position: Duration) {
        let mut inner = self.inner.lock().await;
        inner.machine.set_media_position(position);
        self.publish(&inner);
    }

    pub async fn set_voice_instructions(&self, active: bool) {
        let mut inner = self.inner.lock().await;
        inner.machine.set_voice_instructions(active);
        self.publish(&inner);
    }

    /// Suspends the session (app backgrounded). Ticks are ignored until
    /// [`Self::unpause`], so remaining times are frozen exactly as-is.
    pub async fn pause(&self, now: DateTime<Utc>) {
        {
            let mut inner = self.inner.lock().await;
            inner.machine.pause(now);
            self.publish(&inner);
        }
        // A suspension is the most likely moment to lose the process.
        self.autosave().await;
    }

    pub async fn unpause(&self) {
        let mut inner = self.inner.lock().await;
        inner.machine.unpause();
        self.publish(&inner);
    }

    /// Persists a checkpoint of the current state, best effort.
    ///
    /// Failures are logged and swallowed: an autosave must never take down
    /// the in-progress session.
    pub async fn autosave(&self) {
        let snapshot = {
            let inner = self.inner.lock().await;
            CheckpointSnapshot::capture(inner.machine.state())
        };
        if let Err(e) = self
            .checkpoints
            .save(&self.user_id, &self.practice_id, &snapshot)
            .await
        {
            warn!(
                target: "checkpoint",
                "autosave failed for {}/{}: {e}",
                self.user_id, self.practice_id
            );
        }
    }

    /// Finalizes this session through the completion use case.
    ///
    /// # Errors
    ///
    /// Propagates record-append and stats-increment failures; both are
    /// safe to retry.
    pub async fn finish(&self, completion: &CompletionUseCase) -> Result<SessionRecord> {
        let state = self.state();
        completion
            .finish(&self.user_id, Some(&self.practice_id), &state)
            .await
    }

    fn publish(&self, inner: &Inner) {
        self.snapshot_tx.send_replace(inner.machine.state().clone());
    }
}
