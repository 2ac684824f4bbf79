//! Session completion use case.
//!
//! The one place where a finished (or abandoned) session leaves durable
//! traces: append the immutable history record, fold the completion into
//! the per-user aggregate, drop the checkpoint, and hand the completion
//! event to the side-effect queue.

use crate::side_effects::{SessionEvent, SideEffectQueue};
use repose_core::clock::Clock;
use repose_core::error::Result;
use repose_core::session::{
    CheckpointRepository, SessionRecord, SessionRecordRepository, SessionState,
};
use repose_core::stats::AggregateStatsEngine;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Finalizes sessions against the stores.
///
/// Failure semantics: the record append and the stats increment are the
/// only operations whose failure surfaces to the caller (losing a
/// completion silently would corrupt user-visible streaks and totals).
/// Checkpoint deletion and event emission are best effort.
pub struct CompletionUseCase {
    records: Arc<dyn SessionRecordRepository>,
    stats: Arc<AggregateStatsEngine>,
    checkpoints: Arc<dyn CheckpointRepository>,
    effects: SideEffectQueue,
    clock: Arc<dyn Clock>,
}

impl CompletionUseCase {
    pub fn new(
        records: Arc<dyn SessionRecordRepository>,
        stats: Arc<AggregateStatsEngine>,
        checkpoints: Arc<dyn CheckpointRepository>,
        effects: SideEffectQueue,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            stats,
            checkpoints,
            effects,
            clock,
        }
    }

    /// Finalizes a session from its terminal state.
    ///
    /// A completed state (all zones done) produces a completed record and
    /// a stats increment; anything else is recorded as an abandoned
    /// session and leaves the aggregate untouched.
    ///
    /// # Errors
    ///
    /// Propagates record-append and stats-increment failures, both safe to
    /// retry. A checkpoint that cannot be deleted is only logged; the TTL
    /// cleanup will get it later.
    pub async fn finish(
        &self,
        user_id: &str,
        practice_id: Option<&str>,
        state: &SessionState,
    ) -> Result<SessionRecord> {
        let ended_at = self.clock.now();
        let record = SessionRecord::from_state(
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            practice_id.map(str::to_string),
            state,
            state.completed,
            ended_at,
        );

        self.records.append(&record).await?;

        let duration_minutes = duration_minutes(&record);
        if state.completed {
            self.stats
                .increment_session(user_id, duration_minutes, ended_at)
                .await?;
        }

        if let Some(practice_id) = practice_id {
            if let Err(e) = self.checkpoints.delete(user_id, practice_id).await {
                warn!(
                    target: "checkpoint",
                    "failed to delete checkpoint for {user_id}/{practice_id}: {e}"
                );
            }
        }

        if state.completed {
            self.effects.emit(SessionEvent::SessionCompleted {
                user_id: user_id.to_string(),
                practice_id: practice_id.map(str::to_string),
                duration_minutes,
                completed_at: ended_at,
            });
        }

        Ok(record)
    }
}

/// Whole minutes of active session time, rounded to the nearest minute
/// with a floor of one so that a short completed session still counts.
fn duration_minutes(record: &SessionRecord) -> u32 {
    let ms = record.total_duration_ms.max(0) as u64;
    let minutes = (ms + 30_000) / 60_000;
    (minutes as u32).max(1)
}
