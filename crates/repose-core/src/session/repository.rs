//! Repository traits for session persistence.
//!
//! These traits decouple the core logic from the storage mechanism
//! (local JSON files, a remote document store, an in-memory fake).

use super::record::{RecordFeedback, SessionRecord};
use super::snapshot::{Checkpoint, CheckpointSnapshot};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use std::time::Duration;

/// Durable storage for in-progress session checkpoints.
///
/// At most one checkpoint exists per `(user, practice)` key. Saves are
/// unconditional overwrites: the last writer wins, with no merge. This is
/// an accepted tradeoff for the rare case of the same practice running on
/// two devices at once.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Saves (or overwrites) the checkpoint for a key.
    async fn save(
        &self,
        user_id: &str,
        practice_id: &str,
        snapshot: &CheckpointSnapshot,
    ) -> Result<()>;

    /// Loads the checkpoint for a key.
    ///
    /// Returns `Ok(None)` when no checkpoint exists.
    async fn load(&self, user_id: &str, practice_id: &str) -> Result<Option<Checkpoint>>;

    /// Deletes the checkpoint for a key. Deleting a missing checkpoint is
    /// not an error.
    async fn delete(&self, user_id: &str, practice_id: &str) -> Result<()>;

    /// Bulk-deletes checkpoints saved earlier than `now - ttl`.
    ///
    /// Returns the number of checkpoints removed. Runs as periodic
    /// housekeeping in its own failure domain.
    async fn cleanup_older_than(&self, ttl: Duration) -> Result<usize>;
}

/// Append-only storage for session history records.
///
/// Records are insert-only; the single permitted mutation is the
/// rating/notes feedback pair. Read projections are pure queries with no
/// consistency obligation beyond eventual visibility of appended records.
#[async_trait]
pub trait SessionRecordRepository: Send + Sync {
    /// Appends a new record. A duplicate record id is a validation error.
    async fn append(&self, record: &SessionRecord) -> Result<()>;

    /// Updates the rating/notes pair of an existing record.
    async fn update_feedback(
        &self,
        user_id: &str,
        record_id: &str,
        feedback: &RecordFeedback,
    ) -> Result<()>;

    /// Deletes a record on explicit user action.
    async fn delete(&self, user_id: &str, record_id: &str) -> Result<()>;

    /// The most recent records for a user, newest first, capped at `limit`.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>>;

    /// All records for one practice, newest first.
    async fn by_practice(&self, user_id: &str, practice_id: &str) -> Result<Vec<SessionRecord>>;

    /// All successfully completed records, newest first.
    async fn completed_only(&self, user_id: &str) -> Result<Vec<SessionRecord>>;

    /// Number of sessions started on the given calendar day (UTC).
    async fn count_on(&self, user_id: &str, date: NaiveDate) -> Result<usize>;

    /// Number of sessions started in the week containing `date`, where
    /// weeks begin on `week_start`.
    async fn count_in_week_of(
        &self,
        user_id: &str,
        date: NaiveDate,
        week_start: Weekday,
    ) -> Result<usize>;
}
