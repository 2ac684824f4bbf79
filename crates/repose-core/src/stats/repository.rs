//! Repository trait for versioned aggregate statistics.

use super::model::{AggregateStats, VersionedStats};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for the per-user aggregate row with optimistic concurrency.
///
/// Implementations must make `compare_and_swap` atomic with respect to
/// concurrent writers of the same user's row.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Loads the aggregate row and its version marker.
    ///
    /// Returns `Ok(None)` when the user has no row yet.
    async fn load(&self, user_id: &str) -> Result<Option<VersionedStats>>;

    /// Writes `stats` only if the stored version still equals
    /// `expected_version` (`None` means the row must not exist yet).
    ///
    /// Returns `Ok(true)` when the write was applied and `Ok(false)` when
    /// a concurrent writer got there first.
    async fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: Option<u64>,
        stats: &AggregateStats,
    ) -> Result<bool>;

    /// Unconditionally overwrites the streak field.
    ///
    /// No derived computation depends on the prior value, so this needs no
    /// optimistic-concurrency retry. A missing row is left missing.
    async fn overwrite_streak(
        &self,
        user_id: &str,
        streak_days: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;
}
