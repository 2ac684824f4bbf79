//! Aggregate statistics engine.
//!
//! Folds completed sessions into the per-user aggregate row through a
//! bounded-retry optimistic-concurrency loop, so that two near-simultaneous
//! completions (e.g., from two devices) each apply exactly once.

use super::model::AggregateStats;
use super::repository::StatsRepository;
use super::streak;
use crate::clock::Clock;
use crate::error::{ReposeError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Default number of read-modify-write attempts before surfacing a
/// conflict.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Outcome of a successful increment.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsIncrement {
    /// The aggregate row as written.
    pub stats: AggregateStats,
    /// Set when the completion arrived out of order (earlier than the last
    /// recorded session). Totals were still added; the streak was kept.
    pub streak_anomaly: bool,
}

/// Applies session completions to the per-user aggregate row.
pub struct AggregateStatsEngine {
    repository: Arc<dyn StatsRepository>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl AggregateStatsEngine {
    pub fn new(repository: Arc<dyn StatsRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the bounded retry count (minimum 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Atomically folds one completed session into the user's aggregate.
    ///
    /// Reads the current row with its version marker, computes the new
    /// totals and streak, and writes conditionally on the version being
    /// unchanged. On conflict the whole read-modify-write is retried up to
    /// the configured bound. Totals and streak land in a single write, so
    /// the update is all-or-nothing.
    ///
    /// # Errors
    ///
    /// - validation error for a blank user id or non-positive duration
    /// - [`ReposeError::Conflict`] when every attempt lost to a concurrent
    ///   writer; the caller may retry later
    /// - [`ReposeError::TransientStore`] when the store is unreachable
    pub async fn increment_session(
        &self,
        user_id: &str,
        duration_minutes: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<StatsIncrement> {
        if user_id.trim().is_empty() {
            return Err(ReposeError::validation("user id must not be blank"));
        }
        if duration_minutes == 0 {
            return Err(ReposeError::validation(
                "session duration must be positive",
            ));
        }

        for _ in 0..self.max_attempts {
            let current = self.repository.load(user_id).await?;
            let (expected_version, previous) = match current {
                Some(versioned) => (Some(versioned.version), versioned.stats),
                None => (None, AggregateStats::empty(user_id, self.clock.now())),
            };

            let update = streak::apply(
                previous.streak_days,
                previous.last_session_at.map(|t| t.date_naive()),
                completed_at.date_naive(),
            );
            let last_session_at = match previous.last_session_at {
                Some(last) => Some(last.max(completed_at)),
                None => Some(completed_at),
            };
            let next = AggregateStats {
                user_id: previous.user_id,
                total_sessions: previous.total_sessions + 1,
                total_minutes: previous.total_minutes + u64::from(duration_minutes),
                streak_days: update.streak,
                last_session_at,
                updated_at: self.clock.now(),
            };

            if self
                .repository
                .compare_and_swap(user_id, expected_version, &next)
                .await?
            {
                return Ok(StatsIncrement {
                    stats: next,
                    streak_anomaly: update.anomaly,
                });
            }
        }

        Err(ReposeError::Conflict {
            attempts: self.max_attempts,
        })
    }

    /// Unconditionally resets the user's streak to zero.
    pub async fn reset_streak(&self, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(ReposeError::validation("user id must not be blank"));
        }
        self.repository
            .overwrite_streak(user_id, 0, self.clock.now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::stats::model::VersionedStats;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory row store with real version checking.
    #[derive(Default)]
    struct InMemoryStatsRepository {
        rows: Mutex<HashMap<String, VersionedStats>>,
    }

    #[async_trait]
    impl StatsRepository for InMemoryStatsRepository {
        async fn load(&self, user_id: &str) -> crate::error::Result<Option<VersionedStats>> {
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        }

        async fn compare_and_swap(
            &self,
            user_id: &str,
            expected_version: Option<u64>,
            stats: &AggregateStats,
        ) -> crate::error::Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            let current_version = rows.get(user_id).map(|v| v.version);
            if current_version != expected_version {
                return Ok(false);
            }
            let version = expected_version.map(|v| v + 1).unwrap_or(0);
            rows.insert(
                user_id.to_string(),
                VersionedStats {
                    version,
                    stats: stats.clone(),
                },
            );
            Ok(true)
        }

        async fn overwrite_streak(
            &self,
            user_id: &str,
            streak_days: u32,
            updated_at: DateTime<Utc>,
        ) -> crate::error::Result<()> {
            if let Some(row) = self.rows.lock().unwrap().get_mut(user_id) {
                row.stats.streak_days = streak_days;
                row.stats.updated_at = updated_at;
                row.version += 1;
            }
            Ok(())
        }
    }

    /// Wrapper that makes the first `conflicts` CAS calls lose, simulating
    /// an interleaved writer.
    struct ConflictingRepository {
        inner: InMemoryStatsRepository,
        conflicts: AtomicU32,
    }

    #[async_trait]
    impl StatsRepository for ConflictingRepository {
        async fn load(&self, user_id: &str) -> crate::error::Result<Option<VersionedStats>> {
            self.inner.load(user_id).await
        }

        async fn compare_and_swap(
            &self,
            user_id: &str,
            expected_version: Option<u64>,
            stats: &AggregateStats,
        ) -> crate::error::Result<bool> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner
                .compare_and_swap(user_id, expected_version, stats)
                .await
        }

        async fn overwrite_streak(
            &self,
            user_id: &str,
            streak_days: u32,
            updated_at: DateTime<Utc>,
        ) -> crate::error::Result<()> {
            self.inner
                .overwrite_streak(user_id, streak_days, updated_at)
                .await
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 18, 0, 0).unwrap()
    }

    fn engine(repo: Arc<dyn StatsRepository>) -> AggregateStatsEngine {
        let clock = Arc::new(FixedClock::new(at(2024, 1, 6)));
        AggregateStatsEngine::new(repo, clock)
    }

    #[tokio::test]
    async fn rejects_zero_duration() {
        let engine = engine(Arc::new(InMemoryStatsRepository::default()));
        let err = engine
            .increment_session("ava", 0, at(2024, 1, 6))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn first_completion_creates_the_row() {
        let repo = Arc::new(InMemoryStatsRepository::default());
        let engine = engine(repo.clone());
        let result = engine
            .increment_session("ava", 30, at(2024, 1, 6))
            .await
            .unwrap();
        assert_eq!(result.stats.total_sessions, 1);
        assert_eq!(result.stats.total_minutes, 30);
        assert_eq!(result.stats.streak_days, 1);
        assert_eq!(repo.load("ava").await.unwrap().unwrap().version, 0);
    }

    #[tokio::test]
    async fn consecutive_day_scenario() {
        // streak=3 as of 2024-01-05; next day extends, same day holds,
        // a gap resets to 1.
        let repo = Arc::new(InMemoryStatsRepository::default());
        repo.compare_and_swap(
            "ava",
            None,
            &AggregateStats {
                user_id: "ava".to_string(),
                total_sessions: 10,
                total_minutes: 300,
                streak_days: 3,
                last_session_at: Some(at(2024, 1, 5)),
                updated_at: at(2024, 1, 5),
            },
        )
        .await
        .unwrap();
        let engine = engine(repo.clone());

        let first = engine
            .increment_session("ava", 20, at(2024, 1, 6))
            .await
            .unwrap();
        assert_eq!(first.stats.streak_days, 4);

        let same_day = engine
            .increment_session("ava", 20, at(2024, 1, 6))
            .await
            .unwrap();
        assert_eq!(same_day.stats.streak_days, 4);

        let after_gap = engine
            .increment_session("ava", 20, at(2024, 1, 9))
            .await
            .unwrap();
        assert_eq!(after_gap.stats.streak_days, 1);
        assert_eq!(after_gap.stats.total_sessions, 13);
        assert_eq!(after_gap.stats.total_minutes, 360);
    }

    #[tokio::test]
    async fn out_of_order_completion_keeps_streak_and_adds_totals() {
        let repo = Arc::new(InMemoryStatsRepository::default());
        let engine = engine(repo.clone());
        engine
            .increment_session("ava", 30, at(2024, 1, 6))
            .await
            .unwrap();
        let late = engine
            .increment_session("ava", 15, at(2024, 1, 3))
            .await
            .unwrap();
        assert!(late.streak_anomaly);
        assert_eq!(late.stats.streak_days, 1);
        assert_eq!(late.stats.total_minutes, 45);
        // The newest completion time is kept, not the stale one.
        assert_eq!(late.stats.last_session_at, Some(at(2024, 1, 6)));
    }

    #[tokio::test]
    async fn retries_through_interleaved_writers() {
        let repo = Arc::new(ConflictingRepository {
            inner: InMemoryStatsRepository::default(),
            conflicts: AtomicU32::new(3),
        });
        let engine = engine(repo);
        let result = engine
            .increment_session("ava", 30, at(2024, 1, 6))
            .await
            .unwrap();
        assert_eq!(result.stats.total_sessions, 1);
    }

    #[tokio::test]
    async fn surfaces_conflict_after_bounded_retries() {
        let repo = Arc::new(ConflictingRepository {
            inner: InMemoryStatsRepository::default(),
            conflicts: AtomicU32::new(u32::MAX),
        });
        let engine = engine(repo).with_max_attempts(3);
        let err = engine
            .increment_session("ava", 30, at(2024, 1, 6))
            .await
            .unwrap_err();
        assert!(matches!(err, ReposeError::Conflict { attempts: 3 }));
    }

    #[tokio::test]
    async fn concurrent_increments_lose_no_update() {
        let repo = Arc::new(InMemoryStatsRepository::default());
        let engine = Arc::new(engine(repo.clone()));

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.increment_session("ava", 30, at(2024, 1, 6)).await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.increment_session("ava", 45, at(2024, 1, 6)).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let row = repo.load("ava").await.unwrap().unwrap();
        assert_eq!(row.stats.total_sessions, 2);
        assert_eq!(row.stats.total_minutes, 75);
    }

    #[tokio::test]
    async fn reset_streak_zeroes_only_the_streak() {
        let repo = Arc::new(InMemoryStatsRepository::default());
        let engine = engine(repo.clone());
        engine
            .increment_session("ava", 30, at(2024, 1, 6))
            .await
            .unwrap();
        engine.reset_streak("ava").await.unwrap();
        let row = repo.load("ava").await.unwrap().unwrap();
        assert_eq!(row.stats.streak_days, 0);
        assert_eq!(row.stats.total_sessions, 1);
        assert_eq!(row.stats.total_minutes, 30);
    }
}
