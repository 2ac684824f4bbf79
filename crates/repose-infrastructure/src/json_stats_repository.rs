//! JSON-file aggregate stats repository.
//!
//! One versioned document per user at `<base>/stats/<user_id>.json`. The
//! compare-and-swap runs under an exclusive file lock so the version check
//! and the write are a single atomic step, even across processes.

use crate::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repose_core::error::{ReposeError, Result};
use repose_core::stats::{AggregateStats, StatsRepository, VersionedStats};
use std::path::{Path, PathBuf};

/// File-backed [`StatsRepository`].
pub struct JsonStatsRepository {
    base_dir: PathBuf,
}

impl JsonStatsRepository {
    /// Creates a repository rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().join("stats"),
        }
    }

    fn row_file(&self, user_id: &str) -> Result<AtomicJsonFile<VersionedStats>> {
        if user_id.trim().is_empty() {
            return Err(ReposeError::validation("user id must not be blank"));
        }
        if user_id.contains(['/', '\\']) || user_id.contains("..") {
            return Err(ReposeError::validation("user id contains path separators"));
        }
        Ok(AtomicJsonFile::new(
            self.base_dir.join(format!("{user_id}.json")),
        ))
    }
}

#[async_trait]
impl StatsRepository for JsonStatsRepository {
    async fn load(&self, user_id: &str) -> Result<Option<VersionedStats>> {
        self.row_file(user_id)?.load()
    }

    async fn compare_and_swap(
        &self,
        user_id: &str,
        expected_version: Option<u64>,
        stats: &AggregateStats,
    ) -> Result<bool> {
        let file = self.row_file(user_id)?;
        file.locked(|f| {
            let current_version = f.load()?.map(|v| v.version);
            if current_version != expected_version {
                return Ok(false);
            }
            let version = expected_version.map(|v| v + 1).unwrap_or(0);
            f.save(&VersionedStats {
                version,
                stats: stats.clone(),
            })?;
            Ok(true)
        })
    }

    async fn overwrite_streak(
        &self,
        user_id: &str,
        streak_days: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let file = self.row_file(user_id)?;
        file.locked(|f| {
            let Some(mut row) = f.load()? else {
                // Nothing to reset for a user without a row.
                return Ok(());
            };
            row.stats.streak_days = streak_days;
            row.stats.updated_at = updated_at;
            row.version += 1;
            f.save(&row)
        })
    }
}
